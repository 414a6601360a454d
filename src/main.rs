//! CLI entry point for spo: SharePoint Online operations from the shell.
//!
//! Resolves connection settings (flags, environment, config file), builds an
//! authenticated client, then dispatches to the selected command.
//!
//! Exit codes:
//! - 0: success, nothing to do, or cancelled at the prompt
//! - 1: runtime error (auth failure, HTTP error, unparseable response, config)
//! - 2: argument or option validation error (clap uses the same code)
//! - 3: SharePoint reported the operation as failed

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spo_cli::cdn::{CdnOriginRemove, CdnOriginRemoveArgs};
use spo_cli::client::SpoClient;
use spo_cli::command::{Context, Outcome, execute};
use spo_cli::config::{FileConfig, Overrides, Settings};
use spo_cli::confirm::StdinConfirm;
use spo_cli::console::Console;
use spo_cli::error::SpoError;
use spo_cli::hubsite::{HubSiteDataGet, HubSiteDataGetArgs};

#[derive(Parser)]
#[command(name = "spo", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct GlobalOptions {
    /// Path to a TOML config file. Defaults to <config dir>/spo-cli/config.toml.
    #[arg(long, env = "SPO_CLI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// SharePoint site to connect to (tenant commands need the admin site).
    #[arg(long, env = "SPO_SITE_URL", global = true)]
    site_url: Option<String>,

    /// Tenant object identity used by ProcessQuery. Looked up when omitted.
    #[arg(long, env = "SPO_TENANT_ID", global = true)]
    tenant_id: Option<String>,

    /// Azure AD tenant (id or domain) for token requests.
    #[arg(long, env = "SPO_AAD_TENANT_ID", global = true)]
    aad_tenant_id: Option<String>,

    /// Azure AD application (client) ID.
    #[arg(long, env = "SPO_CLIENT_ID", global = true)]
    client_id: Option<String>,

    /// Azure AD client secret. Prefer the SPO_CLIENT_SECRET environment
    /// variable to keep it out of process listings and shell history.
    #[arg(long, env = "SPO_CLIENT_SECRET", global = true, hide_env_values = true)]
    client_secret: Option<String>,

    /// Pre-acquired bearer token; skips the token endpoint.
    #[arg(long, env = "SPO_ACCESS_TOKEN", global = true, hide_env_values = true)]
    access_token: Option<String>,

    /// Print progress messages to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    /// Echo HTTP requests and responses to stderr.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Hub site operations.
    #[command(subcommand)]
    Hubsite(HubsiteCommand),

    /// Tenant CDN operations.
    #[command(subcommand)]
    Cdn(CdnCommand),
}

#[derive(Subcommand)]
enum HubsiteCommand {
    /// Hub site data.
    #[command(subcommand)]
    Data(HubsiteDataCommand),
}

#[derive(Subcommand)]
enum HubsiteDataCommand {
    /// Get hub site data for the specified site.
    Get(HubSiteDataGetArgs),
}

#[derive(Subcommand)]
enum CdnCommand {
    /// CDN origins.
    #[command(subcommand)]
    Origin(CdnOriginCommand),
}

#[derive(Subcommand)]
enum CdnOriginCommand {
    /// Remove a CDN origin from the current SharePoint Online tenant.
    Remove(CdnOriginRemoveArgs),
}

/// `--debug` turns on request/response tracing for this crate; otherwise
/// `RUST_LOG` decides, defaulting to warnings only.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("spo_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

impl GlobalOptions {
    fn overrides(&self) -> Overrides {
        Overrides {
            site_url: self.site_url.clone(),
            tenant_id: self.tenant_id.clone(),
            aad_tenant_id: self.aad_tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

async fn run(cli: Cli, console: &mut Console) -> Result<Outcome, SpoError> {
    let file = FileConfig::discover(cli.global.config.as_deref())?;
    let settings = Settings::resolve(file, cli.global.overrides());
    let client = SpoClient::new(settings.token_provider());
    let mut confirmer = StdinConfirm;

    let mut ctx = Context {
        client: &client,
        session: &settings.session,
        console,
        confirmer: &mut confirmer,
    };

    match &cli.command {
        Commands::Hubsite(HubsiteCommand::Data(HubsiteDataCommand::Get(args))) => {
            execute(&HubSiteDataGet, args, &mut ctx).await
        }
        Commands::Cdn(CdnCommand::Origin(CdnOriginCommand::Remove(args))) => {
            execute(&CdnOriginRemove, args, &mut ctx).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    let mut console = Console::stdio(cli.global.verbose);
    match run(cli, &mut console).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "command finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            console.error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}
