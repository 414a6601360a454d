//! Connection settings: config file, environment and flags.
//!
//! Precedence is flag > environment > file > default. Flags and environment
//! variables are merged by clap (`#[arg(env = ...)]`), so this module only
//! layers the TOML file underneath them.
//!
//! The file holds non-secret settings only:
//!
//! ```toml
//! site_url = "https://contoso-admin.sharepoint.com"
//! tenant_id = "..."
//! aad_tenant_id = "contoso.onmicrosoft.com"
//! client_id = "00000000-0000-0000-0000-000000000000"
//! ```
//!
//! Unknown keys (including `client_secret`) are rejected so a secret never
//! ends up in a file by accident.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::TokenProvider;
use crate::error::{Result, SpoError};
use crate::session::Session;

/// Directory under the platform config dir holding `config.toml`.
const CONFIG_DIR_NAME: &str = "spo-cli";

/// Contents of `config.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Site to connect to.
    #[serde(default)]
    pub site_url: Option<String>,
    /// Tenant object identity for ProcessQuery.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Azure AD tenant for token requests.
    #[serde(default)]
    pub aad_tenant_id: Option<String>,
    /// Azure AD application (client) id.
    #[serde(default)]
    pub client_id: Option<String>,
}

impl FileConfig {
    /// Reads and parses `path`.
    ///
    /// # Errors
    ///
    /// `SpoError::Config` if the file cannot be read or is not valid TOML
    /// for this schema.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SpoError::Config {
            message: format!("cannot read {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        toml::from_str(&content).map_err(|e| SpoError::Config {
            message: format!("invalid config file {}", path.display()),
            source: Some(Box::new(e)),
        })
    }

    /// `<config_dir>/spo-cli/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Loads an explicitly named file, or the default file when it exists,
    /// or falls back to an empty config.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--site-url` / `SPO_SITE_URL`.
    pub site_url: Option<String>,
    /// `--tenant-id` / `SPO_TENANT_ID`.
    pub tenant_id: Option<String>,
    /// `--aad-tenant-id` / `SPO_AAD_TENANT_ID`.
    pub aad_tenant_id: Option<String>,
    /// `--client-id` / `SPO_CLIENT_ID`.
    pub client_id: Option<String>,
    /// `--client-secret` / `SPO_CLIENT_SECRET`.
    pub client_secret: Option<String>,
    /// `--access-token` / `SPO_ACCESS_TOKEN`.
    pub access_token: Option<String>,
}

/// App registration used for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Azure AD tenant.
    pub aad_tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Connection context.
    pub session: Session,
    /// Set only when tenant, client id and secret are all known.
    pub credentials: Option<Credentials>,
}

impl Settings {
    /// Layers `overrides` over `file`.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let pick = |flag: Option<String>, from_file: Option<String>| {
            flag.filter(|v| !v.is_empty()).or(from_file.filter(|v| !v.is_empty()))
        };

        let mut session = Session::default();
        if let Some(site) = pick(overrides.site_url, file.site_url) {
            session = Session::connected(&site);
        }
        if let Some(tenant) = pick(overrides.tenant_id, file.tenant_id) {
            session = session.with_tenant_id(&tenant);
        }
        if let Some(token) = overrides.access_token.filter(|t| !t.is_empty()) {
            session = session.with_access_token(&token);
        }

        let credentials = match (
            pick(overrides.aad_tenant_id, file.aad_tenant_id),
            pick(overrides.client_id, file.client_id),
            overrides.client_secret.filter(|s| !s.is_empty()),
        ) {
            (Some(aad_tenant_id), Some(client_id), Some(client_secret)) => Some(Credentials {
                aad_tenant_id,
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Settings {
            session,
            credentials,
        }
    }

    /// Token provider for these settings. A pre-acquired token wins over
    /// credentials; with neither, every token request fails with
    /// `SpoError::Auth`.
    pub fn token_provider(&self) -> TokenProvider {
        if let Some(token) = &self.session.access_token {
            return TokenProvider::with_token(token);
        }
        match &self.credentials {
            Some(c) => TokenProvider::new(&c.aad_tenant_id, &c.client_id, &c.client_secret),
            None => TokenProvider::new("", "", ""),
        }
    }
}
