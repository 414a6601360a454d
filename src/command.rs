//! Command interface and the generic executor that drives it.
//!
//! Every command goes through the same linear pipeline:
//!
//! 1. **validate** raw arguments into typed options (no network).
//! 2. **build_request** from options and session (no network).
//! 3. **confirm** destructive commands, unless `--confirm` was given.
//! 4. **authenticate** for the resource that owns the target site.
//! 5. **context fetch** (ProcessQuery only): fresh form digest, and the
//!    tenant identity if the session does not carry one.
//! 6. **execute** the substantive request.
//! 7. **handle_response** into an [`Output`], which the executor prints.
//!
//! GET commands report progress before step 4, ProcessQuery commands after
//! step 5. With `--verbose` every request and raw response body is echoed to
//! stderr, so a body that fails to parse is visible there.
//!
//! Each stage returns `Result`, so the first failure ends the run. Nothing
//! is retried. Commands only describe requests and interpret responses; all
//! I/O lives in [`execute`].

use serde_json::Value;

use crate::client::SpoClient;
use crate::client_svc::{ClientSvcResponse, RequestEnvelope, tenant_identity, tenant_identity_query};
use crate::confirm::{self, Confirm, Confirmation};
use crate::console::Console;
use crate::error::Result;
use crate::session::{Session, resource_for};

/// The substantive request of a command.
#[derive(Debug, Clone)]
pub enum Request {
    /// `GET {site_url}{path}` returning JSON.
    Get {
        /// Absolute site URL.
        site_url: String,
        /// API path starting with `/_api/`.
        path: String,
    },
    /// `POST {site_url}/_vti_bin/client.svc/ProcessQuery` with a fresh digest.
    ProcessQuery {
        /// Absolute site URL.
        site_url: String,
        /// Envelope to send; tenant placeholders are bound by the executor.
        envelope: RequestEnvelope,
    },
}

impl Request {
    /// The site the request targets.
    pub fn site_url(&self) -> &str {
        match self {
            Request::Get { site_url, .. } | Request::ProcessQuery { site_url, .. } => site_url,
        }
    }
}

/// A successfully transported response.
#[derive(Debug, Clone)]
pub enum Response {
    /// Body of a [`Request::Get`].
    Json(Value),
    /// Decoded body of a [`Request::ProcessQuery`].
    ClientSvc(ClientSvcResponse),
}

/// What a command wants printed.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// A JSON value on stdout, `DONE` on stderr when verbose.
    Json(Value),
    /// A green `DONE` on stdout.
    Done,
    /// Nothing on stdout; the message is shown when verbose.
    NoOp(String),
}

/// Terminal state of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command did what it was asked and printed its result.
    Success,
    /// The remote side reported nothing applicable.
    NoOp,
    /// The user declined the confirmation prompt; no request was sent.
    Cancelled,
}

/// Per-command behaviour plugged into [`execute`].
pub trait SpoCommand {
    /// Raw arguments as parsed from the command line.
    type Args;
    /// Validated options.
    type Options;

    /// Command path as typed by the user, e.g. `spo hubsite data get`.
    fn name(&self) -> &'static str;

    /// Syntactic validation of arguments and session preconditions.
    fn validate(&self, args: &Self::Args, session: &Session) -> Result<Self::Options>;

    /// Describes the substantive request.
    fn build_request(&self, options: &Self::Options, session: &Session) -> Result<Request>;

    /// Prompt for destructive commands. `None` for read commands.
    fn confirmation(&self, _options: &Self::Options) -> Option<Confirmation> {
        None
    }

    /// Whether `--confirm` was given.
    fn confirmed(&self, _options: &Self::Options) -> bool {
        false
    }

    /// Progress hook. GET commands call it before authenticating;
    /// ProcessQuery commands call it once the form digest is in hand.
    fn before_execute(&self, _options: &Self::Options, _console: &mut Console) {}

    /// Interprets the response.
    fn handle_response(&self, options: &Self::Options, response: Response) -> Result<Output>;
}

/// Collaborators of a single run.
pub struct Context<'a> {
    /// HTTP client with its token provider.
    pub client: &'a SpoClient,
    /// Connection context.
    pub session: &'a Session,
    /// Output sink.
    pub console: &'a mut Console,
    /// Confirmation capability.
    pub confirmer: &'a mut dyn Confirm,
}

/// Runs `command` end to end.
///
/// # Errors
///
/// Whatever stage fails first: `Validation` before any request, `Prompt`
/// while asking, `Auth` while acquiring the token, `Api`/`Network`/`Parse`
/// on the wire, `Remote` when the ProcessQuery reports `ErrorInfo`.
pub async fn execute<C: SpoCommand>(
    command: &C,
    args: &C::Args,
    ctx: &mut Context<'_>,
) -> Result<Outcome> {
    tracing::debug!(command = command.name(), "executing command");

    let options = command.validate(args, ctx.session)?;
    let request = command.build_request(&options, ctx.session)?;

    if let Some(confirmation) = command.confirmation(&options) {
        let bypass = command.confirmed(&options);
        if !confirm::gate(&confirmation, bypass, ctx.confirmer, ctx.console)? {
            tracing::debug!(command = command.name(), "cancelled at prompt");
            return Ok(Outcome::Cancelled);
        }
    }

    if matches!(request, Request::Get { .. }) {
        command.before_execute(&options, ctx.console);
    }

    let resource = resource_for(request.site_url())?;
    ctx.console
        .verbose(&format!("Retrieving access token for {resource}..."));
    let token = ctx.client.ensure_access_token(&resource).await?;

    let response = match request {
        Request::Get { site_url, path } => {
            let value: Value = ctx
                .client
                .get_json(ctx.console, &site_url, &path, &token)
                .await?;
            Response::Json(value)
        }
        Request::ProcessQuery { site_url, envelope } => {
            let envelope = if envelope.needs_tenant() {
                let tenant_id = match &ctx.session.tenant_id {
                    Some(id) => id.clone(),
                    None => resolve_tenant_id(ctx, &site_url, &token).await?,
                };
                envelope.bind_tenant(&tenant_id)
            } else {
                envelope
            };

            let digest = request_digest(ctx, &site_url, &token).await?;
            command.before_execute(&options, ctx.console);
            let decoded = ctx
                .client
                .process_query(ctx.console, &site_url, &token, &digest, &envelope)
                .await?;
            Response::ClientSvc(decoded)
        }
    };

    let output = command.handle_response(&options, response)?;
    Ok(emit(output, ctx.console))
}

/// Fetches a fresh form digest. Digests are never cached between calls.
async fn request_digest(ctx: &mut Context<'_>, site_url: &str, token: &str) -> Result<String> {
    ctx.console.verbose("Retrieving request digest...");
    let info = ctx.client.context_info(ctx.console, site_url, token).await?;
    Ok(info.form_digest_value)
}

/// Looks up the tenant object identity through ProcessQuery.
async fn resolve_tenant_id(ctx: &mut Context<'_>, site_url: &str, token: &str) -> Result<String> {
    ctx.console.verbose("Retrieving tenant identity...");
    let digest = request_digest(ctx, site_url, token).await?;
    let response = ctx
        .client
        .process_query(ctx.console, site_url, token, &digest, &tenant_identity_query())
        .await?;
    tenant_identity(&response)
}

fn emit(output: Output, console: &mut Console) -> Outcome {
    match output {
        Output::Json(value) => {
            console.log_json(&value);
            console.verbose_done();
            Outcome::Success
        }
        Output::Done => {
            console.done();
            Outcome::Success
        }
        Output::NoOp(message) => {
            console.verbose(&message);
            Outcome::NoOp
        }
    }
}
