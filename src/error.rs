//! Typed error hierarchy for the spo-cli crate.
//!
//! `SpoError` maps one variant to each failure boundary a command run can
//! hit:
//! - `Validation`: options or session preconditions rejected before any
//!   network call.
//! - `Auth`: the token endpoint refused or could not be reached.
//! - `Api` / `Network`: transport failures on the SharePoint side, with and
//!   without an HTTP status respectively.
//! - `Remote`: the request was transported fine but the `ErrorInfo` of a
//!   ProcessQuery response reports a failed operation.
//! - `Parse`: a body that should be JSON is not, or a ClientSvc envelope is
//!   empty.
//! - `Config` / `Prompt`: local failures reading the config file or the
//!   interactive answer.
//!
//! Every error is terminal for the command run. Nothing here is retried.

use reqwest::StatusCode;

/// Unified error type for all spo-cli operations.
#[derive(Debug, thiserror::Error)]
pub enum SpoError {
    /// An option failed syntactic validation, or the session does not meet a
    /// command precondition (e.g. not connected to a tenant admin site).
    ///
    /// Raised before any HTTP request is issued.
    #[error("{0}")]
    Validation(String),

    /// Authentication failure at the Azure AD token endpoint.
    ///
    /// The message carries the HTTP status and the AADSTS body when the
    /// endpoint answered, so the cause stays visible to the user.
    #[error("authentication failed: {message}")]
    Auth {
        /// Human-readable description of the failure.
        message: String,
        /// The underlying transport or parse error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// SharePoint answered with a non-success HTTP status.
    ///
    /// The body is preserved: SharePoint puts its `odata.error` payload
    /// there and it is usually the only useful diagnostic.
    #[error("API error {status}: {body}")]
    Api {
        /// The HTTP status code returned by SharePoint.
        status: StatusCode,
        /// The raw response body text, or an empty string if unreadable.
        body: String,
    },

    /// A ProcessQuery call succeeded at the HTTP level but entry 0 of the
    /// response carries a non-null `ErrorInfo`.
    #[error("{message}")]
    Remote {
        /// `ErrorInfo.ErrorMessage` as sent by the server.
        message: String,
        /// `ErrorInfo.ErrorTypeName`, when present.
        type_name: Option<String>,
        /// `ErrorInfo.ErrorCode`, when present.
        code: Option<i64>,
    },

    /// JSON deserialization failed on a response body.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A response was valid JSON but does not have the shape a command
    /// consumes (empty ClientSvc array, missing `value`, missing identity).
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A network-level failure (DNS, TCP, TLS, timeout) with no HTTP status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {message}")]
    Config {
        /// What went wrong, including the file path.
        message: String,
        /// The underlying I/O or TOML error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reading the answer to the confirmation prompt failed.
    #[error("prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

impl SpoError {
    /// Process exit code for this error.
    ///
    /// - 1: runtime failure (auth, transport, parse, config, prompt)
    /// - 2: validation failure, same code clap uses for argument errors
    /// - 3: the remote operation itself failed (`ErrorInfo` in the response)
    pub fn exit_code(&self) -> u8 {
        match self {
            SpoError::Validation(_) => 2,
            SpoError::Remote { .. } => 3,
            _ => 1,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpoError>;
