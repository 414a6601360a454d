//! `spo cdn origin remove`: removes an origin from the tenant CDN.
//!
//! Runs `Tenant.RemoveTenantCdnOrigin(cdnType, origin)` through ProcessQuery
//! on the connected tenant admin site. The call is destructive, so it is
//! gated behind `--confirm` or an interactive prompt.
//!
//! Reference: <https://learn.microsoft.com/en-us/microsoft-365/enterprise/use-microsoft-365-cdn-with-spo>

use std::fmt;
use std::str::FromStr;

use crate::client_svc::{Action, ObjectPath, Parameter, RequestEnvelope};
use crate::command::{Output, Request, Response, SpoCommand};
use crate::confirm::Confirmation;
use crate::console::Console;
use crate::error::{Result, SpoError};
use crate::session::Session;

/// Id of the `RemoveTenantCdnOrigin` method action.
const REMOVE_ACTION_ID: u32 = 33;

/// Object path id of the tenant identity.
const TENANT_PATH_ID: u32 = 29;

/// Which of the two tenant CDNs to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdnType {
    /// The Public CDN. Used when `--type` is omitted.
    #[default]
    Public,
    /// The Private CDN.
    Private,
}

impl CdnType {
    /// Value of the `SPOTenantCdnType` enum on the wire.
    pub fn wire_value(self) -> i64 {
        match self {
            CdnType::Public => 0,
            CdnType::Private => 1,
        }
    }
}

impl FromStr for CdnType {
    type Err = SpoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Public" => Ok(CdnType::Public),
            "Private" => Ok(CdnType::Private),
            other => Err(SpoError::Validation(format!(
                "{other} is not a valid CDN type. Allowed values are Public|Private"
            ))),
        }
    }
}

impl fmt::Display for CdnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CdnType::Public => f.write_str("Public"),
            CdnType::Private => f.write_str("Private"),
        }
    }
}

/// Arguments of `spo cdn origin remove`.
#[derive(Debug, Clone, clap::Args)]
pub struct CdnOriginRemoveArgs {
    /// Type of CDN to manage. Public|Private. Default Public.
    #[arg(short = 't', long = "type")]
    pub cdn_type: Option<String>,

    /// Origin to remove from the current CDN configuration.
    #[arg(short = 'o', long = "origin")]
    pub origin: String,

    /// Don't prompt for confirming removal of the origin.
    #[arg(long)]
    pub confirm: bool,
}

/// Validated options.
#[derive(Debug, Clone)]
pub struct CdnOriginRemoveOptions {
    /// CDN to remove the origin from.
    pub cdn_type: CdnType,
    /// Origin path pattern, e.g. `*/CDN`.
    pub origin: String,
    /// `--confirm` was given.
    pub confirm: bool,
    /// Connected tenant admin site.
    pub admin_url: String,
}

/// The `spo cdn origin remove` command.
pub struct CdnOriginRemove;

impl SpoCommand for CdnOriginRemove {
    type Args = CdnOriginRemoveArgs;
    type Options = CdnOriginRemoveOptions;

    fn name(&self) -> &'static str {
        "spo cdn origin remove"
    }

    fn validate(&self, args: &Self::Args, session: &Session) -> Result<Self::Options> {
        let cdn_type = match &args.cdn_type {
            Some(raw) => raw.parse()?,
            None => CdnType::default(),
        };

        if args.origin.trim().is_empty() {
            return Err(SpoError::Validation(
                "Required option origin not specified".to_string(),
            ));
        }

        let admin_url = session.require_tenant_admin_site()?.to_string();

        Ok(CdnOriginRemoveOptions {
            cdn_type,
            origin: args.origin.clone(),
            confirm: args.confirm,
            admin_url,
        })
    }

    fn build_request(&self, options: &Self::Options, _session: &Session) -> Result<Request> {
        let envelope = RequestEnvelope::new()
            .action(Action::Method {
                name: "RemoveTenantCdnOrigin".to_string(),
                id: REMOVE_ACTION_ID,
                object_path_id: TENANT_PATH_ID,
                parameters: vec![
                    Parameter::Enum(options.cdn_type.wire_value()),
                    Parameter::String(options.origin.clone()),
                ],
            })
            .object_path(ObjectPath::Tenant { id: TENANT_PATH_ID });

        Ok(Request::ProcessQuery {
            site_url: options.admin_url.clone(),
            envelope,
        })
    }

    fn confirmation(&self, options: &Self::Options) -> Option<Confirmation> {
        Some(Confirmation {
            prompt: format!(
                "Are you sure you want to delete the {} CDN origin?",
                options.origin
            ),
            suppressed_note: "Confirmation suppressed through the confirm option. Removing CDN origin..."
                .to_string(),
        })
    }

    fn confirmed(&self, options: &Self::Options) -> bool {
        options.confirm
    }

    fn before_execute(&self, options: &Self::Options, console: &mut Console) {
        console.log(&format!(
            "Removing origin {} from the {} CDN. Please wait, this might take a moment...",
            options.origin, options.cdn_type
        ));
    }

    fn handle_response(&self, _options: &Self::Options, response: Response) -> Result<Output> {
        let Response::ClientSvc(decoded) = response else {
            return Err(SpoError::UnexpectedResponse(
                "expected a ProcessQuery response".to_string(),
            ));
        };
        decoded.check()?;
        Ok(Output::Done)
    }
}
