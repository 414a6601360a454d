//! `spo hubsite data get`: hub site data for a site.
//!
//! Calls `GET {webUrl}/_api/web/HubSiteData({forceRefresh})`. SharePoint
//! answers with either the OData null sentinel (`"odata.null": true`) when the
//! site is neither a hub nor joined to one, or with `value`, a string holding
//! the hub site data as JSON.
//!
//! Reference: <https://learn.microsoft.com/en-us/sharepoint/dev/features/hub-site/rest-hubsites-hubsitedata>

use serde::Deserialize;

use crate::command::{Output, Request, Response, SpoCommand};
use crate::console::Console;
use crate::error::{Result, SpoError};
use crate::session::{Session, validate_sharepoint_url};

/// Arguments of `spo hubsite data get`.
#[derive(Debug, Clone, clap::Args)]
pub struct HubSiteDataGetArgs {
    /// URL of the site for which to retrieve hub site data.
    #[arg(short = 'u', long = "web-url")]
    pub web_url: String,

    /// Refresh the server cache with the latest updates.
    #[arg(short = 'f', long = "force-refresh")]
    pub force_refresh: bool,
}

/// Validated options.
#[derive(Debug, Clone)]
pub struct HubSiteDataGetOptions {
    /// Site URL without a trailing slash.
    pub web_url: String,
    /// Whether the server should rebuild its hub site cache.
    pub force_refresh: bool,
}

/// Raw response of the `HubSiteData` endpoint.
#[derive(Debug, Deserialize)]
struct HubSiteDataResponse {
    #[serde(rename = "odata.null", default)]
    odata_null: bool,
    #[serde(default)]
    value: Option<String>,
}

/// The `spo hubsite data get` command.
pub struct HubSiteDataGet;

impl SpoCommand for HubSiteDataGet {
    type Args = HubSiteDataGetArgs;
    type Options = HubSiteDataGetOptions;

    fn name(&self) -> &'static str {
        "spo hubsite data get"
    }

    fn validate(&self, args: &Self::Args, _session: &Session) -> Result<Self::Options> {
        validate_sharepoint_url(&args.web_url)?;
        Ok(HubSiteDataGetOptions {
            web_url: args.web_url.trim_end_matches('/').to_string(),
            force_refresh: args.force_refresh,
        })
    }

    fn build_request(&self, options: &Self::Options, _session: &Session) -> Result<Request> {
        Ok(Request::Get {
            site_url: options.web_url.clone(),
            path: format!("/_api/web/HubSiteData({})", options.force_refresh),
        })
    }

    fn before_execute(&self, _options: &Self::Options, console: &mut Console) {
        console.verbose("Retrieving hub site data...");
    }

    fn handle_response(&self, options: &Self::Options, response: Response) -> Result<Output> {
        let Response::Json(body) = response else {
            return Err(SpoError::UnexpectedResponse(
                "hub site data must be JSON".to_string(),
            ));
        };

        let data: HubSiteDataResponse = serde_json::from_value(body)?;
        if data.odata_null {
            return Ok(Output::NoOp(format!(
                "{} is not connected to a hub site and is not a hub site itself",
                options.web_url
            )));
        }

        let value = data.value.ok_or_else(|| {
            SpoError::UnexpectedResponse("hub site data response has no value".to_string())
        })?;
        Ok(Output::Json(serde_json::from_str(&value)?))
    }
}
