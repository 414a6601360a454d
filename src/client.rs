//! Authenticated HTTP client for SharePoint Online.
//!
//! `SpoClient` wraps a `reqwest::Client` and a `TokenProvider` behind a
//! `Mutex`. Unlike a single-API client it works with absolute site URLs:
//! every call names the site it targets, and the REST path is appended to
//! it. Three request shapes are supported:
//!
//! - JSON GET against `/_api/...` ([`SpoClient::get_json`]).
//! - `POST /_api/contextinfo` for the form digest ([`SpoClient::context_info`]).
//! - `POST /_vti_bin/client.svc/ProcessQuery` with an XML envelope and the
//!   `X-RequestDigest` header ([`SpoClient::process_query`]).
//!
//! No request is retried. A non-2xx status becomes `SpoError::Api` with the
//! response body preserved. Request and response are echoed to the console
//! when verbose, and to `tracing` at `debug`.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use crate::auth::TokenProvider;
use crate::client_svc::{ClientSvcResponse, RequestEnvelope};
use crate::console::Console;
use crate::error::{Result, SpoError};

/// `accept` header value for SharePoint REST calls without OData metadata.
pub const ODATA_NOMETADATA: &str = "application/json;odata=nometadata";

/// Header carrying the form digest on mutating requests.
pub const REQUEST_DIGEST_HEADER: &str = "X-RequestDigest";

/// Covers TCP + TLS handshake only.
const API_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout. ProcessQuery calls against the tenant CDN can
/// take tens of seconds.
const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

fn build_api_client() -> Client {
    Client::builder()
        .connect_timeout(API_CONNECT_TIMEOUT)
        .timeout(API_REQUEST_TIMEOUT)
        .build()
        .expect("failed to build HTTP client for SharePoint")
}

/// Response of `POST /_api/contextinfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextInfo {
    /// Anti-forgery token for the next mutating request.
    pub form_digest_value: String,
    /// Digest lifetime in seconds.
    #[serde(default)]
    pub form_digest_timeout_seconds: Option<u64>,
    /// Absolute URL of the web the digest belongs to.
    #[serde(default)]
    pub web_full_url: Option<String>,
    /// Absolute URL of the site collection.
    #[serde(default)]
    pub site_full_url: Option<String>,
    /// Server library version.
    #[serde(default)]
    pub library_version: Option<String>,
}

/// Authenticated HTTP client for SharePoint REST and client.svc endpoints.
///
/// `auth` sits behind a `Mutex` because refreshing needs `&mut`; the lock is
/// held only for the token check, never across a SharePoint round-trip.
/// `base_url`, when set, replaces scheme and host of every site URL so tests
/// can aim requests at a mock server while keeping the site path.
pub struct SpoClient {
    client: Client,
    base_url: Option<String>,
    auth: Mutex<TokenProvider>,
}

impl SpoClient {
    /// Creates a client that talks to the site URLs it is given.
    pub fn new(auth: TokenProvider) -> Self {
        SpoClient {
            client: build_api_client(),
            base_url: None,
            auth: Mutex::new(auth),
        }
    }

    /// Creates a client that sends every request to `base_url` instead of
    /// the site's own host.
    pub fn with_base_url(auth: TokenProvider, base_url: &str) -> Self {
        SpoClient {
            client: build_api_client(),
            base_url: Some(base_url.trim_end_matches('/').to_string()),
            auth: Mutex::new(auth),
        }
    }

    /// Returns a bearer token for `resource`, refreshing it if needed.
    pub async fn ensure_access_token(&self, resource: &str) -> Result<String> {
        let mut auth = self.auth.lock().await;
        auth.ensure_access_token(resource).await
    }

    /// Joins a site URL and an API path (`/_api/...`), honouring the base
    /// URL override.
    fn resolve(&self, site_url: &str, api_path: &str) -> Result<String> {
        let site = site_url.trim_end_matches('/');
        match &self.base_url {
            None => Ok(format!("{site}{api_path}")),
            Some(base) => {
                let parsed = Url::parse(site).map_err(|_| {
                    SpoError::Validation(format!("{site} is not a valid SharePoint Online site URL"))
                })?;
                let path = parsed.path().trim_end_matches('/');
                Ok(format!("{base}{path}{api_path}"))
            }
        }
    }

    /// Sends one request and returns the body text of a 2xx response.
    ///
    /// With `--verbose`, the request line, any request body, the status and
    /// the raw response body are echoed to stderr. The bearer token never is.
    async fn send_text(
        &self,
        console: &mut Console,
        method: Method,
        url: &str,
        token: &str,
        body: Option<String>,
        build: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<String> {
        tracing::debug!(%method, url, "executing web request");
        console.verbose("Executing web request...");
        console.verbose(&format!("{method} {url}"));
        if let Some(body) = &body {
            console.verbose(body);
        }
        console.verbose("");

        let mut request = build(self.client.request(method, url).bearer_auth(token));
        if let Some(body) = body {
            request = request.body(body);
        }
        let resp = request.send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        tracing::debug!(%status, body = %text, "response");
        console.verbose("Response:");
        console.verbose(&status.to_string());
        console.verbose(&text);
        console.verbose("");

        if !status.is_success() {
            return Err(SpoError::Api { status, body: text });
        }
        Ok(text)
    }

    /// GETs `{site}{api_path}` with `accept: application/json;odata=nometadata`
    /// and deserializes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        console: &mut Console,
        site_url: &str,
        api_path: &str,
        token: &str,
    ) -> Result<T> {
        let url = self.resolve(site_url, api_path)?;
        let body = self
            .send_text(console, Method::GET, &url, token, None, |r| {
                r.header(ACCEPT, ODATA_NOMETADATA)
            })
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetches a fresh form digest for `site_url`.
    pub async fn context_info(
        &self,
        console: &mut Console,
        site_url: &str,
        token: &str,
    ) -> Result<ContextInfo> {
        let url = self.resolve(site_url, "/_api/contextinfo")?;
        let body = self
            .send_text(console, Method::POST, &url, token, None, |r| {
                r.header(ACCEPT, ODATA_NOMETADATA)
            })
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POSTs an envelope to `client.svc/ProcessQuery` and decodes the
    /// response array. `ErrorInfo` is not inspected here; callers decide
    /// what a reported error means.
    pub async fn process_query(
        &self,
        console: &mut Console,
        site_url: &str,
        token: &str,
        digest: &str,
        envelope: &RequestEnvelope,
    ) -> Result<ClientSvcResponse> {
        let url = self.resolve(site_url, "/_vti_bin/client.svc/ProcessQuery")?;
        let body = self
            .send_text(console, Method::POST, &url, token, Some(envelope.to_xml()), |r| {
                r.header(REQUEST_DIGEST_HEADER, digest)
                    .header(CONTENT_TYPE, "text/xml")
            })
            .await?;
        ClientSvcResponse::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_appends_path_to_site() {
        let client = SpoClient::new(TokenProvider::with_token("t"));
        assert_eq!(
            client
                .resolve("https://contoso.sharepoint.com/sites/test/", "/_api/contextinfo")
                .unwrap(),
            "https://contoso.sharepoint.com/sites/test/_api/contextinfo"
        );
    }

    #[test]
    fn resolve_with_base_url_keeps_site_path() {
        let client = SpoClient::with_base_url(TokenProvider::with_token("t"), "http://127.0.0.1:9999/");
        assert_eq!(
            client
                .resolve(
                    "https://contoso.sharepoint.com/sites/test",
                    "/_api/web/HubSiteData(false)"
                )
                .unwrap(),
            "http://127.0.0.1:9999/sites/test/_api/web/HubSiteData(false)"
        );
        assert_eq!(
            client
                .resolve("https://contoso-admin.sharepoint.com", "/_api/contextinfo")
                .unwrap(),
            "http://127.0.0.1:9999/_api/contextinfo"
        );
    }

    #[test]
    fn context_info_deserializes_sharepoint_shape() {
        let json = r#"{
            "FormDigestTimeoutSeconds": 1800,
            "FormDigestValue": "0x5D1F4A4A,14 Oct 2026 10:00:00 -0000",
            "LibraryVersion": "16.0.23508.12005",
            "SiteFullUrl": "https://contoso-admin.sharepoint.com",
            "SupportedSchemaVersions": ["14.0.0.0", "15.0.0.0"],
            "WebFullUrl": "https://contoso-admin.sharepoint.com"
        }"#;
        let info: ContextInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.form_digest_value, "0x5D1F4A4A,14 Oct 2026 10:00:00 -0000");
        assert_eq!(info.form_digest_timeout_seconds, Some(1800));
    }

    #[test]
    fn context_info_requires_digest() {
        let result: std::result::Result<ContextInfo, _> =
            serde_json::from_str(r#"{"WebFullUrl":"https://x"}"#);
        assert!(result.is_err());
    }
}
