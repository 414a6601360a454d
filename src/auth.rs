//! OAuth2 client-credentials authentication for SharePoint Online.
//!
//! Acquires bearer tokens from Azure AD's `/oauth2/v2.0/token` endpoint for a
//! SharePoint resource (e.g. `https://contoso.sharepoint.com`). The token is
//! cached in `TokenProvider` together with the resource it was issued for;
//! [`TokenProvider::ensure_access_token`] returns the cached value while it is
//! fresh and for the same resource, and refreshes it otherwise.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{Result, SpoError};

/// Azure AD authority host. The token path is appended at request time.
const AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Form body sent to the token endpoint.
/// Fields are serialized as `application/x-www-form-urlencoded` by reqwest's `.form()`.
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    client_id: &'a str,
    scope: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

/// Subset of the Azure AD token response that we need.
#[derive(Deserialize)]
pub struct TokenResponse {
    /// The bearer token.
    pub access_token: String,
    /// Always `Bearer` for this grant.
    pub token_type: String,
    /// Lifetime in seconds, counted from acquisition.
    pub expires_in: u64,
}

/// Safety buffer subtracted from `expires_in` so a token is refreshed before
/// it actually expires.
const EXPIRY_BUFFER_SECS: u64 = 60;

/// A token plus the resource it was issued for.
///
/// `resource` is `None` for tokens handed in by the user (`--access-token`),
/// which are accepted for any resource.
struct CachedToken {
    resource: Option<String>,
    response: TokenResponse,
    acquired_at: Instant,
}

/// Builds the `.default` scope for a SharePoint resource URL.
fn scope_for(resource: &str) -> String {
    format!("{}/.default", resource.trim_end_matches('/'))
}

/// Manages OAuth2 token acquisition and caching.
///
/// Invariants:
/// - `cached` is `None` until the first successful refresh, unless the
///   provider was built with [`TokenProvider::with_token`].
/// - A cached token is only handed out for the resource it was issued for
///   and only until its lifetime minus the safety buffer has elapsed.
pub struct TokenProvider {
    client: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cached: Option<CachedToken>,
}

impl TokenProvider {
    /// Creates a provider that acquires tokens with the client-credentials
    /// grant for the given Azure AD tenant and app registration.
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        TokenProvider {
            client: reqwest::Client::new(),
            authority: AUTHORITY_URL.to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            cached: None,
        }
    }

    /// Creates a provider seeded with a pre-acquired token.
    ///
    /// No token endpoint call is made while the token is considered fresh
    /// (one hour from construction). Used for `--access-token` and by tests.
    pub fn with_token(token: &str) -> Self {
        TokenProvider {
            client: reqwest::Client::new(),
            authority: AUTHORITY_URL.to_string(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            cached: Some(CachedToken {
                resource: None,
                response: TokenResponse {
                    access_token: token.to_string(),
                    token_type: "Bearer".to_string(),
                    expires_in: 3600,
                },
                acquired_at: Instant::now(),
            }),
        }
    }

    /// Points the provider at a different authority host.
    /// Tests use this to aim token requests at a mock server.
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Returns a bearer token valid for `resource`, refreshing it when none
    /// is cached, the cached one expired, or it was issued for another
    /// resource.
    pub async fn ensure_access_token(&mut self, resource: &str) -> Result<String> {
        if let Some(token) = self.token(resource) {
            tracing::debug!(resource, "using cached access token");
            return Ok(token.to_owned());
        }

        self.refresh_token(resource).await?;

        self.token(resource)
            .map(str::to_owned)
            .ok_or_else(|| SpoError::Auth {
                message: "token missing after refresh".to_string(),
                source: None,
            })
    }

    /// Fetches a new token for `resource` from Azure AD and caches it.
    ///
    /// The body is read as text before the status check so the AADSTS
    /// diagnostic survives into the error.
    pub async fn refresh_token(&mut self, resource: &str) -> Result<()> {
        if !self.has_credentials() {
            return Err(SpoError::Auth {
                message: format!(
                    "no valid access token for {resource} and no client credentials configured"
                ),
                source: None,
            });
        }

        let scope = scope_for(resource);
        let body = TokenRequest {
            client_id: &self.client_id,
            scope: &scope,
            client_secret: &self.client_secret,
            grant_type: "client_credentials",
        };

        tracing::debug!(resource, "requesting access token");
        let response = self
            .client
            .post(self.token_url())
            .form(&body)
            .send()
            .await
            .map_err(|e| SpoError::Auth {
                message: "token endpoint unreachable".to_string(),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| SpoError::Auth {
            message: "failed to read token response".to_string(),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(SpoError::Auth {
                message: format!("token request failed ({status}): {text}"),
                source: None,
            });
        }

        let resp: TokenResponse = serde_json::from_str(&text).map_err(|e| SpoError::Auth {
            message: "failed to parse token response".to_string(),
            source: Some(Box::new(e)),
        })?;

        self.cached = Some(CachedToken {
            resource: Some(resource.to_string()),
            response: resp,
            acquired_at: Instant::now(),
        });

        Ok(())
    }

    /// Returns `true` if a token exists but has exceeded its lifetime
    /// (minus the safety buffer). Returns `false` if no token is cached.
    fn is_expired(&self) -> bool {
        match &self.cached {
            Some(cached) => {
                let lifetime = cached.response.expires_in.saturating_sub(EXPIRY_BUFFER_SECS);
                cached.acquired_at.elapsed().as_secs() >= lifetime
            }
            None => false,
        }
    }

    /// Returns the cached access token if it is fresh and usable for
    /// `resource`.
    pub fn token(&self, resource: &str) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.cached
            .as_ref()
            .filter(|cached| match &cached.resource {
                Some(issued_for) => issued_for.trim_end_matches('/') == resource.trim_end_matches('/'),
                None => true,
            })
            .map(|cached| cached.response.access_token.as_str())
    }
}
