//! Connection context handed to every command run.
//!
//! A `Session` is an explicit value, built once in `main` from flags,
//! environment and config file, and passed by reference into the executor.
//! Nothing here is global or mutated behind the caller's back.

use url::Url;

use crate::error::{Result, SpoError};

/// Connected-site context for a command run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// The SharePoint site the user connected to (tenant commands require a
    /// tenant admin site, e.g. `https://contoso-admin.sharepoint.com`).
    pub site_url: Option<String>,
    /// Tenant object identity used in ProcessQuery `<Identity>` paths.
    /// Resolved on demand when absent.
    pub tenant_id: Option<String>,
    /// Pre-acquired bearer token, if the user supplied one.
    pub access_token: Option<String>,
}

impl Session {
    /// Creates a session connected to `site_url`.
    pub fn connected(site_url: &str) -> Self {
        Session {
            site_url: Some(site_url.trim_end_matches('/').to_string()),
            ..Session::default()
        }
    }

    /// Sets the tenant identity. `&#xA;` sequences (as the identity appears
    /// inside XML) are normalised back to line feeds.
    pub fn with_tenant_id(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(normalize_tenant_id(tenant_id));
        self
    }

    /// Sets a pre-acquired access token.
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Returns the connected site URL if it is a tenant admin site.
    ///
    /// # Errors
    ///
    /// `SpoError::Validation` when no site is connected, the connected URL
    /// is not a valid `https://` site URL, or it is not a tenant admin site.
    pub fn require_tenant_admin_site(&self) -> Result<&str> {
        let site = self.site_url.as_deref().ok_or_else(|| {
            SpoError::Validation("Connect to a SharePoint Online tenant admin site first".to_string())
        })?;
        validate_sharepoint_url(site)?;

        if !is_tenant_admin_site(site) {
            return Err(SpoError::Validation(format!(
                "{site} is not a tenant admin site. Connect to your tenant admin site and try again"
            )));
        }

        Ok(site)
    }
}

/// Normalises a tenant identity copied from XML.
pub fn normalize_tenant_id(raw: &str) -> String {
    raw.replace("&#xA;", "\n")
}

/// Validates that `url` is an absolute `https://` URL with a host.
///
/// # Errors
///
/// `SpoError::Validation` naming the offending value.
pub fn validate_sharepoint_url(url: &str) -> Result<Url> {
    let invalid = || SpoError::Validation(format!("{url} is not a valid SharePoint Online site URL"));

    if url.is_empty() {
        return Err(SpoError::Validation("Required option webUrl not specified".to_string()));
    }

    let parsed = Url::parse(url).map_err(|_| invalid())?;
    if parsed.scheme() != "https" || parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(parsed)
}

/// The token resource for a site: its scheme and host, without a path.
pub fn resource_for(site_url: &str) -> Result<String> {
    let parsed = validate_sharepoint_url(site_url)?;
    Ok(parsed.origin().ascii_serialization())
}

/// `true` when the host's first label ends in `-admin`
/// (`contoso-admin.sharepoint.com`).
pub fn is_tenant_admin_site(site_url: &str) -> bool {
    Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .and_then(|host| host.split('.').next().map(|label| label.ends_with("-admin")))
        .unwrap_or(false)
}
