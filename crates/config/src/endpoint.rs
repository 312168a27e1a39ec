//! Code API base URL resolution.

use crate::schema::{ApiConfig, sanitize_url_for_error};
use bundle_sync_shared::{ErrorCode, ErrorEnvelope};
use url::Url;

const DEEPROXY_HOST_PREFIX: &str = "deeproxy.";
const API_HOST_PREFIX: &str = "api.";

/// Resolve the base URL every bundle request is issued against.
///
/// Outside FedRAMP mode this is `api.base_url` verbatim. In FedRAMP mode the
/// host's `deeproxy.` prefix becomes `api.` (or `api.` is prepended) and the
/// path is replaced by `/hidden/orgs/{organization}/code`.
pub fn resolve_code_api_url(api: &ApiConfig) -> Result<String, ErrorEnvelope> {
    if !api.fedramp {
        return Ok(api.base_url.clone());
    }

    let invalid = || {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_url"),
            "api.baseUrl must be an http(s) URL",
        )
        .with_metadata("url", sanitize_url_for_error(&api.base_url))
    };
    let mut url = Url::parse(&api.base_url).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?;
    let rewritten = format!(
        "{API_HOST_PREFIX}{}",
        host.strip_prefix(DEEPROXY_HOST_PREFIX).unwrap_or(host)
    );
    url.set_host(Some(&rewritten)).map_err(|_| invalid())?;

    let organization = api
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|org| !org.is_empty())
        .ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "organization_required"),
                "organization is required in a FedRAMP environment",
            )
        })?;
    url.set_path(&format!("/hidden/orgs/{organization}/code"));

    Ok(url.to_string())
}
