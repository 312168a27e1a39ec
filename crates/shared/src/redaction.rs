//! Secret detection for log fields and printed configuration.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// ```
/// use bundle_sync_shared::is_secret_key;
///
/// assert!(is_secret_key("SNYK_TOKEN"));
/// assert!(is_secret_key("authorization"));
/// assert!(!is_secret_key("bundleHash"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    ["KEY", "TOKEN", "SECRET", "PASSWORD", "CREDENTIAL", "AUTH"]
        .iter()
        .any(|needle| key.contains(needle))
}

/// Returns [`REDACTED`] for secret keys, or the original value otherwise.
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_owned()
    } else {
        value.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_secret_keys() {
        assert!(is_secret_key("api_key"));
        assert!(is_secret_key("Session-Token"));
        assert!(is_secret_key("CLIENT_SECRET"));
        assert!(is_secret_key("Authorization"));
    }

    #[test]
    fn leaves_protocol_fields_alone() {
        for key in ["bundleHash", "path", "status", "organization", "missingFiles"] {
            assert!(!is_secret_key(key), "{key}");
        }
    }

    #[test]
    fn redacts_only_secret_values() {
        assert_eq!(redact_if_secret("token", "abc"), REDACTED);
        assert_eq!(redact_if_secret("method", "PUT"), "PUT");
    }
}
