//! Environment validation helpers for CLI surfaces.

use bundle_sync_config::{BundleSyncEnv, ClientConfig, apply_env_overrides};
use bundle_sync_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Prefix shared by every environment variable the client reads.
pub const ENV_PREFIX: &str = "BUNDLE_SYNC_";

/// Validate that the provided env overrides can be parsed and merged into a config.
pub fn validate_env_parsing(env: &BTreeMap<String, String>) -> InfraResult<()> {
    let parsed = BundleSyncEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let _ = apply_env_overrides(ClientConfig::default(), &parsed)?;
    Ok(())
}

/// Collect the process environment variables carrying [`ENV_PREFIX`].
pub fn collect_scoped_env() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_overrides() {
        let env = BTreeMap::from([(
            "BUNDLE_SYNC_RETRY_MAX_ATTEMPTS".to_owned(),
            "many".to_owned(),
        )]);
        assert!(validate_env_parsing(&env).is_err());
    }

    #[test]
    fn accepts_empty_env() {
        assert!(validate_env_parsing(&BTreeMap::new()).is_ok());
    }
}
