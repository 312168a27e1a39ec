//! # bundle-sync-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, `ports`, and `shared`.

/// Config loading helpers used by CLI surfaces.
pub mod config_check;
/// Environment validation helpers used by CLI surfaces.
pub mod env_check;
/// Logger and telemetry selection.
pub mod observability;
/// Local directory sync orchestration.
pub mod sync_local;

pub use config_check::{ConfigOutputFormat, load_effective_config, render_effective_config};
pub use env_check::{
    ENV_PREFIX, InfraError, InfraResult, collect_scoped_env, validate_env_parsing,
};
pub use observability::{
    ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_TELEMETRY_FORMAT, Observability, ObservabilitySettings,
};
pub use sync_local::{
    SyncLocalRequest, SyncSummary, build_sync_deps, run_sync, run_sync_local,
};

// Re-exported so the CLI needs no direct dependency on the app or shared crates.
pub use bundle_sync_app::{FileFilter, SyncStatus};
pub use bundle_sync_shared::{ErrorCode, ErrorEnvelope, is_secret_key, redact_if_secret};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_sync_adapters::adapters_crate_version;
    use bundle_sync_app::app_crate_version;
    use bundle_sync_config::config_crate_version;
    use bundle_sync_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
                continue;
            }
            if in_deps && line.starts_with("bundle-sync-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn infra_depends_on_app_adapters_config() {
        let deps = workspace_deps();
        let required = [
            "bundle-sync-app",
            "bundle-sync-adapters",
            "bundle-sync-config",
        ];

        for expected in required {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn infra_crate_compiles() {
        assert!(!infra_crate_version().is_empty());
    }

    #[test]
    fn infra_can_use_app_adapters_config_shared() {
        assert!(!app_crate_version().is_empty());
        assert!(!adapters_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
