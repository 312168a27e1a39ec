//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use bundle_sync_config::{
    BundleSyncEnv, ValidatedClientConfig, load_client_config_from_path, to_pretty_json,
    to_pretty_toml,
};
use bundle_sync_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Serialization used when printing a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigOutputFormat {
    /// Pretty JSON.
    #[default]
    Json,
    /// Pretty TOML.
    Toml,
}

/// Load and validate the effective config from an explicit env map.
pub fn load_effective_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<ValidatedClientConfig> {
    let env = BundleSyncEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    load_client_config_from_path(config_path, overrides_json, &env)
}

/// Load and validate the effective config, returning deterministic pretty output.
pub fn render_effective_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    format: ConfigOutputFormat,
) -> InfraResult<String> {
    let config = load_effective_config(env, config_path, overrides_json)?;
    match format {
        ConfigOutputFormat::Json => to_pretty_json(&config),
        ConfigOutputFormat::Toml => to_pretty_toml(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_reach_rendered_output() -> InfraResult<()> {
        let env = BTreeMap::from([("BUNDLE_SYNC_ORG".to_owned(), "acme".to_owned())]);
        let rendered = render_effective_config(&env, None, None, ConfigOutputFormat::Json)?;
        assert!(rendered.contains("\"organization\": \"acme\""));
        assert!(rendered.ends_with('\n'));
        Ok(())
    }

    #[test]
    fn toml_output_has_sections() -> InfraResult<()> {
        let rendered =
            render_effective_config(&BTreeMap::new(), None, None, ConfigOutputFormat::Toml)?;
        assert!(rendered.contains("[api]"));
        assert!(rendered.contains("[retry]"));
        Ok(())
    }
}
