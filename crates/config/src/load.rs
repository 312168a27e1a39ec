//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{BundleSyncEnv, ClientConfig, ValidatedClientConfig, apply_env_overrides};
use bundle_sync_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the client config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`BundleSyncEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`ClientConfig::default()`)
pub fn load_client_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &BundleSyncEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let config = match config_json {
        None => ClientConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };
    merge_and_validate(config, overrides_json, env)
}

/// Load the client config from an optional file path (`.json` or `.toml`).
pub fn load_client_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &BundleSyncEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let config = match config_path {
        None => ClientConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let config_text = read_config_file(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };
    merge_and_validate(config, overrides_json, env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &ClientConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &ClientConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn merge_and_validate(
    mut config: ClientConfig,
    overrides_json: Option<&str>,
    env: &BundleSyncEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, &overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<ClientConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<ClientConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ClientConfigOverrides {
    version: Option<u32>,
    api: ApiConfigOverrides,
    retry: RetryConfigOverrides,
    upload: UploadConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ApiConfigOverrides {
    base_url: Option<String>,
    organization: Option<String>,
    fedramp: Option<bool>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RetryConfigOverrides {
    max_attempts: Option<u32>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct UploadConfigOverrides {
    max_file_size_bytes: Option<u64>,
}

fn apply_overrides(config: &mut ClientConfig, overrides: &ClientConfigOverrides) {
    if let Some(version) = overrides.version {
        config.version = version;
    }

    let api = &overrides.api;
    if let Some(base_url) = &api.base_url {
        config.api.base_url.clone_from(base_url);
    }
    if let Some(organization) = &api.organization {
        config.api.organization = Some(organization.clone());
    }
    if let Some(fedramp) = api.fedramp {
        config.api.fedramp = fedramp;
    }
    if let Some(timeout_ms) = api.timeout_ms {
        config.api.timeout_ms = timeout_ms;
    }

    if let Some(max_attempts) = overrides.retry.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(interval_ms) = overrides.retry.interval_ms {
        config.retry.interval_ms = interval_ms;
    }
    if let Some(max_file_size_bytes) = overrides.upload.max_file_size_bytes {
        config.upload.max_file_size_bytes = max_file_size_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_precedence_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "version": 1, "api": { "timeoutMs": 45000 } }"#;
        let overrides_json = r#"{ "api": { "timeoutMs": 50000, "organization": "acme" } }"#;
        let env = BundleSyncEnv {
            api_timeout_ms: Some(55_000),
            ..BundleSyncEnv::default()
        };

        let config =
            load_client_config_from_sources(Some(config_json), Some(overrides_json), &env)?;
        assert_eq!(config.api.timeout_ms, 55_000);
        assert_eq!(config.api.organization.as_deref(), Some("acme"));
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_client_config_from_sources(None, None, &BundleSyncEnv::default())?;
        let first = to_pretty_json(&config)?;
        assert_eq!(first, to_pretty_json(&config)?);
        assert!(first.ends_with('\n'));

        let toml_text = to_pretty_toml(&config)?;
        assert!(toml_text.contains("[retry]"));
        Ok(())
    }

    #[test]
    fn invalid_config_value_overridden_by_valid_env_succeeds()
    -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "version": 1, "retry": { "maxAttempts": 0 } }"#;
        let env = BundleSyncEnv {
            retry_max_attempts: Some(4),
            ..BundleSyncEnv::default()
        };

        let config = load_client_config_from_sources(Some(config_json), None, &env)?;
        assert_eq!(config.retry.max_attempts, 4);
        Ok(())
    }

    #[test]
    fn malformed_overrides_are_tagged_with_their_source() -> Result<(), Box<dyn std::error::Error>>
    {
        let result = load_client_config_from_sources(
            None,
            Some(r#"{ "api": { "timeoutMs": }"#),
            &BundleSyncEnv::default(),
        );

        let error = result
            .err()
            .ok_or_else(|| std::io::Error::other("expected overrides error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_json"));
        assert_eq!(
            error.metadata.get("source").map(String::as_str),
            Some("overrides")
        );
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected_before_reading() -> Result<(), Box<dyn std::error::Error>>
    {
        let error = load_client_config_from_path(
            Some(Path::new("/nonexistent/config.yaml")),
            None,
            &BundleSyncEnv::default(),
        )
        .err()
        .ok_or_else(|| std::io::Error::other("expected format error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "unsupported_format"));
        Ok(())
    }
}
