//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - safe (secret-looking values are redacted in error metadata)

use crate::schema::{ClientConfig, ValidatedClientConfig};
use bundle_sync_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use url::Url;

/// Env var: remote code API base URL.
pub const ENV_API_BASE_URL: &str = "BUNDLE_SYNC_API_BASE_URL";
/// Env var: organization name.
pub const ENV_ORG: &str = "BUNDLE_SYNC_ORG";
/// Env var: FedRAMP routing toggle.
pub const ENV_FEDRAMP: &str = "BUNDLE_SYNC_FEDRAMP";
/// Env var: per-request timeout in milliseconds.
pub const ENV_API_TIMEOUT_MS: &str = "BUNDLE_SYNC_API_TIMEOUT_MS";
/// Env var: attempts per request.
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "BUNDLE_SYNC_RETRY_MAX_ATTEMPTS";
/// Env var: pause between attempts in milliseconds.
pub const ENV_RETRY_INTERVAL_MS: &str = "BUNDLE_SYNC_RETRY_INTERVAL_MS";
/// Env var: upload size ceiling per file.
pub const ENV_MAX_FILE_SIZE_BYTES: &str = "BUNDLE_SYNC_MAX_FILE_SIZE_BYTES";

/// Parsed env overrides. `None` leaves the file/default value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSyncEnv {
    /// `BUNDLE_SYNC_API_BASE_URL`.
    pub api_base_url: Option<String>,
    /// `BUNDLE_SYNC_ORG`.
    pub organization: Option<String>,
    /// `BUNDLE_SYNC_FEDRAMP`.
    pub fedramp: Option<bool>,
    /// `BUNDLE_SYNC_API_TIMEOUT_MS`.
    pub api_timeout_ms: Option<u64>,
    /// `BUNDLE_SYNC_RETRY_MAX_ATTEMPTS`.
    pub retry_max_attempts: Option<u32>,
    /// `BUNDLE_SYNC_RETRY_INTERVAL_MS`.
    pub retry_interval_ms: Option<u64>,
    /// `BUNDLE_SYNC_MAX_FILE_SIZE_BYTES`.
    pub max_file_size_bytes: Option<u64>,
}

impl BundleSyncEnv {
    /// Parse overrides from an explicit map (tests, embedding hosts).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            api_base_url: parse_optional_url_string(map, ENV_API_BASE_URL)?,
            organization: parse_optional_trimmed_string(map, ENV_ORG)?,
            fedramp: parse_optional_bool(map, ENV_FEDRAMP)?,
            api_timeout_ms: parse_optional_u64(map, ENV_API_TIMEOUT_MS)?,
            retry_max_attempts: parse_optional_u32(map, ENV_RETRY_MAX_ATTEMPTS)?,
            retry_interval_ms: parse_optional_u64(map, ENV_RETRY_INTERVAL_MS)?,
            max_file_size_bytes: parse_optional_u64(map, ENV_MAX_FILE_SIZE_BYTES)?,
        })
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: ClientConfig,
    env: &BundleSyncEnv,
) -> Result<ValidatedClientConfig, ErrorEnvelope> {
    let mut config = base;
    let mut mapper = EnvConfigMapper::new(&mut config);
    mapper.apply(env);

    config.validate_and_normalize().map_err(Into::into)
}

struct EnvConfigMapper<'a> {
    config: &'a mut ClientConfig,
}

impl<'a> EnvConfigMapper<'a> {
    const fn new(config: &'a mut ClientConfig) -> Self {
        Self { config }
    }

    fn apply(&mut self, env: &BundleSyncEnv) {
        Self::set_clone(&mut self.config.api.base_url, env.api_base_url.as_ref());
        if let Some(organization) = &env.organization {
            self.config.api.organization = Some(organization.clone());
        }
        Self::set_bool(&mut self.config.api.fedramp, env.fedramp);
        Self::set_u64(&mut self.config.api.timeout_ms, env.api_timeout_ms);
        Self::set_u32(&mut self.config.retry.max_attempts, env.retry_max_attempts);
        Self::set_u64(&mut self.config.retry.interval_ms, env.retry_interval_ms);
        Self::set_u64(
            &mut self.config.upload.max_file_size_bytes,
            env.max_file_size_bytes,
        );
    }

    const fn set_u64(field: &mut u64, value: Option<u64>) {
        if let Some(value) = value {
            *field = value;
        }
    }

    const fn set_u32(field: &mut u32, value: Option<u32>) {
        if let Some(value) = value {
            *field = value;
        }
    }

    const fn set_bool(field: &mut bool, value: Option<bool>) {
        if let Some(value) = value {
            *field = value;
        }
    }

    fn set_clone<T: Clone>(field: &mut T, value: Option<&T>) {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    #[error("{var} must be non-empty")]
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    #[error("{var} must be a boolean")]
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    #[error("{var} must be an integer")]
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// URL env var had an invalid value.
    #[error("{var} must be a valid http(s) URL")]
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
        }
    }
}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());

        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_if_secret(var, &value)),
        }
    }
}

fn present_trimmed<'m>(
    map: &'m BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<(&'m str, &'m String)>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    Ok(Some((trimmed, raw)))
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<String>, EnvParseError> {
    Ok(present_trimmed(map, var)?.map(|(trimmed, _)| trimmed.to_owned()))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some((trimmed, raw)) = present_trimmed(map, var)? else {
        return Ok(None);
    };
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some((trimmed, raw)) = present_trimmed(map, var)? else {
        return Ok(None);
    };
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some((trimmed, raw)) = present_trimmed(map, var)? else {
        return Ok(None);
    };
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<String>, EnvParseError> {
    let Some((trimmed, raw)) = present_trimmed(map, var)? else {
        return Ok(None);
    };
    let invalid = || EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    };
    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid());
    }
    Ok(Some(trimmed.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn map_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn missing_vars_default_to_none() -> Result<(), Box<dyn Error>> {
        let env = BundleSyncEnv::from_map(&BTreeMap::new())?;
        assert_eq!(env, BundleSyncEnv::default());
        Ok(())
    }

    #[test]
    fn values_are_trimmed_and_parsed() -> Result<(), Box<dyn Error>> {
        let env = BundleSyncEnv::from_map(&map_of(&[
            (ENV_ORG, "  acme "),
            (ENV_FEDRAMP, "Yes"),
            (ENV_RETRY_MAX_ATTEMPTS, " 5 "),
            (ENV_API_BASE_URL, "http://localhost:8080"),
        ]))?;
        assert_eq!(env.organization.as_deref(), Some("acme"));
        assert_eq!(env.fedramp, Some(true));
        assert_eq!(env.retry_max_attempts, Some(5));
        assert_eq!(env.api_base_url.as_deref(), Some("http://localhost:8080"));
        Ok(())
    }

    #[test]
    fn invalid_values_fail_fast() {
        let empty = BundleSyncEnv::from_map(&map_of(&[(ENV_ORG, "   ")])).err();
        assert_eq!(empty, Some(EnvParseError::EmptyValue { var: ENV_ORG }));

        let bool_err = BundleSyncEnv::from_map(&map_of(&[(ENV_FEDRAMP, "maybe")])).err();
        assert!(matches!(bool_err, Some(EnvParseError::InvalidBool { .. })));

        let url_err = BundleSyncEnv::from_map(&map_of(&[(ENV_API_BASE_URL, "ftp://x")])).err();
        assert!(matches!(url_err, Some(EnvParseError::InvalidUrl { .. })));
    }

    #[test]
    fn error_metadata_names_the_variable() -> Result<(), Box<dyn Error>> {
        let error = BundleSyncEnv::from_map(&map_of(&[(ENV_API_TIMEOUT_MS, "soon")]))
            .err()
            .ok_or_else(|| std::io::Error::other("expected int error"))?;
        let envelope: ErrorEnvelope = error.into();

        assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_int"));
        assert_eq!(
            envelope.metadata.get("env_var").map(String::as_str),
            Some(ENV_API_TIMEOUT_MS)
        );
        assert_eq!(envelope.metadata.get("value").map(String::as_str), Some("soon"));
        Ok(())
    }

    #[test]
    fn overrides_are_revalidated() -> Result<(), Box<dyn Error>> {
        let env = BundleSyncEnv {
            max_file_size_bytes: Some(2 * 1024 * 1024),
            ..BundleSyncEnv::default()
        };
        let error = apply_env_overrides(ClientConfig::default(), &env)
            .err()
            .ok_or_else(|| std::io::Error::other("expected limit error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_limit"));
        Ok(())
    }
}
