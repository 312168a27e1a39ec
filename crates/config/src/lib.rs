//! # bundle-sync-config
//!
//! Client configuration schema, validation, and normalization, plus code API
//! base URL resolution. This crate depends on `domain` and `shared` only.

/// Code API base URL resolution.
pub mod endpoint;
/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use endpoint::resolve_code_api_url;
pub use env::{
    BundleSyncEnv, ENV_API_BASE_URL, ENV_API_TIMEOUT_MS, ENV_FEDRAMP, ENV_MAX_FILE_SIZE_BYTES,
    ENV_ORG, ENV_RETRY_INTERVAL_MS, ENV_RETRY_MAX_ATTEMPTS, EnvParseError, apply_env_overrides,
};
pub use load::{
    load_client_config_from_path, load_client_config_from_sources, to_pretty_json, to_pretty_toml,
};
pub use schema::{
    ApiConfig, CURRENT_CONFIG_VERSION, ClientConfig, ConfigSchemaError, DEFAULT_BASE_URL,
    RetryConfig, UploadConfig, ValidatedClientConfig, parse_client_config_json,
    parse_client_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
