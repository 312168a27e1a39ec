//! # bundle-sync-adapters
//!
//! Adapter implementations for ports: the retrying HTTP transport and bundle
//! API client, local file access, JSON logging, telemetry, and error
//! reporting. This crate depends on `ports`, `shared`, and `config`.

pub mod bundle_client;
pub mod error_reporter;
pub mod fs;
pub mod http_transport;
pub mod log_sink;
pub mod logger;
pub mod telemetry;

pub use bundle_client::{BundleError, HttpBundleApi};
pub use error_reporter::LoggerErrorReporter;
pub use fs::{DirectoryWalk, LocalFileReader, WALKER_CHANNEL_CAPACITY, spawn_directory_walker};
pub use http_transport::{HttpMethod, HttpTransport, HttpTransportSettings};
pub use log_sink::{DiscardLogSink, LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;
pub use telemetry::JsonTelemetry;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn adapters_do_not_depend_on_app_or_infra() {
        let deps = workspace_deps();
        let forbidden = ["bundle-sync-app", "bundle-sync-infra"];

        for dep in &deps {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
        assert!(deps.iter().any(|dep| dep == "bundle-sync-ports"));
    }

    #[test]
    fn adapters_crate_compiles() {
        assert!(!adapters_crate_version().is_empty());
    }
}
