//! `hash`: content hash of a single file.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, pretty_json_line};
use bundle_sync_domain::content_hash;
use bundle_sync_infra::ErrorEnvelope;
use std::path::Path;

pub fn run_hash(mode: OutputMode, path: &Path) -> Result<CliOutput, CliError> {
    let content = std::fs::read(path).map_err(|error| {
        ErrorEnvelope::from(error).with_metadata("path", path.to_string_lossy())
    })?;
    let hash = content_hash(&content);
    tracing::debug!(path = %path.display(), bytes = content.len(), "hashed file");

    let stdout = if mode.is_json() {
        pretty_json_line(&serde_json::json!({
            "path": path.to_string_lossy(),
            "hash": hash,
            "size": content.len(),
        }))?
    } else {
        format!("{hash}\n")
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
