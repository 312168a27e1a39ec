//! `sync`: upload a directory to the remote bundle store.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, pretty_json_line};
use bundle_sync_infra::{SyncLocalRequest, SyncSummary, run_sync_local};
use std::path::{Path, PathBuf};

/// Flags of the `sync` command.
#[derive(Debug, Clone, Copy)]
pub struct SyncCommandInput<'a> {
    pub config_path: Option<&'a Path>,
    pub organization: Option<&'a str>,
    pub base_url: Option<&'a str>,
    pub root: &'a Path,
    pub changed: &'a [PathBuf],
}

pub fn run_sync(mode: OutputMode, input: &SyncCommandInput<'_>) -> Result<CliOutput, CliError> {
    let overrides = build_overrides_json(input.organization, input.base_url)?;
    let request = SyncLocalRequest {
        root: input.root.to_path_buf(),
        changed_files: input.changed.to_vec(),
    };
    let summary = run_sync_local(input.config_path, overrides.as_deref(), &request)?;

    let stdout = if mode.is_json() {
        pretty_json_line(&serde_json::to_value(&summary)?)?
    } else {
        format_summary_text(&summary)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn build_overrides_json(
    organization: Option<&str>,
    base_url: Option<&str>,
) -> Result<Option<String>, CliError> {
    let mut api = serde_json::Map::new();
    if let Some(organization) = organization {
        api.insert(
            "organization".to_owned(),
            serde_json::Value::String(organization.to_owned()),
        );
    }
    if let Some(base_url) = base_url {
        api.insert(
            "baseUrl".to_owned(),
            serde_json::Value::String(base_url.to_owned()),
        );
    }
    if api.is_empty() {
        return Ok(None);
    }

    let payload = serde_json::json!({ "api": api });
    Ok(Some(serde_json::to_string(&payload)?))
}

fn format_summary_text(summary: &SyncSummary) -> String {
    let mut out = format!("status: {}\n", summary.status);
    if !summary.bundle_hash.is_empty() {
        out.push_str("bundle: ");
        out.push_str(&summary.bundle_hash);
        out.push('\n');
    }
    out.push_str(&format!("files: {}\n", summary.files));
    if !summary.missing_after_sync.is_empty() {
        out.push_str(&format!(
            "missing: {}\n",
            summary.missing_after_sync.len()
        ));
        for path in &summary.missing_after_sync {
            out.push_str("  ");
            out.push_str(path);
            out.push('\n');
        }
    }
    if !summary.limit_to_files.is_empty() {
        out.push_str("changed:\n");
        for path in &summary.limit_to_files {
            out.push_str("  ");
            out.push_str(path);
            out.push('\n');
        }
    }
    out
}
