//! Drain a path stream into hashed, filtered bundle files.

use crate::types::{BundleSyncDeps, CollectedFiles, CreateBundleInput};
use bundle_sync_domain::{BundleFile, bundle_path};
use bundle_sync_ports::{ErrorReportOptions, LogLevel, log_fields};
use bundle_sync_shared::{ErrorEnvelope, RequestContext, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Collect eligible files from `paths` in arrival order.
///
/// Per path: stop if cancelled, skip unsupported paths, skip empty files and
/// files over `max_file_size_bytes`, read and hash the rest. The size rule is
/// checked on the stat and again on the bytes read. Stat, read, and
/// path normalization failures drop only the affected file. A filter fetch
/// failure aborts collection. An empty stream yields the no-files error;
/// cancellation yields the partial result.
pub async fn collect_files(
    ctx: &RequestContext,
    deps: &BundleSyncDeps,
    input: &CreateBundleInput,
    paths: &mut mpsc::Receiver<PathBuf>,
) -> Result<CollectedFiles> {
    let mut collected = CollectedFiles::default();

    while let Some(path) = paths.recv().await {
        collected.candidates += 1;
        if ctx.is_cancelled() {
            collected.cancelled = true;
            break;
        }
        if !deps.file_filter.is_supported(ctx, &path).await? {
            continue;
        }
        let Some(bytes) = read_candidate(ctx, deps, &path, input.max_file_size_bytes).await else {
            continue;
        };

        let key = match bundle_path(&input.root, &path) {
            Ok(key) => key,
            Err(error) => {
                deps.error_reporter.capture_error(
                    &ErrorEnvelope::from(error),
                    &ErrorReportOptions::for_path(&input.root),
                );
                continue;
            },
        };

        if input.changed_files.contains(&path) {
            collected.limit_to_files.push(key.clone());
        }
        collected.files.insert(key, BundleFile::from_raw(&bytes));
    }

    if collected.candidates == 0 {
        return Err(ErrorEnvelope::no_files());
    }

    if let Some(logger) = &deps.logger {
        logger.debug(
            "bundle.collect.done",
            "collected bundle files",
            Some(log_fields([
                ("candidates", collected.candidates.into()),
                ("files", collected.files.len().into()),
                ("cancelled", collected.cancelled.into()),
            ])),
        );
    }
    Ok(collected)
}

async fn read_candidate(
    ctx: &RequestContext,
    deps: &BundleSyncDeps,
    path: &Path,
    max_file_size_bytes: u64,
) -> Option<Vec<u8>> {
    let size = match deps.file_reader.file_size(ctx, path.to_path_buf()).await {
        Ok(size) => size,
        Err(error) => {
            log_skipped(deps, "bundle.collect.stat_failed", &error, path);
            return None;
        },
    };
    if !within_size_limit(size, max_file_size_bytes) {
        return None;
    }

    let bytes = match deps.file_reader.read_file(ctx, path.to_path_buf()).await {
        Ok(bytes) => bytes,
        Err(error) => {
            log_skipped(deps, "bundle.collect.read_failed", &error, path);
            return None;
        },
    };
    // The file may have changed since the stat.
    let read_size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    within_size_limit(read_size, max_file_size_bytes).then_some(bytes)
}

const fn within_size_limit(size: u64, max_file_size_bytes: u64) -> bool {
    size > 0 && size <= max_file_size_bytes
}

fn log_skipped(deps: &BundleSyncDeps, event: &str, error: &ErrorEnvelope, path: &Path) {
    if let Some(logger) = &deps.logger {
        logger.log_failure(
            LogLevel::Error,
            event,
            error,
            Some(log_fields([(
                "filePath",
                path.to_string_lossy().into_owned().into(),
            )])),
        );
    }
}
