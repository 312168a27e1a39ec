//! Dependencies, inputs, and outputs of the bundle use cases.

use crate::file_filter::FileFilter;
use bundle_sync_domain::{Bundle, FileMap, MAX_FILE_SIZE_BYTES};
use bundle_sync_ports::{
    BundleApiPort, ErrorReporterPort, FileReaderPort, LoggerPort, TelemetryPort, TelemetrySpan,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Dependencies shared by the bundle use cases.
#[derive(Clone)]
pub struct BundleSyncDeps {
    /// Remote bundle store.
    pub bundle_api: Arc<dyn BundleApiPort>,
    /// Upload allow-list cache.
    pub file_filter: Arc<FileFilter>,
    /// Local file access.
    pub file_reader: Arc<dyn FileReaderPort>,
    /// Sink for non-fatal errors.
    pub error_reporter: Arc<dyn ErrorReporterPort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
    /// Optional telemetry.
    pub telemetry: Option<Arc<dyn TelemetryPort>>,
}

impl BundleSyncDeps {
    pub(crate) fn span(&self, name: &str) -> SpanGuard {
        SpanGuard(
            self.telemetry
                .as_ref()
                .map(|telemetry| telemetry.start_span(name, None)),
        )
    }
}

/// Finishes the wrapped span when dropped.
pub(crate) struct SpanGuard(Option<Box<dyn TelemetrySpan>>);

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(span) = self.0.take() {
            span.finish();
        }
    }
}

/// Input for collecting and creating a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBundleInput {
    /// Directory every bundle key is relative to.
    pub root: PathBuf,
    /// Absolute paths the caller marked as changed.
    pub changed_files: BTreeSet<PathBuf>,
    /// Files larger than this are skipped.
    pub max_file_size_bytes: u64,
}

impl CreateBundleInput {
    /// Input with no changed files and the protocol's maximum file size.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            changed_files: BTreeSet::new(),
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
        }
    }
}

/// Files gathered from a path stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedFiles {
    /// Eligible files keyed by encoded bundle path.
    pub files: FileMap,
    /// Encoded paths of collected files the caller marked as changed.
    pub limit_to_files: Vec<String>,
    /// Number of paths read from the stream.
    pub candidates: usize,
    /// Collection stopped early because the request was cancelled.
    pub cancelled: bool,
}

/// Result of [`create_bundle`](crate::create_bundle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBundleOutput {
    /// The bundle; uncreated when no file was eligible or collection was cancelled.
    pub bundle: Bundle,
    /// The request was cancelled before the bundle was created.
    pub cancelled: bool,
}

/// How an upload ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// The remote store reported nothing missing.
    Converged,
    /// The request was cancelled between batches.
    Cancelled,
}

/// Final status of a directory sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every file is held by the remote store.
    Converged,
    /// The request was cancelled; the report holds partial progress.
    Cancelled,
    /// The directory yielded no candidate paths at all.
    NoFiles,
}

impl SyncStatus {
    /// Lowercase status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Cancelled => "cancelled",
            Self::NoFiles => "no_files",
        }
    }
}

/// Summary of [`sync_directory`](crate::sync_directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote bundle identifier; empty when no bundle was created.
    pub bundle_hash: String,
    /// Number of eligible files collected.
    pub files: usize,
    /// Paths still missing remotely when the sync stopped.
    pub missing_after_sync: Vec<String>,
    /// Encoded paths of changed files.
    pub limit_to_files: Vec<String>,
    /// How the sync ended.
    pub status: SyncStatus,
}
