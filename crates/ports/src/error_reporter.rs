//! Error reporting boundary contract.

use bundle_sync_shared::ErrorEnvelope;
use std::path::PathBuf;

/// Context attached to a captured error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorReportOptions {
    /// File or directory the error relates to.
    pub diagnostic_path: Option<PathBuf>,
}

impl ErrorReportOptions {
    /// Options pointing at `path`.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            diagnostic_path: Some(path.into()),
        }
    }
}

/// Boundary contract for reporting non-fatal and transport errors.
pub trait ErrorReporterPort: Send + Sync {
    /// Record an error.
    fn capture_error(&self, error: &ErrorEnvelope, options: &ErrorReportOptions);
}
