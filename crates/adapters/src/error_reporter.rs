//! Error reporter that forwards captured errors to the structured logger.

use bundle_sync_ports::{ErrorReportOptions, ErrorReporterPort, LogLevel, LoggerPort, log_fields};
use bundle_sync_shared::ErrorEnvelope;
use std::sync::Arc;

/// Reports errors as `error.captured` log events.
#[derive(Clone)]
pub struct LoggerErrorReporter {
    logger: Arc<dyn LoggerPort>,
}

impl LoggerErrorReporter {
    /// Wrap a logger.
    #[must_use]
    pub fn new(logger: Arc<dyn LoggerPort>) -> Self {
        Self { logger }
    }
}

impl ErrorReporterPort for LoggerErrorReporter {
    fn capture_error(&self, error: &ErrorEnvelope, options: &ErrorReportOptions) {
        let fields = options.diagnostic_path.as_ref().map(|path| {
            log_fields([(
                "diagnosticPath",
                path.to_string_lossy().into_owned().into(),
            )])
        });
        self.logger
            .log_failure(LogLevel::Error, "error.captured", error, fields);
    }
}
