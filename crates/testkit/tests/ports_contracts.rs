//! Contract-style tests for port traits using in-memory adapters.

use bundle_sync_ports::{
    BundleApiPort, CreateBundleRequest, ErrorReportOptions, ErrorReporterPort, LogLevel,
    LoggerPort, TelemetryPort, log_fields,
};
use bundle_sync_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use bundle_sync_testkit::in_memory::{
    BundleCall, FailOn, InMemoryBundleStore, NoopLogger, NoopTelemetry, RecordingErrorReporter,
    RecordingLogger,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[tokio::test]
async fn bundle_store_contract_smoke() -> Result<()> {
    let store = InMemoryBundleStore::new(&[".java"], &[".snyk"]);
    store.preload(&["known"]);
    let ctx = RequestContext::new_request();

    let filters = store.get_filters(&ctx).await?;
    assert_eq!(filters.extensions, vec![".java".to_owned()]);

    let state = store
        .create_bundle(
            &ctx,
            CreateBundleRequest {
                files: BTreeMap::from([
                    ("A.java".to_owned(), "known".to_owned()),
                    ("B.java".to_owned(), "unknown".to_owned()),
                ]),
            },
        )
        .await?;
    assert_eq!(state.missing_files, vec!["B.java".to_owned()]);
    assert_eq!(
        store.calls(),
        vec![
            BundleCall::GetFilters,
            BundleCall::Create {
                paths: vec!["A.java".to_owned(), "B.java".to_owned()],
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn injected_failures_surface_unchanged() {
    let store = InMemoryBundleStore::new(&[], &[])
        .failing(FailOn::Filters, ErrorEnvelope::expected(ErrorCode::io(), "down"));
    let ctx = RequestContext::new_request();
    let error = store.get_filters(&ctx).await.err();
    assert_eq!(error.map(|error| error.code), Some(ErrorCode::io()));
}

#[test]
fn logger_and_telemetry_contract_smoke() {
    let logger: Arc<dyn LoggerPort> = Arc::new(NoopLogger);
    logger.info("test.event", "hello", Some(log_fields([("k", "v".into())])));
    let child = logger.child(log_fields([("scope", "child".into())]));
    child.warn("test.child", "child log", None);

    let telemetry: Arc<dyn TelemetryPort> = Arc::new(NoopTelemetry);
    telemetry.increment_counter("test.counter", 1, None);
    let span = telemetry.start_span("test.span", None);
    span.finish();
    span.finish();
}

#[test]
fn recorders_keep_events_and_errors() {
    let logger = RecordingLogger::default();
    logger.log_failure(
        LogLevel::Error,
        "test.failure",
        &ErrorEnvelope::expected(ErrorCode::not_found(), "gone"),
        None,
    );
    assert_eq!(logger.event_names(), vec!["test.failure".to_owned()]);

    let reporter = RecordingErrorReporter::default();
    reporter.capture_error(
        &ErrorEnvelope::expected(ErrorCode::io(), "boom"),
        &ErrorReportOptions::for_path("/repo"),
    );
    let captured = reporter.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(
        captured[0].options.diagnostic_path.as_deref(),
        Some(std::path::Path::new("/repo"))
    );
}
