//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the bundle use cases
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without a remote bundle store

use bundle_sync_ports::{
    BoxFuture, BundleApiPort, CreateBundleRequest, ErrorReportOptions, ErrorReporterPort,
    ExtendBundleRequest, FileReaderPort, FilterLists, LogEvent, LogFields, LoggerPort,
    RemoteBundleState, TelemetryPort, TelemetrySpan, TelemetryTags,
};
use bundle_sync_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl RecordingLogger {
    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names of the recorded events, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.event.into_string())
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(self.clone())
    }
}

/// A no-op span.
#[derive(Debug, Default)]
pub struct NoopSpan;

impl TelemetrySpan for NoopSpan {
    fn trace_id(&self) -> &str {
        ""
    }

    fn finish(&self) {}
}

/// A no-op telemetry implementation.
#[derive(Debug, Default)]
pub struct NoopTelemetry;

impl TelemetryPort for NoopTelemetry {
    fn start_span(&self, _name: &str, _tags: Option<&TelemetryTags>) -> Box<dyn TelemetrySpan> {
        Box::new(NoopSpan)
    }

    fn increment_counter(&self, _name: &str, _value: u64, _tags: Option<&TelemetryTags>) {}
}

/// Telemetry that records the name of every started span.
#[derive(Debug, Default, Clone)]
pub struct RecordingTelemetry {
    spans: Arc<Mutex<Vec<String>>>,
}

impl RecordingTelemetry {
    /// Names of the started spans, in order.
    pub fn span_names(&self) -> Vec<String> {
        self.spans.lock().unwrap().clone()
    }
}

impl TelemetryPort for RecordingTelemetry {
    fn start_span(&self, name: &str, _tags: Option<&TelemetryTags>) -> Box<dyn TelemetrySpan> {
        self.spans.lock().unwrap().push(name.to_owned());
        Box::new(NoopSpan)
    }

    fn increment_counter(&self, _name: &str, _value: u64, _tags: Option<&TelemetryTags>) {}
}

/// One captured error.
#[derive(Debug, Clone)]
pub struct CapturedError {
    /// The reported error.
    pub error: ErrorEnvelope,
    /// Options passed alongside it.
    pub options: ErrorReportOptions,
}

/// Error reporter that keeps every captured error in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingErrorReporter {
    captured: Arc<Mutex<Vec<CapturedError>>>,
}

impl RecordingErrorReporter {
    /// Snapshot of the captured errors.
    pub fn captured(&self) -> Vec<CapturedError> {
        self.captured.lock().unwrap().clone()
    }
}

impl ErrorReporterPort for RecordingErrorReporter {
    fn capture_error(&self, error: &ErrorEnvelope, options: &ErrorReportOptions) {
        self.captured.lock().unwrap().push(CapturedError {
            error: error.clone(),
            options: options.clone(),
        });
    }
}

/// In-memory file system keyed by absolute path.
///
/// Paths registered with [`InMemoryFileReader::with_unreadable_file`] report a
/// size but fail to read.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFileReader {
    files: BTreeMap<PathBuf, Vec<u8>>,
    unreadable: BTreeMap<PathBuf, u64>,
    stale_sizes: BTreeMap<PathBuf, u64>,
}

impl InMemoryFileReader {
    /// Empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add a file whose read always fails.
    #[must_use]
    pub fn with_unreadable_file(mut self, path: impl Into<PathBuf>, size: u64) -> Self {
        self.unreadable.insert(path.into(), size);
        self
    }

    /// Add a file whose stat reports `stat_size` regardless of its content,
    /// as when the file changes between stat and read.
    #[must_use]
    pub fn with_stale_size(
        mut self,
        path: impl Into<PathBuf>,
        stat_size: u64,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        let path = path.into();
        self.stale_sizes.insert(path.clone(), stat_size);
        self.files.insert(path, content.into());
        self
    }

    /// Every registered path, readable or not, in sorted order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .keys()
            .chain(self.unreadable.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn missing_file(path: &std::path::Path) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::not_found(), "file not found")
        .with_metadata("path", path.to_string_lossy())
}

impl FileReaderPort for InMemoryFileReader {
    fn file_size(&self, _ctx: &RequestContext, path: PathBuf) -> BoxFuture<'_, Result<u64>> {
        let size = self
            .stale_sizes
            .get(&path)
            .copied()
            .or_else(|| self.files.get(&path).map(|content| content.len() as u64))
            .or_else(|| self.unreadable.get(&path).copied())
            .ok_or_else(|| missing_file(&path));
        Box::pin(async move { size })
    }

    fn read_file(&self, _ctx: &RequestContext, path: PathBuf) -> BoxFuture<'_, Result<Vec<u8>>> {
        let content = if self.unreadable.contains_key(&path) {
            Err(ErrorEnvelope::expected(ErrorCode::permission_denied(), "read denied")
                .with_metadata("path", path.to_string_lossy()))
        } else {
            self.files.get(&path).cloned().ok_or_else(|| missing_file(&path))
        };
        Box::pin(async move { content })
    }
}

/// A call received by [`InMemoryBundleStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleCall {
    /// `get_filters`.
    GetFilters,
    /// `create_bundle` with the given paths.
    Create {
        /// Encoded paths in the request.
        paths: Vec<String>,
    },
    /// `extend_bundle` on `bundle_hash` with the given documents.
    Extend {
        /// Bundle being extended.
        bundle_hash: String,
        /// Encoded paths of the uploaded documents.
        documents: Vec<String>,
    },
}

/// Which store call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// `get_filters`.
    Filters,
    /// `create_bundle`.
    Create,
    /// The n-th `extend_bundle` call, counting from 1.
    Extend(usize),
}

#[derive(Debug, Default)]
struct StoreState {
    contents: BTreeSet<String>,
    bundles: BTreeMap<String, BTreeMap<String, String>>,
    next_bundle: usize,
    extends: usize,
    calls: Vec<BundleCall>,
}

/// Content-addressed bundle store kept in memory.
///
/// A bundle maps encoded paths to content hashes. A path is missing while the
/// store does not hold content for its hash. Every create and extend yields a
/// fresh bundle hash.
#[derive(Debug, Clone)]
pub struct InMemoryBundleStore {
    filters: FilterLists,
    extra_missing: Vec<String>,
    accept_per_extend: Option<usize>,
    failure: Option<(FailOn, ErrorEnvelope)>,
    cancel_after_extends: Option<usize>,
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBundleStore {
    /// Store publishing the given allow-lists.
    pub fn new(extensions: &[&str], config_files: &[&str]) -> Self {
        Self {
            filters: FilterLists {
                extensions: extensions.iter().map(ToString::to_string).collect(),
                config_files: config_files.iter().map(ToString::to_string).collect(),
            },
            extra_missing: Vec::new(),
            accept_per_extend: None,
            failure: None,
            cancel_after_extends: None,
            state: Arc::default(),
        }
    }

    /// Append paths the client never sent to the missing list of every created bundle.
    #[must_use]
    pub fn with_extra_missing(mut self, paths: &[&str]) -> Self {
        self.extra_missing = paths.iter().map(ToString::to_string).collect();
        self
    }

    /// Keep only the first `count` documents of each extend request.
    #[must_use]
    pub const fn accepting_per_extend(mut self, count: usize) -> Self {
        self.accept_per_extend = Some(count);
        self
    }

    /// Fail the given call with `error`.
    #[must_use]
    pub fn failing(mut self, on: FailOn, error: ErrorEnvelope) -> Self {
        self.failure = Some((on, error));
        self
    }

    /// Cancel the caller's context once `count` extend calls have succeeded.
    #[must_use]
    pub const fn cancelling_after_extends(mut self, count: usize) -> Self {
        self.cancel_after_extends = Some(count);
        self
    }

    /// Pre-load content so its paths are never reported missing.
    pub fn preload(&self, hashes: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .contents
            .extend(hashes.iter().map(ToString::to_string));
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<BundleCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the extend calls received so far.
    pub fn extend_calls(&self) -> Vec<BundleCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, BundleCall::Extend { .. }))
            .collect()
    }

    fn failure_for(&self, on: FailOn) -> Option<ErrorEnvelope> {
        self.failure
            .as_ref()
            .filter(|(target, _)| *target == on)
            .map(|(_, error)| error.clone())
    }

    fn store_bundle(
        state: &mut StoreState,
        files: BTreeMap<String, String>,
        extra_missing: &[String],
    ) -> RemoteBundleState {
        state.next_bundle += 1;
        let bundle_hash = format!("bundle-{}", state.next_bundle);
        let mut missing_files: Vec<String> = files
            .iter()
            .filter(|(_, hash)| !state.contents.contains(*hash))
            .map(|(path, _)| path.clone())
            .collect();
        missing_files.extend(extra_missing.iter().cloned());
        state.bundles.insert(bundle_hash.clone(), files);
        RemoteBundleState {
            bundle_hash,
            missing_files,
        }
    }
}

impl BundleApiPort for InMemoryBundleStore {
    fn get_filters(&self, _ctx: &RequestContext) -> BoxFuture<'_, Result<FilterLists>> {
        self.state.lock().unwrap().calls.push(BundleCall::GetFilters);
        let result = self
            .failure_for(FailOn::Filters)
            .map_or_else(|| Ok(self.filters.clone()), Err);
        Box::pin(async move { result })
    }

    fn create_bundle(
        &self,
        _ctx: &RequestContext,
        request: CreateBundleRequest,
    ) -> BoxFuture<'_, Result<RemoteBundleState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BundleCall::Create {
            paths: request.files.keys().cloned().collect(),
        });
        let result = match self.failure_for(FailOn::Create) {
            Some(error) => Err(error),
            None => Ok(Self::store_bundle(&mut state, request.files, &self.extra_missing)),
        };
        drop(state);
        Box::pin(async move { result })
    }

    fn extend_bundle(
        &self,
        ctx: &RequestContext,
        request: ExtendBundleRequest,
    ) -> BoxFuture<'_, Result<RemoteBundleState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BundleCall::Extend {
            bundle_hash: request.bundle_hash.clone(),
            documents: request.files.keys().cloned().collect(),
        });
        state.extends += 1;
        let call_index = state.extends;

        let result = if let Some(error) = self.failure_for(FailOn::Extend(call_index)) {
            Err(error)
        } else if let Some(mut files) = state.bundles.get(&request.bundle_hash).cloned() {
            let accepted = self.accept_per_extend.unwrap_or(usize::MAX);
            for (path, file) in request.files.into_iter().take(accepted) {
                state.contents.insert(file.hash.clone());
                files.insert(path, file.hash);
            }
            for removed in &request.removed_files {
                files.remove(removed);
            }
            Ok(Self::store_bundle(&mut state, files, &[]))
        } else {
            Err(ErrorEnvelope::expected(ErrorCode::not_found(), "unknown bundle")
                .with_metadata("bundleHash", request.bundle_hash))
        };
        drop(state);

        if result.is_ok() && self.cancel_after_extends == Some(call_index) {
            ctx.cancel();
        }
        Box::pin(async move { result })
    }
}
