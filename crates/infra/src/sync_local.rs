//! Local directory sync: adapter wiring plus the walk, create, and upload run.

use crate::observability::{Observability, ObservabilitySettings};
use crate::{InfraError, InfraResult, collect_scoped_env, load_effective_config};
use bundle_sync_adapters::{
    DiscardLogSink, HttpBundleApi, HttpTransport, HttpTransportSettings, JsonLogger,
    LocalFileReader, LoggerErrorReporter, spawn_directory_walker,
};
use bundle_sync_app::{
    BundleSyncDeps, CreateBundleInput, FileFilter, SyncDirectoryInput, SyncReport,
    sync_directory,
};
use bundle_sync_config::ValidatedClientConfig;
use bundle_sync_ports::{BundleApiPort, LoggerPort};
use bundle_sync_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLocalRequest {
    /// Directory to upload.
    pub root: PathBuf,
    /// Files the caller marked as changed; relative paths resolve against `root`.
    pub changed_files: Vec<PathBuf>,
}

/// Serializable outcome of a directory sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// `converged`, `cancelled`, or `no_files`.
    pub status: &'static str,
    /// Remote bundle identifier; empty when nothing was created.
    pub bundle_hash: String,
    /// Eligible files collected.
    pub files: usize,
    /// Paths the remote store still lacked when the run stopped.
    pub missing_after_sync: Vec<String>,
    /// Encoded paths of changed files.
    pub limit_to_files: Vec<String>,
}

impl From<SyncReport> for SyncSummary {
    fn from(report: SyncReport) -> Self {
        Self {
            status: report.status.as_str(),
            bundle_hash: report.bundle_hash,
            files: report.files,
            missing_after_sync: report.missing_after_sync,
            limit_to_files: report.limit_to_files,
        }
    }
}

/// Wire production adapters for one request.
pub fn build_sync_deps(
    config: &ValidatedClientConfig,
    observability: &Observability,
) -> InfraResult<BundleSyncDeps> {
    let reporter_logger: Arc<dyn LoggerPort> = observability
        .logger
        .clone()
        .unwrap_or_else(|| Arc::new(JsonLogger::new(Arc::new(DiscardLogSink))));
    let error_reporter = Arc::new(LoggerErrorReporter::new(reporter_logger));

    let settings = HttpTransportSettings::from_config(config)?;
    let transport = HttpTransport::new(
        &settings,
        Arc::clone(&observability.transport_telemetry),
        error_reporter.clone(),
    )?;
    let bundle_api: Arc<dyn BundleApiPort> = Arc::new(HttpBundleApi::new(Arc::new(transport)));

    Ok(BundleSyncDeps {
        file_filter: Arc::new(FileFilter::new(Arc::clone(&bundle_api))),
        bundle_api,
        file_reader: Arc::new(LocalFileReader::new()),
        error_reporter,
        logger: observability.logger.clone(),
        telemetry: observability.telemetry.clone(),
    })
}

/// Walk `request.root` and synchronize it with the remote bundle store.
pub async fn run_sync(
    ctx: &RequestContext,
    config: &ValidatedClientConfig,
    settings: &ObservabilitySettings,
    request: &SyncLocalRequest,
) -> InfraResult<SyncSummary> {
    let root = resolve_root(&request.root).await?;
    let observability = settings.build(ctx);
    let deps = build_sync_deps(config, &observability)?;

    let mut create = CreateBundleInput::new(root.clone());
    create.max_file_size_bytes = config.upload.max_file_size_bytes;
    for path in &request.changed_files {
        create.changed_files.insert(resolve_changed(&root, path).await);
    }

    let walk = spawn_directory_walker(root);
    let report = sync_directory(ctx, &deps, &SyncDirectoryInput { create }, walk.paths).await;
    walk.task.abort();
    if let Err(error) = walk.task.await
        && error.is_panic()
    {
        return Err(ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("directory walker failed: {error}"),
            ErrorClass::NonRetriable,
        ));
    }

    let summary = SyncSummary::from(report?);
    tracing::info!(
        status = summary.status,
        bundle_hash = %summary.bundle_hash,
        files = summary.files,
        "bundle sync finished"
    );
    Ok(summary)
}

/// Load config from the process environment and run [`run_sync`] on a fresh runtime.
///
/// Ctrl-C cancels the request; the partial summary is still returned.
pub fn run_sync_local(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    request: &SyncLocalRequest,
) -> InfraResult<SyncSummary> {
    let env = collect_scoped_env();
    let config = load_effective_config(&env, config_path, overrides_json)?;
    let settings = ObservabilitySettings::from_env_map(&env);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;
    let ctx = RequestContext::new_request();
    runtime.block_on(async {
        let interrupt = spawn_interrupt_watcher(&ctx);
        let result = run_sync(&ctx, &config, &settings, request).await;
        interrupt.abort();
        result
    })
}

fn spawn_interrupt_watcher(ctx: &RequestContext) -> tokio::task::JoinHandle<()> {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling sync");
            ctx.cancel();
        }
    })
}

async fn resolve_root(root: &Path) -> InfraResult<PathBuf> {
    let canonical = tokio::fs::canonicalize(root).await.map_err(|error| {
        ErrorEnvelope::from(error).with_metadata("root", root.to_string_lossy())
    })?;
    let metadata = tokio::fs::metadata(&canonical)
        .await
        .map_err(ErrorEnvelope::from)?;
    if !metadata.is_dir() {
        return Err(
            ErrorEnvelope::expected(ErrorCode::invalid_input(), "sync root is not a directory")
                .with_metadata("root", root.to_string_lossy()),
        );
    }
    Ok(canonical)
}

/// Resolve a changed-file path the way the walker will report it: joined to
/// the canonical root when relative, then canonicalized when it exists.
async fn resolve_changed(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    tokio::fs::canonicalize(&joined).await.unwrap_or(joined)
}
