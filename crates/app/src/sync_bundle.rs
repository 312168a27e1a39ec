//! Bundle synchronization state machine.
//!
//! ```text
//! Empty ──create──▶ Created ──extend──▶ Syncing ──┐
//!   │                  │                  ▲  │    │ extend
//!   │                  │                  └──┘◀───┘
//!   └──────────────────┴──── nothing missing ────▶ Converged
//! ```
//!
//! `Failed` is reachable from every state. The remote store is authoritative:
//! each extend response replaces the missing set, and every round re-packs the
//! new missing set against the local file contents. Batches are uploaded one
//! at a time. Cancellation is checked before each batch and never surfaces as
//! an error.

use crate::collect::collect_files;
use crate::types::{
    BundleSyncDeps, CreateBundleInput, CreateBundleOutput, SyncReport, SyncStatus, UploadStatus,
};
use bundle_sync_domain::{Bundle, pack_batches};
use bundle_sync_ports::{CreateBundleRequest, ExtendBundleRequest, log_fields};
use bundle_sync_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Synchronizer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No remote bundle yet.
    Empty,
    /// The remote store assigned a bundle hash.
    Created,
    /// Extend rounds are in progress.
    Syncing,
    /// Nothing is missing remotely.
    Converged,
    /// A remote call failed.
    Failed,
}

impl SyncState {
    /// Lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Created => "created",
            Self::Syncing => "syncing",
            Self::Converged => "converged",
            Self::Failed => "failed",
        }
    }
}

/// Allowed state transitions.
pub const SYNC_TRANSITIONS: &[(SyncState, SyncState)] = &[
    (SyncState::Empty, SyncState::Created),
    (SyncState::Empty, SyncState::Converged),
    (SyncState::Empty, SyncState::Failed),
    (SyncState::Created, SyncState::Syncing),
    (SyncState::Created, SyncState::Converged),
    (SyncState::Created, SyncState::Failed),
    (SyncState::Syncing, SyncState::Syncing),
    (SyncState::Syncing, SyncState::Converged),
    (SyncState::Syncing, SyncState::Failed),
];

#[derive(Debug)]
struct SyncMachine {
    state: SyncState,
}

impl SyncMachine {
    fn for_bundle(bundle: &Bundle) -> Self {
        let state = if bundle.bundle_hash().is_empty() {
            SyncState::Empty
        } else {
            SyncState::Created
        };
        Self { state }
    }

    fn transition(&mut self, next: SyncState) -> Result<()> {
        if SYNC_TRANSITIONS
            .iter()
            .any(|(source, target)| *source == self.state && *target == next)
        {
            self.state = next;
            return Ok(());
        }
        Err(ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!(
                "invalid bundle sync transition: {} -> {}",
                self.state.as_str(),
                next.as_str()
            ),
            ErrorClass::NonRetriable,
        ))
    }

    fn fail(&mut self, error: ErrorEnvelope, phase: &'static str) -> ErrorEnvelope {
        match self.transition(SyncState::Failed) {
            Ok(()) => error.with_phase(phase),
            Err(invalid) => invalid,
        }
    }
}

/// Collect files from `paths` and register their hashes with the remote store.
///
/// Returns the no-files error when the stream yields nothing. When no file is
/// eligible, no remote call is made and the bundle stays uncreated.
/// Failures are tagged with phase `filters` or `create`.
pub async fn create_bundle(
    ctx: &RequestContext,
    deps: &BundleSyncDeps,
    input: &CreateBundleInput,
    paths: &mut mpsc::Receiver<PathBuf>,
) -> Result<CreateBundleOutput> {
    let _span = deps.span("bundle.create");
    let collected = collect_files(ctx, deps, input, paths).await?;
    let mut bundle = Bundle::new(
        input.root.clone(),
        collected.files,
        collected.limit_to_files,
    );
    if collected.cancelled {
        return Ok(CreateBundleOutput {
            bundle,
            cancelled: true,
        });
    }
    if bundle.files().is_empty() {
        return Ok(CreateBundleOutput {
            bundle,
            cancelled: false,
        });
    }

    let request = CreateBundleRequest {
        files: bundle.hash_map(),
    };
    let state = match deps.bundle_api.create_bundle(ctx, request).await {
        Ok(state) => state,
        Err(error) if error.is_cancelled() => {
            return Ok(CreateBundleOutput {
                bundle,
                cancelled: true,
            });
        },
        Err(error) => {
            let mut machine = SyncMachine::for_bundle(&bundle);
            return Err(machine.fail(error, "create"));
        },
    };
    bundle.apply_remote_state(state.bundle_hash, state.missing_files);

    if let Some(logger) = &deps.logger {
        logger.info(
            "bundle.created",
            "created remote bundle",
            Some(log_fields([
                ("bundleHash", bundle.bundle_hash().into()),
                ("files", bundle.files().len().into()),
                ("missingFiles", bundle.missing_files().len().into()),
            ])),
        );
    }
    Ok(CreateBundleOutput {
        bundle,
        cancelled: false,
    })
}

/// Upload missing file contents until the remote store reports nothing missing.
///
/// When the remote store reports nothing missing the file contents are dropped
/// from `bundle`. A round whose missing paths are all unknown locally also ends
/// the loop, keeping the files. On cancellation or failure `bundle` keeps the
/// last state the remote store confirmed, and failures are tagged with phase
/// `extend`.
pub async fn upload_bundle(
    ctx: &RequestContext,
    deps: &BundleSyncDeps,
    bundle: &mut Bundle,
) -> Result<UploadStatus> {
    let _span = deps.span("bundle.upload");
    let mut machine = SyncMachine::for_bundle(bundle);
    let mut round = 0_usize;

    while !bundle.missing_files().is_empty() {
        let batches = {
            let _span = deps.span("bundle.group_in_batches");
            pack_batches(bundle.missing_files(), bundle.files())
        };
        if batches.is_empty() {
            machine.transition(SyncState::Converged)?;
            return Ok(UploadStatus::Converged);
        }
        round += 1;
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(UploadStatus::Cancelled);
            }
            let documents = batch.len();
            let request = ExtendBundleRequest {
                bundle_hash: bundle.bundle_hash().to_owned(),
                files: batch.into_documents(),
                removed_files: Vec::new(),
            };
            let state = match deps.bundle_api.extend_bundle(ctx, request).await {
                Ok(state) => state,
                Err(error) if error.is_cancelled() => return Ok(UploadStatus::Cancelled),
                Err(error) => return Err(machine.fail(error, "extend")),
            };
            machine.transition(SyncState::Syncing)?;
            bundle.apply_remote_state(state.bundle_hash, state.missing_files);

            if let Some(logger) = &deps.logger {
                logger.debug(
                    "bundle.upload.batch",
                    "uploaded batch",
                    Some(log_fields([
                        ("round", round.into()),
                        ("batch", (index + 1).into()),
                        ("batches", total.into()),
                        ("documents", documents.into()),
                        ("missingFiles", bundle.missing_files().len().into()),
                    ])),
                );
            }
        }
    }

    machine.transition(SyncState::Converged)?;
    bundle.clear_files();
    Ok(UploadStatus::Converged)
}

/// Input for [`sync_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDirectoryInput {
    /// Collection settings.
    pub create: CreateBundleInput,
}

/// Collect, create, and upload in one call.
///
/// No-files and cancellation are reported through [`SyncStatus`]; every other
/// failure is returned as an error.
pub async fn sync_directory(
    ctx: &RequestContext,
    deps: &BundleSyncDeps,
    input: &SyncDirectoryInput,
    mut paths: mpsc::Receiver<PathBuf>,
) -> Result<SyncReport> {
    let created = match create_bundle(ctx, deps, &input.create, &mut paths).await {
        Ok(created) => created,
        Err(error) if error.is_no_files() => {
            return Ok(SyncReport {
                bundle_hash: String::new(),
                files: 0,
                missing_after_sync: Vec::new(),
                limit_to_files: Vec::new(),
                status: SyncStatus::NoFiles,
            });
        },
        Err(error) => return Err(error),
    };
    drop(paths);

    let mut bundle = created.bundle;
    let files = bundle.files().len();
    let status = if created.cancelled {
        SyncStatus::Cancelled
    } else {
        match upload_bundle(ctx, deps, &mut bundle).await? {
            UploadStatus::Converged => SyncStatus::Converged,
            UploadStatus::Cancelled => SyncStatus::Cancelled,
        }
    };

    Ok(SyncReport {
        bundle_hash: bundle.bundle_hash().to_owned(),
        files,
        missing_after_sync: bundle.missing_files().to_vec(),
        limit_to_files: bundle.limit_to_files().to_vec(),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_allows_create_then_repeated_rounds() -> Result<()> {
        let mut machine = SyncMachine {
            state: SyncState::Empty,
        };
        machine.transition(SyncState::Created)?;
        machine.transition(SyncState::Syncing)?;
        machine.transition(SyncState::Syncing)?;
        machine.transition(SyncState::Converged)?;
        assert_eq!(machine.state, SyncState::Converged);
        Ok(())
    }

    #[test]
    fn machine_rejects_leaving_terminal_states() {
        let mut machine = SyncMachine {
            state: SyncState::Converged,
        };
        let error = machine.transition(SyncState::Syncing).err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::internal()));
    }

    #[test]
    fn failure_tags_phase() {
        let mut machine = SyncMachine {
            state: SyncState::Created,
        };
        let error = machine.fail(
            ErrorEnvelope::expected(ErrorCode::io(), "connection reset"),
            "extend",
        );
        assert_eq!(error.phase(), Some("extend"));
        assert_eq!(machine.state, SyncState::Failed);
    }

    #[test]
    fn machine_starts_from_bundle_identity() {
        let mut bundle = Bundle::new("/repo", Default::default(), Vec::new());
        assert_eq!(SyncMachine::for_bundle(&bundle).state, SyncState::Empty);
        bundle.apply_remote_state("h1".to_owned(), Vec::new());
        assert_eq!(SyncMachine::for_bundle(&bundle).state, SyncState::Created);
    }
}
