//! # bundle-sync-app
//!
//! Bundle synchronization use cases: the upload allow-list filter, the file
//! collector, and the create/upload state machine.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod collect;
pub mod file_filter;
pub mod sync_bundle;
pub mod types;

pub use collect::collect_files;
pub use file_filter::{EXCLUDED_CONFIG_FILES, FileFilter, extension_of};
pub use sync_bundle::{
    SYNC_TRANSITIONS, SyncDirectoryInput, SyncState, create_bundle, sync_directory, upload_bundle,
};
pub use types::{
    BundleSyncDeps, CollectedFiles, CreateBundleInput, CreateBundleOutput, SyncReport, SyncStatus,
    UploadStatus,
};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
