//! Remote bundle store boundary contract.

use crate::BoxFuture;
use bundle_sync_domain::FileMap;
use bundle_sync_shared::{RequestContext, Result};
use std::collections::BTreeMap;

/// Upload allow-lists published by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterLists {
    /// Supported file extensions, including the leading dot.
    pub extensions: Vec<String>,
    /// Supported configuration file base names.
    pub config_files: Vec<String>,
}

/// Remote view of a bundle after create or extend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteBundleState {
    /// Opaque bundle identifier.
    pub bundle_hash: String,
    /// Paths whose content the remote store still lacks.
    pub missing_files: Vec<String>,
}

/// Create a bundle from path to content-hash pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateBundleRequest {
    /// Encoded bundle path to content hash.
    pub files: BTreeMap<String, String>,
}

/// Upload file contents into an existing bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendBundleRequest {
    /// Bundle to extend.
    pub bundle_hash: String,
    /// Documents to upload keyed by encoded path.
    pub files: FileMap,
    /// Paths to drop from the bundle.
    pub removed_files: Vec<String>,
}

/// Boundary contract for the remote bundle store.
///
/// Both bundle calls are idempotent with respect to hashes the store
/// already knows.
pub trait BundleApiPort: Send + Sync {
    /// Fetch the upload allow-lists.
    fn get_filters(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<FilterLists>>;

    /// Create a bundle and learn which paths are missing.
    fn create_bundle(
        &self,
        ctx: &RequestContext,
        request: CreateBundleRequest,
    ) -> BoxFuture<'_, Result<RemoteBundleState>>;

    /// Upload contents into a bundle, yielding its new identity.
    fn extend_bundle(
        &self,
        ctx: &RequestContext,
        request: ExtendBundleRequest,
    ) -> BoxFuture<'_, Result<RemoteBundleState>>;
}
