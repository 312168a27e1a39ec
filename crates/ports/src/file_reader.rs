//! Local file access boundary contract.

use crate::BoxFuture;
use bundle_sync_shared::{RequestContext, Result};
use std::path::PathBuf;

/// Boundary contract for reading candidate files by absolute path.
pub trait FileReaderPort: Send + Sync {
    /// Size of the file in bytes, without reading it.
    fn file_size(&self, ctx: &RequestContext, path: PathBuf) -> BoxFuture<'_, Result<u64>>;

    /// Read the whole file.
    fn read_file(&self, ctx: &RequestContext, path: PathBuf) -> BoxFuture<'_, Result<Vec<u8>>>;
}
