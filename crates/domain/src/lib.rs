//! # bundle-sync-domain
//!
//! Pure bundle model for the synchronization protocol:
//!
//! - **Hashing** - content-addressing digest over raw bytes
//! - **Paths** - root-relative, percent-encoded bundle keys
//! - **Bundle** - `BundleFile`, `Bundle`, `FileMap`
//! - **Batch** - byte-budgeted packing of missing files into extend requests
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No I/O

pub mod batch;
pub mod bundle;
pub mod hashing;
pub mod paths;

pub use batch::{Batch, MAX_BATCH_BYTES, pack_batches, payload_size};
pub use bundle::{Bundle, BundleFile, FileMap};
pub use hashing::{CONTENT_HASH_HEX_LEN, content_hash};
pub use paths::{PathError, bundle_path, decode_path, encode_path, to_relative_unix_path};

/// Maximum size in bytes of a single uploaded file.
pub const MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        assert!(!domain_crate_version().is_empty());
    }
}
