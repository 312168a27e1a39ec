//! # bundle-sync-testkit
//!
//! Test helpers and in-memory port doubles.
//! This crate depends on `ports` and `shared`.

pub mod errors;
pub mod in_memory;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
