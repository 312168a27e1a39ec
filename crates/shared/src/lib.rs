//! # bundle-sync-shared
//!
//! Foundational types used by every other crate in the bundle-sync workspace:
//!
//! - `Result` and the structured `ErrorEnvelope`
//! - `RequestContext` (correlation id plus cooperative cancellation)
//! - the fixed-interval retry helper used by the HTTP transport
//! - secret-key redaction for logs
//!
//! This crate has no workspace dependencies.

pub mod concurrency;
pub mod errors;
pub mod redaction;
pub mod result;
pub mod retry;

pub use concurrency::{CorrelationId, RequestContext};
pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, PHASE_METADATA_KEY,
};
pub use redaction::{REDACTED, is_secret_key, redact_if_secret};
pub use result::{Result, ResultExt};
pub use retry::{AttemptOutcome, FixedIntervalRetry, retry_fixed_interval};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
