//! Integration tests for shared error propagation.

use bundle_sync_shared::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind};
use bundle_sync_testkit::errors::{cancelled_error, rejected_error, timeout_error};

#[test]
fn error_envelope_crosses_crates() {
    let timeout = timeout_error();
    assert_eq!(timeout.code, ErrorCode::timeout());

    let boxed: Box<dyn std::error::Error> = Box::new(timeout);
    assert!(boxed.to_string().contains("timeout"));

    assert!(cancelled_error().is_cancelled());
}

#[test]
fn phase_tag_survives_cloning() {
    let error = rejected_error().with_phase("extend");
    let copy = error.clone();
    assert_eq!(copy.phase(), Some("extend"));
    assert_eq!(copy.class, ErrorClass::NonRetriable);
    assert_eq!(copy.kind, ErrorKind::Expected);
}

#[test]
fn no_files_is_distinguishable() {
    let error = ErrorEnvelope::no_files();
    assert!(error.is_no_files());
    assert!(!rejected_error().is_no_files());
}
