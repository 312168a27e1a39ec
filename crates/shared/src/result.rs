//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for results carrying an `ErrorEnvelope`.
pub trait ResultExt<T> {
    /// Tag a failure with the sync phase it originated from.
    fn in_phase(self, phase: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_phase(self, phase: &'static str) -> Result<T> {
        self.map_err(|error| error.with_phase(phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn in_phase_tags_errors_only() {
        let ok: Result<i32> = Ok(1);
        assert!(matches!(ok.in_phase("create"), Ok(1)));

        let failed: Result<i32> = Err(ErrorEnvelope::expected(ErrorCode::internal(), "boom"));
        let tagged = failed.in_phase("create");
        assert!(matches!(tagged, Err(ref error) if error.phase() == Some("create")));
    }
}
