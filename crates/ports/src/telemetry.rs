//! Telemetry boundary contract (spans + counters).

use std::collections::BTreeMap;

/// Telemetry tags. Keep tags low-cardinality.
pub type TelemetryTags = BTreeMap<Box<str>, Box<str>>;

/// An in-progress span.
pub trait TelemetrySpan: Send + Sync {
    /// Identifier shared by every request issued inside this span.
    fn trace_id(&self) -> &str;

    /// End the span and record its duration. Calling it twice is a no-op.
    fn finish(&self);
}

/// Boundary contract for telemetry.
pub trait TelemetryPort: Send + Sync {
    /// Start a named span.
    fn start_span(&self, name: &str, tags: Option<&TelemetryTags>) -> Box<dyn TelemetrySpan>;

    /// Increment a counter by `value`.
    fn increment_counter(&self, name: &str, value: u64, tags: Option<&TelemetryTags>);
}
