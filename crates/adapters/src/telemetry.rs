//! JSON telemetry adapter (counters and traced spans).

use crate::log_sink::LogSink;
use crate::logger::now_epoch_ms;
use bundle_sync_ports::{TelemetryPort, TelemetrySpan, TelemetryTags};
use bundle_sync_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use uuid::Uuid;

const SERIALIZE_FAILED_LINE: &str = "{\"type\":\"metric\",\"metricType\":\"error\",\"name\":\"telemetry.serialize_failed\",\"value\":1}\n";

/// Telemetry adapter that emits JSON lines.
///
/// Each span gets a random trace id; the HTTP transport forwards it as the
/// request id so server-side logs can be joined with local ones.
#[derive(Clone)]
pub struct JsonTelemetry {
    sink: Arc<dyn LogSink>,
    base_tags: TelemetryTags,
}

impl JsonTelemetry {
    /// Create a telemetry adapter backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_tags: TelemetryTags::new(),
        }
    }

    /// Set base tags applied to every metric and span.
    #[must_use]
    pub fn with_base_tags(mut self, tags: TelemetryTags) -> Self {
        self.base_tags = tags;
        self
    }
}

impl TelemetryPort for JsonTelemetry {
    fn start_span(&self, name: &str, tags: Option<&TelemetryTags>) -> Box<dyn TelemetrySpan> {
        let tags = merge_tags(&self.base_tags, tags);
        let trace_id = Uuid::new_v4().simple().to_string();
        self.sink
            .write_line(&span_payload("start", name, &trace_id, None, &tags));
        Box::new(JsonSpan {
            sink: Arc::clone(&self.sink),
            name: Box::from(name),
            trace_id,
            tags,
            started_at: Instant::now(),
            finished: AtomicBool::new(false),
        })
    }

    fn increment_counter(&self, name: &str, value: u64, tags: Option<&TelemetryTags>) {
        let tags = merge_tags(&self.base_tags, tags);
        self.sink
            .write_line(&metric_payload("counter", name, value, None, &tags));
    }
}

struct JsonSpan {
    sink: Arc<dyn LogSink>,
    name: Box<str>,
    trace_id: String,
    tags: TelemetryTags,
    started_at: Instant,
    finished: AtomicBool,
}

impl TelemetrySpan for JsonSpan {
    fn trace_id(&self) -> &str {
        &self.trace_id
    }

    fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let duration_ms = u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or_default();
        self.sink.write_line(&metric_payload(
            "timer",
            &self.name,
            duration_ms,
            Some("ms"),
            &self.tags,
        ));
        self.sink.write_line(&span_payload(
            "end",
            &self.name,
            &self.trace_id,
            Some(duration_ms),
            &self.tags,
        ));
    }
}

impl Drop for JsonSpan {
    fn drop(&mut self) {
        self.finish();
    }
}

fn metric_payload(
    metric_type: &str,
    name: &str,
    value: u64,
    unit: Option<&str>,
    tags: &TelemetryTags,
) -> String {
    let mut payload = Map::new();
    payload.insert("type".to_owned(), Value::from("metric"));
    payload.insert("timestampMs".to_owned(), Value::from(now_epoch_ms()));
    payload.insert("metricType".to_owned(), Value::from(metric_type));
    payload.insert("name".to_owned(), Value::from(name));
    payload.insert("value".to_owned(), Value::from(value));
    if let Some(unit) = unit {
        payload.insert("unit".to_owned(), Value::from(unit));
    }
    if !tags.is_empty() {
        payload.insert("tags".to_owned(), tags_to_json(tags));
    }
    to_line(payload)
}

fn span_payload(
    event: &str,
    name: &str,
    trace_id: &str,
    duration_ms: Option<u64>,
    tags: &TelemetryTags,
) -> String {
    let mut payload = Map::new();
    payload.insert("type".to_owned(), Value::from("span"));
    payload.insert("timestampMs".to_owned(), Value::from(now_epoch_ms()));
    payload.insert("event".to_owned(), Value::from(event));
    payload.insert("name".to_owned(), Value::from(name));
    payload.insert("traceId".to_owned(), Value::from(trace_id));
    if let Some(duration_ms) = duration_ms {
        payload.insert("durationMs".to_owned(), Value::from(duration_ms));
    }
    if !tags.is_empty() {
        payload.insert("tags".to_owned(), tags_to_json(tags));
    }
    to_line(payload)
}

fn to_line(payload: Map<String, Value>) -> String {
    serde_json::to_string(&Value::Object(payload)).map_or_else(
        |_| SERIALIZE_FAILED_LINE.to_owned(),
        |mut encoded| {
            encoded.push('\n');
            encoded
        },
    )
}

fn merge_tags(base: &TelemetryTags, extra: Option<&TelemetryTags>) -> TelemetryTags {
    let mut merged = base.clone();
    if let Some(extra) = extra {
        merged.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    for (key, value) in &mut merged {
        if is_secret_key(key) {
            *value = Box::from(REDACTED);
        }
    }
    merged
}

fn tags_to_json(tags: &TelemetryTags) -> Value {
    tags.iter()
        .map(|(key, value)| (key.to_string(), Value::from(value.as_ref())))
        .collect::<Map<_, _>>()
        .into()
}
