//! Logger and telemetry selection from the environment.

use bundle_sync_adapters::{DiscardLogSink, JsonLogger, JsonTelemetry, LogSink, StderrLogSink};
use bundle_sync_ports::{LogFields, LogLevel, LoggerPort, TelemetryPort, TelemetryTags};
use bundle_sync_shared::RequestContext;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `json` enables the JSON logger.
pub const ENV_LOG_FORMAT: &str = "BUNDLE_SYNC_LOG_FORMAT";
/// Minimum JSON log level (`debug`, `info`, `warn`, `error`).
pub const ENV_LOG_LEVEL: &str = "BUNDLE_SYNC_LOG_LEVEL";
/// `json` enables span and counter lines; defaults to the log format.
pub const ENV_TELEMETRY_FORMAT: &str = "BUNDLE_SYNC_TELEMETRY_FORMAT";

/// Which JSON outputs are enabled and where they go.
#[derive(Clone)]
pub struct ObservabilitySettings {
    log_level: Option<LogLevel>,
    telemetry: bool,
    sink: Arc<dyn LogSink>,
}

impl ObservabilitySettings {
    /// No log or span output.
    pub fn disabled() -> Self {
        Self {
            log_level: None,
            telemetry: false,
            sink: Arc::new(StderrLogSink),
        }
    }

    /// Select outputs from an env map; lines go to stderr.
    pub fn from_env_map(env: &BTreeMap<String, String>) -> Self {
        let log_enabled = is_json(env.get(ENV_LOG_FORMAT));
        let telemetry = env
            .get(ENV_TELEMETRY_FORMAT)
            .map_or(log_enabled, |value| is_json(Some(value)));
        Self {
            log_level: log_enabled.then(|| parse_log_level(env.get(ENV_LOG_LEVEL))),
            telemetry,
            sink: Arc::new(StderrLogSink),
        }
    }

    /// Enable both outputs at `level`, writing to `sink`.
    pub fn json(sink: Arc<dyn LogSink>, level: LogLevel) -> Self {
        Self {
            log_level: Some(level),
            telemetry: true,
            sink,
        }
    }

    /// True when the JSON logger is enabled.
    pub const fn logs_enabled(&self) -> bool {
        self.log_level.is_some()
    }

    /// True when span and counter output is enabled.
    pub const fn telemetry_enabled(&self) -> bool {
        self.telemetry
    }

    /// Build request-scoped outputs tagged with the correlation id of `ctx`.
    pub fn build(&self, ctx: &RequestContext) -> Observability {
        let correlation_id = ctx.correlation_id().as_str().to_owned();

        let logger = self.log_level.map(|level| {
            let mut fields = LogFields::new();
            fields.insert("correlationId".into(), Value::String(correlation_id.clone()));
            let logger: Arc<dyn LoggerPort> = Arc::new(
                JsonLogger::new(Arc::clone(&self.sink))
                    .with_min_level(level)
                    .with_base_fields(fields),
            );
            logger
        });

        let tags: TelemetryTags =
            BTreeMap::from([("correlationId".into(), correlation_id.into())]);
        let telemetry = self.telemetry.then(|| {
            let telemetry: Arc<dyn TelemetryPort> =
                Arc::new(JsonTelemetry::new(Arc::clone(&self.sink)).with_base_tags(tags.clone()));
            telemetry
        });
        let transport_telemetry = telemetry.clone().unwrap_or_else(|| {
            Arc::new(JsonTelemetry::new(Arc::new(DiscardLogSink)).with_base_tags(tags))
        });

        Observability {
            logger,
            telemetry,
            transport_telemetry,
        }
    }
}

/// Logger and telemetry handed to the use cases.
///
/// The transport always gets telemetry so request ids can be minted from
/// span trace ids; when span output is disabled those spans are discarded.
#[derive(Clone)]
pub struct Observability {
    /// Structured logger, when enabled.
    pub logger: Option<Arc<dyn LoggerPort>>,
    /// Span and counter output, when enabled.
    pub telemetry: Option<Arc<dyn TelemetryPort>>,
    /// Telemetry used by the HTTP transport.
    pub transport_telemetry: Arc<dyn TelemetryPort>,
}

fn is_json(value: Option<&String>) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case("json"))
}

fn parse_log_level(value: Option<&String>) -> LogLevel {
    match value.map(|value| value.to_ascii_lowercase()).as_deref() {
        Some("debug") => LogLevel::Debug,
        Some("warn") => LogLevel::Warn,
        Some("error") => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_sync_adapters::MemoryLogSink;

    #[test]
    fn disabled_without_format_vars() {
        let settings = ObservabilitySettings::from_env_map(&BTreeMap::new());
        assert!(!settings.logs_enabled());
        assert!(!settings.telemetry_enabled());

        let observability = settings.build(&RequestContext::new_request());
        assert!(observability.logger.is_none());
        assert!(observability.telemetry.is_none());
        let span = observability
            .transport_telemetry
            .start_span("http.do_call", None);
        assert_eq!(span.trace_id().len(), 32);
    }

    #[test]
    fn telemetry_follows_log_format_unless_overridden() {
        let env = BTreeMap::from([(ENV_LOG_FORMAT.to_owned(), "JSON".to_owned())]);
        let settings = ObservabilitySettings::from_env_map(&env);
        assert!(settings.logs_enabled());
        assert!(settings.telemetry_enabled());

        let env = BTreeMap::from([
            (ENV_LOG_FORMAT.to_owned(), "json".to_owned()),
            (ENV_TELEMETRY_FORMAT.to_owned(), "off".to_owned()),
        ]);
        let settings = ObservabilitySettings::from_env_map(&env);
        assert!(settings.logs_enabled());
        assert!(!settings.telemetry_enabled());
    }

    #[test]
    fn scoped_logger_carries_correlation_id() {
        let sink = Arc::new(MemoryLogSink::default());
        let settings = ObservabilitySettings::json(sink.clone(), LogLevel::Debug);
        let ctx = RequestContext::new_request();

        let observability = settings.build(&ctx);
        if let Some(logger) = &observability.logger {
            logger.info("bundle.created", "created remote bundle", None);
        }

        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(ctx.correlation_id().as_str()));
    }

    #[test]
    fn log_level_defaults_to_info() {
        assert_eq!(parse_log_level(None), LogLevel::Info);
        assert_eq!(parse_log_level(Some(&"DEBUG".to_owned())), LogLevel::Debug);
    }
}
