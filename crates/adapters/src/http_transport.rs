//! Retrying HTTP transport shared by every bundle API call.

use bundle_sync_config::{ValidatedClientConfig, resolve_code_api_url};
use bundle_sync_ports::{
    ErrorReportOptions, ErrorReporterPort, TelemetryPort, TelemetrySpan,
};
use bundle_sync_shared::{
    AttemptOutcome, ErrorClass, ErrorCode, ErrorEnvelope, FixedIntervalRetry, RequestContext,
    Result, retry_fixed_interval,
};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Method, StatusCode};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "snyk-request-id";
/// Header carrying the configured organization.
pub const ORG_NAME_HEADER: &str = "snyk-org-name";
/// Value of the cache-suppression header sent with every request.
pub const CACHE_CONTROL_VALUE: &str = "private, max-age=0, no-cache";

const TRANSIENT_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// HTTP verbs used by the bundle API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`, sent with a JSON content type and no body.
    Get,
    /// `POST`, gzip-encoded body.
    Post,
    /// `PUT`, gzip-encoded body.
    Put,
}

impl HttpMethod {
    /// Upper-case verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    /// Whether request bodies for this verb are gzip-encoded.
    #[must_use]
    pub const fn is_encoded(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    const fn to_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
        }
    }
}

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportSettings {
    /// Resolved code API base URL, without trailing slash.
    pub base_url: String,
    /// Organization sent as a header when set.
    pub organization: Option<String>,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Retry policy for transient statuses.
    pub retry: FixedIntervalRetry,
}

impl HttpTransportSettings {
    /// Derive settings from a validated client config, resolving the FedRAMP URL.
    pub fn from_config(config: &ValidatedClientConfig) -> Result<Self> {
        Ok(Self {
            base_url: resolve_code_api_url(&config.api)?,
            organization: config.api.organization.clone(),
            timeout: config.request_timeout(),
            retry: config.retry_policy(),
        })
    }
}

/// HTTP client that retries transient server errors at a fixed interval.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Box<str>,
    retry: FixedIntervalRetry,
    telemetry: Arc<dyn TelemetryPort>,
    error_reporter: Arc<dyn ErrorReporterPort>,
}

impl HttpTransport {
    /// Build a transport. Headers common to every request are installed as client defaults.
    pub fn new(
        settings: &HttpTransportSettings,
        telemetry: Arc<dyn TelemetryPort>,
        error_reporter: Arc<dyn ErrorReporterPort>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
        if let Some(organization) = settings.organization.as_deref() {
            let value = HeaderValue::from_str(organization).map_err(|_| {
                ErrorEnvelope::expected(
                    ErrorCode::invalid_input(),
                    "organization contains invalid header characters",
                )
            })?;
            headers.insert(HeaderName::from_static(ORG_NAME_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("http", "client_init_failed"),
                    format!("failed to build HTTP client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').into(),
            retry: settings.retry,
            telemetry,
            error_reporter,
        })
    }

    /// Telemetry used for spans started around API calls.
    #[must_use]
    pub fn telemetry(&self) -> &dyn TelemetryPort {
        self.telemetry.as_ref()
    }

    /// Issue `method path` and return the 2xx response body.
    ///
    /// Every attempt is stamped with the trace id of `span` as request id.
    /// Transport failures are reported and returned without retrying.
    pub async fn do_call(
        &self,
        ctx: &RequestContext,
        span: &dyn TelemetrySpan,
        method: HttpMethod,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<Bytes> {
        let call_span = self.telemetry.start_span("http.do_call", None);
        let result = self.send_with_retry(ctx, span.trace_id(), method, path, body).await;
        call_span.finish();
        result
    }

    async fn send_with_retry(
        &self,
        ctx: &RequestContext,
        request_id: &str,
        method: HttpMethod,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<Bytes> {
        let url = format!("{}{path}", self.base_url);
        let payload = match body {
            Some(raw) if method.is_encoded() => Some(gzip(raw)?),
            Some(raw) => Some(Bytes::copy_from_slice(raw)),
            None => None,
        };

        let response = retry_fixed_interval(
            ctx,
            self.retry,
            "http.do_call",
            |attempt| {
                let request = self.build_request(method, &url, request_id, payload.clone());
                async move {
                    tracing::debug!(attempt, method = method.as_str(), path, "sending request");
                    let response = request
                        .send()
                        .await
                        .map_err(|error| self.transport_failure(&error, method, path))?;
                    if TRANSIENT_STATUSES.contains(&response.status()) {
                        Ok(AttemptOutcome::Retry(response))
                    } else {
                        Ok(AttemptOutcome::Done(response))
                    }
                }
            },
            |attempt, response: &reqwest::Response| {
                tracing::debug!(
                    attempt,
                    status = response.status().as_u16(),
                    method = method.as_str(),
                    path,
                    "transient status; retrying"
                );
            },
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, method, path));
        }
        response
            .bytes()
            .await
            .map_err(|error| self.transport_failure(&error, method, path))
    }

    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        request_id: &str,
        payload: Option<Bytes>,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method.to_reqwest(), url)
            .header(REQUEST_ID_HEADER, request_id);
        request = if method.is_encoded() {
            request
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_ENCODING, "gzip")
        } else {
            request.header(CONTENT_TYPE, "application/json")
        };
        if let Some(payload) = payload {
            request = request.body(payload);
        }
        request
    }

    fn transport_failure(
        &self,
        error: &reqwest::Error,
        method: HttpMethod,
        path: &str,
    ) -> ErrorEnvelope {
        let envelope = map_reqwest_error(error)
            .with_metadata("method", method.as_str())
            .with_metadata("path", path);
        self.error_reporter
            .capture_error(&envelope, &ErrorReportOptions::for_path(path));
        envelope
    }
}

fn gzip(raw: &[u8]) -> Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw)?;
    Ok(Bytes::from(encoder.finish()?))
}

fn status_error(status: StatusCode, method: HttpMethod, path: &str) -> ErrorEnvelope {
    let class = if TRANSIENT_STATUSES.contains(&status) {
        ErrorClass::Retriable
    } else {
        ErrorClass::NonRetriable
    };
    ErrorEnvelope::unexpected(
        ErrorCode::new("http", "unexpected_status"),
        format!("{} {path} returned {status}", method.as_str()),
        class,
    )
    .with_metadata("status", status.as_u16().to_string())
    .with_metadata("method", method.as_str())
    .with_metadata("path", path)
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "HTTP request timed out",
            ErrorClass::Retriable,
        );
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("HTTP connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::new("http", "request_failed"),
        format!("HTTP request failed: {error}"),
        ErrorClass::NonRetriable,
    )
}
