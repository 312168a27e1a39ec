//! HTTP implementation of the remote bundle store contract.

use crate::http_transport::{HttpMethod, HttpTransport};
use bundle_sync_ports::{
    BoxFuture, BundleApiPort, CreateBundleRequest, ExtendBundleRequest, FileMap, FilterLists,
    RemoteBundleState,
};
use bundle_sync_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Errors decoding or encoding bundle API payloads.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The response body was not the expected JSON shape.
    #[error("invalid {operation} response: {source}")]
    InvalidResponse {
        /// API operation that produced the body.
        operation: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The request body could not be serialized.
    #[error("failed to encode {operation} request: {source}")]
    EncodeRequest {
        /// API operation being encoded.
        operation: &'static str,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl BundleError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidResponse { .. } => ErrorCode::new("bundle", "invalid_response"),
            Self::EncodeRequest { .. } => ErrorCode::new("bundle", "encode_request"),
        }
    }

    const fn operation(&self) -> &'static str {
        match self {
            Self::InvalidResponse { operation, .. } | Self::EncodeRequest { operation, .. } => {
                operation
            },
        }
    }
}

impl From<BundleError> for ErrorEnvelope {
    fn from(error: BundleError) -> Self {
        let operation = error.operation();
        Self::unexpected(error.error_code(), error.to_string(), ErrorClass::NonRetriable)
            .with_metadata("operation", operation)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FiltersResponse {
    extensions: Vec<String>,
    config_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleResponse {
    bundle_hash: String,
    #[serde(default)]
    missing_files: Option<Vec<String>>,
}

impl From<BundleResponse> for RemoteBundleState {
    fn from(response: BundleResponse) -> Self {
        Self {
            bundle_hash: response.bundle_hash,
            missing_files: response.missing_files.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtendBundleBody<'a> {
    files: &'a FileMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed_files: Option<&'a [String]>,
}

impl<'a> ExtendBundleBody<'a> {
    fn new(request: &'a ExtendBundleRequest) -> Self {
        Self {
            files: &request.files,
            removed_files: Some(request.removed_files.as_slice())
                .filter(|removed| !removed.is_empty()),
        }
    }
}

/// Bundle API client speaking JSON over the retrying transport.
#[derive(Clone)]
pub struct HttpBundleApi {
    transport: Arc<HttpTransport>,
}

impl HttpBundleApi {
    /// Wrap a transport.
    #[must_use]
    pub const fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        span_name: &'static str,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T> {
        let span = self.transport.telemetry().start_span(span_name, None);
        let result = self
            .transport
            .do_call(ctx, span.as_ref(), method, path, body.as_deref())
            .await;
        span.finish();
        let payload = result?;
        serde_json::from_slice(&payload).map_err(|source| {
            ErrorEnvelope::from(BundleError::InvalidResponse {
                operation: span_name,
                source,
            })
        })
    }
}

fn encode<T: Serialize + ?Sized>(operation: &'static str, body: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(body)
        .map_err(|source| ErrorEnvelope::from(BundleError::EncodeRequest { operation, source }))
}

impl BundleApiPort for HttpBundleApi {
    fn get_filters(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<FilterLists>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let response: FiltersResponse = self
                .call(&ctx, "bundle.get_filters", HttpMethod::Get, "/filters", None)
                .await?;
            Ok(FilterLists {
                extensions: response.extensions,
                config_files: response.config_files,
            })
        })
    }

    fn create_bundle(
        &self,
        ctx: &RequestContext,
        request: CreateBundleRequest,
    ) -> BoxFuture<'_, Result<RemoteBundleState>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let body = encode("bundle.create_bundle", &request.files)?;
            let response: BundleResponse = self
                .call(
                    &ctx,
                    "bundle.create_bundle",
                    HttpMethod::Post,
                    "/bundle",
                    Some(body),
                )
                .await?;
            Ok(response.into())
        })
    }

    fn extend_bundle(
        &self,
        ctx: &RequestContext,
        request: ExtendBundleRequest,
    ) -> BoxFuture<'_, Result<RemoteBundleState>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let body = encode("bundle.extend_bundle", &ExtendBundleBody::new(&request))?;
            let path = format!("/bundle/{}", request.bundle_hash);
            let response: BundleResponse = self
                .call(
                    &ctx,
                    "bundle.extend_bundle",
                    HttpMethod::Put,
                    &path,
                    Some(body),
                )
                .await?;
            Ok(response.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_sync_ports::BundleFile;

    #[test]
    fn missing_files_default_to_empty() -> std::result::Result<(), serde_json::Error> {
        let response: BundleResponse = serde_json::from_str(r#"{ "bundleHash": "abc" }"#)?;
        let state = RemoteBundleState::from(response);
        assert_eq!(state.bundle_hash, "abc");
        assert!(state.missing_files.is_empty());

        let response: BundleResponse =
            serde_json::from_str(r#"{ "bundleHash": "abc", "missingFiles": null }"#)?;
        assert!(RemoteBundleState::from(response).missing_files.is_empty());
        Ok(())
    }

    #[test]
    fn extend_body_omits_empty_removed_files() -> std::result::Result<(), serde_json::Error> {
        let mut request = ExtendBundleRequest {
            bundle_hash: "abc".to_owned(),
            files: [("a.java".to_owned(), BundleFile::from_raw(b"x"))].into(),
            removed_files: Vec::new(),
        };
        let body = serde_json::to_value(ExtendBundleBody::new(&request))?;
        assert!(body.get("removedFiles").is_none());
        assert!(body["files"]["a.java"]["hash"].is_string());

        request.removed_files.push("gone.java".to_owned());
        let body = serde_json::to_value(ExtendBundleBody::new(&request))?;
        assert_eq!(body["removedFiles"], serde_json::json!(["gone.java"]));
        Ok(())
    }

    #[test]
    fn invalid_response_maps_to_bundle_code() {
        let source = serde_json::from_str::<BundleResponse>("not json").err();
        let envelope = source.map(|source| {
            ErrorEnvelope::from(BundleError::InvalidResponse {
                operation: "bundle.create_bundle",
                source,
            })
        });
        assert_eq!(
            envelope.as_ref().map(|error| error.code.clone()),
            Some(ErrorCode::new("bundle", "invalid_response"))
        );
        assert_eq!(
            envelope
                .as_ref()
                .and_then(|error| error.metadata.get("operation").cloned())
                .as_deref(),
            Some("bundle.create_bundle")
        );
    }
}
