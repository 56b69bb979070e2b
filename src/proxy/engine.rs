//! The forwarding engine.
//!
//! # Responsibilities
//! - Build the outbound request (URL, filtered headers, untouched body)
//! - Execute the send with bounded retry over transport failures
//! - Stream the upstream response back without buffering
//! - Trigger the audit sink exactly once per exchange
//!
//! # Design Decisions
//! - A single shared `reqwest::Client` pools upstream connections; the pool
//!   is safe for concurrent borrowing and one slow exchange cannot stall
//!   another
//! - Dropping the response body stream (normal completion, consumer
//!   disconnect, mid-stream error) releases the upstream connection
//! - The audit write is spawned, never awaited by the response path

use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, HeaderValue, Request, Response, Uri};
use futures_util::TryStreamExt;
use serde_json::Value;
use thiserror::Error;

use crate::audit::{AuditRecord, AuditSink};
use crate::config::GatewayConfig;
use crate::proxy::prompt::extract_system_prompt;
use crate::proxy::retry::{retry_transport, Attempt};

/// Audit status recorded when no upstream response was obtained.
const AUDIT_FAILURE_STATUS: u16 = 500;

/// Terminal failures of an exchange, as seen by the HTTP layer.
///
/// Raw transport errors never leave the engine; callers see either a
/// streamed response or one of these.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The outbound HTTP client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    /// The inbound request body could not be read.
    #[error("failed to read inbound request body: {0}")]
    InboundBody(#[source] axum::Error),

    /// Every send attempt failed at the transport level.
    #[error("upstream unreachable after {attempts} attempt(s): {source}")]
    Unreachable {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

/// Forwards inbound requests to the configured upstream.
pub struct ForwardingEngine {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_attempts: u32,
    audit: AuditSink,
}

impl ForwardingEngine {
    /// Create an engine from validated configuration.
    pub fn new(config: &GatewayConfig, audit: AuditSink) -> Result<Self, GatewayError> {
        let timeout = Duration::from_secs(config.upstream.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;

        Ok(Self {
            client,
            base_url: config.upstream.base_url.trim_end_matches('/').to_string(),
            api_key: config.upstream.api_key.clone(),
            max_attempts: config.retries.max_attempts,
            audit,
        })
    }

    /// Forward one exchange to the upstream and stream the response back.
    ///
    /// Exactly one audit record is written per call, on the success path as
    /// soon as response headers arrive and on the failure path once the
    /// outcome is terminal.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();

        let method = parts.method.clone();
        let inbound_url = inbound_url(&parts.headers, &parts.uri);
        let outbound_url = upstream_url(&self.base_url, &parts.uri);
        let headers = prepare_forward_headers(&parts.headers, self.api_key.as_deref());

        tracing::debug!(method = %method, url = %outbound_url, "Proxying request");

        let body_bytes = match to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = GatewayError::InboundBody(e);
                self.audit.record(AuditRecord {
                    method: method.to_string(),
                    url: inbound_url,
                    request_body: String::new(),
                    system_prompt: None,
                    response_status: AUDIT_FAILURE_STATUS,
                    duration_secs: start.elapsed().as_secs_f64(),
                    error_message: Some(error.to_string()),
                });
                return Err(error);
            }
        };

        // Best-effort parse purely for the audit trail. The bytes sent
        // upstream stay untouched either way.
        let system_prompt = serde_json::from_slice::<Value>(&body_bytes)
            .ok()
            .and_then(|json| extract_system_prompt(&json));
        let request_body = String::from_utf8_lossy(&body_bytes).into_owned();

        let result = retry_transport(self.max_attempts, is_transport_failure, || {
            // A fresh outbound request per attempt.
            let send = self
                .client
                .request(method.clone(), outbound_url.clone())
                .headers(headers.clone())
                .body(body_bytes.clone())
                .send();
            async move {
                match send.await {
                    Ok(response) => Attempt::Succeeded(response),
                    Err(e) => Attempt::TransportFailure(e),
                }
            }
        })
        .await;

        match result {
            Ok(upstream) => {
                let status = upstream.status();
                tracing::debug!(method = %method, status = %status, "Upstream responded");

                self.audit.record(AuditRecord {
                    method: method.to_string(),
                    url: inbound_url,
                    request_body,
                    system_prompt,
                    response_status: status.as_u16(),
                    duration_secs: start.elapsed().as_secs_f64(),
                    error_message: None,
                });

                let response_headers = filter_response_headers(upstream.headers());
                let stream = upstream
                    .bytes_stream()
                    .map_err(std::io::Error::other);

                let mut response = Response::new(Body::from_stream(stream));
                *response.status_mut() = status;
                *response.headers_mut() = response_headers;
                Ok(response)
            }
            Err(cause) => {
                tracing::error!(
                    method = %method,
                    url = %outbound_url,
                    attempts = self.max_attempts,
                    error = %cause,
                    "Upstream unreachable"
                );

                self.audit.record(AuditRecord {
                    method: method.to_string(),
                    url: inbound_url,
                    request_body,
                    system_prompt,
                    response_status: AUDIT_FAILURE_STATUS,
                    duration_secs: start.elapsed().as_secs_f64(),
                    error_message: Some(cause.to_string()),
                });

                Err(GatewayError::Unreachable {
                    attempts: self.max_attempts,
                    source: cause,
                })
            }
        }
    }
}

/// Only connection-establishment and timeout failures are worth another
/// attempt. A received response, however it is coded, is final.
fn is_transport_failure(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// Resolve the outbound URL: upstream base + inbound path, query appended
/// verbatim when present.
fn upstream_url(base_url: &str, uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}{}?{}", base_url, uri.path(), query),
        None => format!("{}{}", base_url, uri.path()),
    }
}

/// Reconstruct the inbound URL for the audit trail.
fn inbound_url(headers: &HeaderMap, uri: &Uri) -> String {
    match headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, uri),
        None => uri.to_string(),
    }
}

/// Copy inbound headers for forwarding. `host` and `content-length` are
/// transport-specific and regenerated by the client; the upstream credential,
/// when configured, takes precedence over anything the caller supplied.
fn prepare_forward_headers(inbound: &HeaderMap, api_key: Option<&str>) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    if let Some(key) = api_key {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
            headers.insert(header::AUTHORIZATION, value);
        }
    }
    headers
}

/// Strip hop-by-hop headers from the upstream response; everything else
/// passes through unchanged.
fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in [
        header::CONTENT_ENCODING,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
        header::CONNECTION,
    ] {
        headers.remove(&name);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_url_appends_path_and_query() {
        let uri: Uri = "/v1/chat/completions?stream=true".parse().unwrap();
        assert_eq!(
            upstream_url("https://api.example.com", &uri),
            "https://api.example.com/v1/chat/completions?stream=true"
        );

        let bare: Uri = "/health/upstream".parse().unwrap();
        assert_eq!(
            upstream_url("http://127.0.0.1:9000", &bare),
            "http://127.0.0.1:9000/health/upstream"
        );
    }

    #[test]
    fn forward_headers_drop_host_and_content_length() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, "proxy.local".parse().unwrap());
        inbound.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        inbound.insert("x-custom", "kept".parse().unwrap());

        let headers = prepare_forward_headers(&inbound, None);
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(headers.get("x-custom").unwrap(), "kept");
    }

    #[test]
    fn configured_key_overrides_caller_authorization() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, "Bearer caller-key".parse().unwrap());

        let headers = prepare_forward_headers(&inbound, Some("upstream-key"));
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer upstream-key"
        );

        // Without a configured key the caller's credential passes through.
        let headers = prepare_forward_headers(&inbound, None);
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer caller-key"
        );
    }

    #[test]
    fn response_filter_strips_hop_by_hop_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_ENCODING, "gzip".parse().unwrap());
        upstream.insert(header::CONTENT_LENGTH, "100".parse().unwrap());
        upstream.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        upstream.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        upstream.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        upstream.insert("x-ratelimit-remaining", "99".parse().unwrap());

        let headers = filter_response_headers(&upstream);
        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "99");
    }

    #[test]
    fn inbound_url_prefers_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "proxy.local:8080".parse().unwrap());
        let uri: Uri = "/v1/models?limit=5".parse().unwrap();
        assert_eq!(
            inbound_url(&headers, &uri),
            "http://proxy.local:8080/v1/models?limit=5"
        );
        assert_eq!(inbound_url(&HeaderMap::new(), &uri), "/v1/models?limit=5");
    }
}
