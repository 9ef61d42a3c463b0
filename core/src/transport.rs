//! Single request/response execution against the platform.
//!
//! # Design
//! `Transport` is the I/O seam: it turns an `HttpRequest` into an
//! `HttpResponse` and reports only failures that happen before a response
//! exists. Everything after that point (status interpretation, envelope
//! decoding) is pure and lives in [`decode`], so adapters and tests share
//! one set of rules no matter which transport executed the call.
//!
//! Responses are read in full inside `send`, so the connection is released
//! before any decoding starts, whichever way decoding ends.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Per-call timeout used by app and file adapters.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes one HTTP round trip.
///
/// Implementations must return non-2xx responses as `Ok`, and must fail
/// with `ApiError::SendFailure` when `ctx` is already cancelled.
pub trait Transport: Send + Sync {
    fn send(&self, ctx: &CancellationToken, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn send(&self, ctx: &CancellationToken, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        if ctx.is_cancelled() {
            return Err(ApiError::cancelled());
        }

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(request.body.as_deref().unwrap_or_default())
            }
        };
        let mut response = result.map_err(map_ureq_error)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response.body_mut().read_to_vec().map_err(ApiError::send)?;

        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = status.as_u16(),
            "request completed"
        );

        // A response that lands after cancellation is dropped, not processed.
        if ctx.is_cancelled() {
            return Err(ApiError::cancelled());
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn map_ureq_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::BadUri(uri) => ApiError::RequestConstruction(format!("bad uri: {uri}")),
        ureq::Error::Http(e) => ApiError::RequestConstruction(e.to_string()),
        other => ApiError::send(other),
    }
}

/// The `{success, error}` pair every platform response carries.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Common {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

/// Interpret a platform response: status check, envelope check, then the
/// body fields as `B`.
///
/// Non-2xx responses become `UnexpectedStatus`, carrying the envelope's
/// error message when the body is one, and the raw body otherwise. A 2xx
/// envelope with `success: false` becomes `NotSuccessful` whatever else it
/// holds; the body is only decoded once the envelope reports success.
pub fn decode<B: DeserializeOwned>(response: &HttpResponse) -> Result<B, ApiError> {
    if !response.is_success() {
        let message = match serde_json::from_slice::<Common>(&response.body) {
            Ok(common) => common.error,
            Err(_) => response.body_text(),
        };
        return Err(ApiError::UnexpectedStatus {
            status: response.status_text(),
            message,
        });
    }
    let common: Common = serde_json::from_slice(&response.body).map_err(ApiError::DecodeFailure)?;
    if !common.success {
        return Err(ApiError::NotSuccessful(common.error));
    }
    serde_json::from_slice(&response.body).map_err(ApiError::DecodeFailure)
}

/// Send `request` and decode the response body into `B`.
pub fn execute<B: DeserializeOwned>(
    transport: &dyn Transport,
    ctx: &CancellationToken,
    request: &HttpRequest,
) -> Result<B, ApiError> {
    let response = transport.send(ctx, request)?;
    decode(&response)
}

/// Serialize an outgoing JSON body.
pub(crate) fn encode<B: serde::Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(ApiError::EncodeFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, reason: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            reason: reason.to_string(),
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[derive(Debug, Deserialize)]
    struct Link {
        link: String,
    }

    #[test]
    fn decode_success_body() {
        let resp = response(200, "OK", r#"{"success":true,"error":"","link":"http://x/y"}"#);
        let body: Link = decode(&resp).unwrap();
        assert_eq!(body.link, "http://x/y");
    }

    #[test]
    fn decode_not_successful_envelope() {
        let resp = response(200, "OK", r#"{"success":false,"error":"no access","link":""}"#);
        let err = decode::<Link>(&resp).unwrap_err();
        assert!(matches!(err, ApiError::NotSuccessful(ref m) if m == "no access"));
    }

    #[test]
    fn rejection_without_body_fields_is_not_successful() {
        let resp = response(200, "OK", r#"{"success":false,"error":"quota exceeded"}"#);
        let err = decode::<Link>(&resp).unwrap_err();
        assert!(matches!(err, ApiError::NotSuccessful(ref m) if m == "quota exceeded"));
    }

    #[test]
    fn success_without_body_fields_is_decode_failure() {
        let resp = response(200, "OK", r#"{"success":true,"error":""}"#);
        let err = decode::<Link>(&resp).unwrap_err();
        assert!(matches!(err, ApiError::DecodeFailure(_)));
    }

    #[test]
    fn decode_error_status_with_envelope() {
        let resp = response(403, "Forbidden", r#"{"success":false,"error":"token expired"}"#);
        let err = decode::<Link>(&resp).unwrap_err();
        match err {
            ApiError::UnexpectedStatus { status, message } => {
                assert_eq!(status, "403 Forbidden");
                assert_eq!(message, "token expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_error_status_with_raw_body() {
        let resp = response(502, "Bad Gateway", "upstream down");
        let err = decode::<Link>(&resp).unwrap_err();
        assert!(matches!(
            err,
            ApiError::UnexpectedStatus { ref message, .. } if message == "upstream down"
        ));
    }

    #[test]
    fn decode_malformed_success_body() {
        let resp = response(200, "OK", "not json");
        let err = decode::<Link>(&resp).unwrap_err();
        assert!(matches!(err, ApiError::DecodeFailure(_)));
    }

    #[test]
    fn ureq_transport_refuses_cancelled_context() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let req = HttpRequest::get("http://127.0.0.1:9/never".to_string(), Vec::new());
        let err = UreqTransport::default().send(&ctx, &req).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn ureq_transport_reports_bad_url() {
        let ctx = CancellationToken::new();
        let req = HttpRequest::get("not a url".to_string(), Vec::new());
        let err = UreqTransport::default().send(&ctx, &req).unwrap_err();
        assert!(matches!(
            err,
            ApiError::RequestConstruction(_) | ApiError::SendFailure(_)
        ));
    }
}
