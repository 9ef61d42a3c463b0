//! Error types for the platform gateway.
//!
//! # Design
//! Each variant names the stage of a call that failed: building the request,
//! moving it over the wire, interpreting the HTTP status, decoding the body,
//! or the platform refusing the operation in an otherwise valid response.
//! Callers can tell "the platform said no" (`NotSuccessful`) apart from "we
//! never got a usable answer" (everything else). Nothing is retried here.

use thiserror::Error;

/// Boxed cause carried by transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by every network-facing operation of the gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The outgoing request body could not be serialized.
    #[error("failed encoding request body: {0}")]
    EncodeFailure(#[source] serde_json::Error),

    /// The request could not be assembled (bad URL, bad header value).
    #[error("failed creating request: {0}")]
    RequestConstruction(String),

    /// The request never produced a response: connection, timeout or
    /// cancellation of the calling context.
    #[error("failed sending request: {0}")]
    SendFailure(#[source] BoxError),

    /// The platform answered with a non-2xx status. `message` is the error
    /// reported in the response envelope, or the raw body if there was none.
    #[error("response status is not ok: {status}: {message}")]
    UnexpectedStatus { status: String, message: String },

    /// A 2xx response body did not match the expected shape.
    #[error("failed decoding response body: {0}")]
    DecodeFailure(#[source] serde_json::Error),

    /// A well-formed response reported `success: false`.
    #[error("response is not success: {0}")]
    NotSuccessful(String),

    /// A record identifier is not a 36-character UUID string.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// An upload was attempted with an empty buffer.
    #[error("upload buffer is empty")]
    EmptyUpload,
}

/// Cause attached to `SendFailure` when the calling context was cancelled.
#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

impl ApiError {
    pub fn send(cause: impl Into<BoxError>) -> Self {
        ApiError::SendFailure(cause.into())
    }

    pub fn cancelled() -> Self {
        ApiError::SendFailure(Box::new(Cancelled))
    }

    /// True when this is a `SendFailure` caused by context cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ApiError::SendFailure(cause) => cause.is::<Cancelled>(),
            _ => false,
        }
    }
}

/// Length of the textual UUID form the platform uses for record ids.
pub const ID_LEN: usize = 36;

/// Reject identifiers that cannot be platform record ids before any request
/// is built.
pub fn check_id(id: &str) -> Result<(), ApiError> {
    if id.len() != ID_LEN {
        return Err(ApiError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}
