//! Error types for the Vanish client.

use reqwest::StatusCode;
use thiserror::Error;

/// Coarse classification of an [`Error`].
///
/// Every error belongs to exactly one kind, so callers can branch on it
/// without matching each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Failure on this side of the wire: request construction, body
    /// serialization, network, or decoding a success response.
    Local,
    /// The service answered with a status code of 400 or above.
    Api,
    /// The caller cancelled the operation.
    Cancelled,
}

/// Error type for all Vanish client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body could not be serialized to JSON.
    #[error("vanish: marshal body: {0}")]
    Marshal(#[source] serde_json::Error),

    /// The HTTP request could not be constructed (for example, a malformed base URL).
    #[error("vanish: create request: {0}")]
    Request(#[source] reqwest::Error),

    /// Network failure while sending the request or waiting for the response.
    #[error("vanish: send request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read.
    #[error("vanish: read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// A success response did not match the expected JSON shape.
    #[error("vanish: decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The underlying `reqwest` client could not be built.
    #[error("vanish: build http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Caller input rejected before any request was made.
    #[error("vanish: invalid argument: {0}")]
    InvalidArgument(String),

    /// The service returned a non-success status.
    ///
    /// `message` comes from the `{"error": "..."}` body, or is the standard
    /// reason phrase for `status` when that body is missing or malformed.
    #[error("vanish: {message} (status {})", .status.as_u16())]
    Api { message: String, status: StatusCode },

    /// The operation was cancelled by the caller.
    #[error("vanish: operation cancelled")]
    Cancelled,
}

impl Error {
    /// Classify this error as local, API, or cancellation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api { .. } => ErrorKind::Api,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Marshal(_)
            | Error::Request(_)
            | Error::Transport(_)
            | Error::Body(_)
            | Error::Decode(_)
            | Error::HttpClient(_)
            | Error::InvalidArgument(_) => ErrorKind::Local,
        }
    }

    /// HTTP status of an API error; `None` for every other kind.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Build an API error from a status and an optional decoded message.
    pub(crate) fn api(status: StatusCode, message: Option<String>) -> Self {
        let message = message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
        Error::Api { message, status }
    }
}
