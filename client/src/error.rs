//! Error type surfaced by the data-access layer

use serde::Deserialize;
use thiserror::Error;

/// A failed request.
///
/// `status` is the HTTP status for non-2xx responses and `None` for network
/// failures and undecodable bodies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchError {
    /// HTTP status code, if a response was received
    pub status: Option<u16>,
    /// Human readable message, from the server when it sent one
    pub message: String,
}

impl FetchError {
    /// The request never produced a response.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// The server answered with a non-2xx status.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A body could not be encoded or decoded.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: format!("invalid body: {}", message.into()),
        }
    }

    /// Whether the server answered with `status`.
    #[must_use]
    pub fn has_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }
}

/// Error body sent by the API server: `{code, message}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) message: String,
}
