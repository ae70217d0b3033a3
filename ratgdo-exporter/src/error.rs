//! Error types for the scrape pipeline.

use thiserror::Error;

/// The upstream GET failed before an HTTP status code was obtained.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, DNS, TLS or timeout failure while sending the request.
    #[error("Request to {address} failed: {source}")]
    Request {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response head arrived but the body could not be read.
    #[error("Failed to read response body from {address}: {source}")]
    Body {
        address: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Whether the failure was caused by the client timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Client(_) => false,
            FetchError::Request { source, .. } | FetchError::Body { source, .. } => {
                source.is_timeout()
            }
        }
    }
}

/// The response body did not decode into a status snapshot.
#[derive(Debug, Error)]
#[error("Failed to decode status JSON: {0}")]
pub struct DecodeError(#[from] serde_json::Error);
