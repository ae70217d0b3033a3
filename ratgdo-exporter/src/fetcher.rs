//! HTTP client for the ratgdo status endpoint.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;

use crate::error::FetchError;

/// Raw upstream response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code, uninterpreted.
    pub status: u16,
    /// Full response body.
    pub body: Bytes,
}

/// Issues one GET per call against a fixed address.
///
/// No retries and no status interpretation; any status code is a success.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    address: String,
}

impl Fetcher {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            address: address.into(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn fetch(&self) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(&self.address)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                address: self.address.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|source| FetchError::Body {
            address: self.address.clone(),
            source,
        })?;

        Ok(FetchResponse { status, body })
    }
}
