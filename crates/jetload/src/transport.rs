//! HTTP transport used by the importer.
//!
//! The importer only needs `GET` with a status code and a text body. The
//! [`Transport`] trait keeps that seam narrow so tests can swap in doubles;
//! [`HttpTransport`] is the reqwest-backed implementation. Nothing here
//! retries: a failed request surfaces to the caller as-is.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{LoaderError, Result};

/// Response from a GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Requested URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl TransportResponse {
    /// Only `200` counts as success.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Turn a non-200 response into [`LoaderError::HttpStatus`].
    pub fn into_body(self) -> Result<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(LoaderError::HttpStatus {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Performs HTTP GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`. Only connection-level failures are errors; a non-200
    /// status is still a response.
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("jetload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoaderError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let transport_err = |e: reqwest::Error| LoaderError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.client.get(url).send().await.map_err(transport_err)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport_err)?;

        tracing::debug!(url, status, bytes = body.len(), "GET");

        Ok(TransportResponse {
            url: url.to_string(),
            status,
            body,
        })
    }
}
