use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::trace;

use super::TileTransport;
use crate::error::FetchError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent sent with every request.
///
/// Some static hosts reject requests that carry no User-Agent at all.
pub const USER_AGENT: &str = concat!("pyramid-stitch/", env!("CARGO_PKG_VERSION"));

/// HTTP-backed implementation of TileTransport.
///
/// Wraps a shared `reqwest::Client`; cloning is cheap and clones share the
/// connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: create_http_client(timeout)?,
        })
    }

    /// Create a transport around an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TileTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url, "GET");

        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                FetchError::Client(e.to_string())
            } else {
                FetchError::Connection(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.bytes()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))
    }
}

/// Create an HTTP client with the given timeout and the crate's User-Agent.
pub fn create_http_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FetchError::Client(format!("Failed to create HTTP client: {}", e)))
}
