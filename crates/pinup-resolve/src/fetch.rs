//! Streaming artifact downloads

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;

/// Body of a download, delivered in chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Opens a byte stream for a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Start downloading `url`
    ///
    /// # Errors
    /// Returns [`FetchError`] if the request cannot be made or is refused.
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError>;
}

/// Download failures, isolated per URL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request could not be sent or timed out
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Stream broke while reading the body
    #[error("reading body of {url} failed: {message}")]
    Body { url: String, message: String },

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Create request error
    pub fn request(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Request {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Create body error
    pub fn body(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Body {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

/// [`Fetcher`] over HTTP(S) using reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    ///
    /// # Errors
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pinup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let owned = url.to_string();
        Ok(response
            .bytes_stream()
            .map_err(move |e| FetchError::body(owned.as_str(), e))
            .boxed())
    }
}
