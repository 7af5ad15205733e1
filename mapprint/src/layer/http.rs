//! HTTP client abstraction for testability

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace, warn};

/// Default User-Agent string for HTTP requests.
/// Required by some tile servers that reject requests without a User-Agent.
const DEFAULT_USER_AGENT: &str = concat!("mapprint/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from the HTTP transport.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Client could not be constructed
    Client(String),
    /// Request failed before a response arrived (connect, timeout, TLS)
    Request { url: String, reason: String },
    /// Server answered with a non-success status
    Status { status: u16, url: String },
    /// Response body could not be read
    Body { url: String, reason: String },
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Client(reason) => write!(f, "Failed to create HTTP client: {}", reason),
            HttpError::Request { url, reason } => {
                write!(f, "Request to {} failed: {}", url, reason)
            }
            HttpError::Status { status, url } => write!(f, "HTTP {} from {}", status, url),
            HttpError::Body { url, reason } => {
                write!(f, "Failed to read response from {}: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for asynchronous HTTP client operations.
///
/// Tile layers are generic over this so tests can serve canned bytes.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(HttpError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(HttpError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(HttpError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
