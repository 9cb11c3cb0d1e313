use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use thiserror::Error;

/// Custom error type for collector delivery
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// Error when the collector cannot be reached
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when delivery exceeds the configured timeout
    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    /// Error when the outgoing request cannot be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error when the collector answers with a non-success status
    #[error("Collector returned error status: {status}, url: {url}")]
    CollectorError {
        /// The collector endpoint
        url: String,
        /// The status code returned by the collector
        status: StatusCode,
    },
}

/// Result type alias for collector delivery
pub type TransportResult<T> = Result<T, TransportError>;

/// VisitTransport defines the port for delivering a serialized visit report.
#[async_trait]
pub trait VisitTransport: Send + Sync + 'static {
    /// POST `body` (compact JSON) to the collector, authenticated with `access_token`.
    ///
    /// The response body is never consumed.
    async fn send_visit(&self, access_token: &str, body: Bytes) -> TransportResult<()>;
}
