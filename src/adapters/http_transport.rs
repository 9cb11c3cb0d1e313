use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use eyre::{Result, WrapErr};
use hyper::{Request, Uri, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;

use crate::ports::transport::{TransportError, TransportResult, VisitTransport};

/// Default collector ingestion endpoint.
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "https://analytics.usehall.com/visit";

const USER_AGENT: &str = concat!("beacon/", env!("CARGO_PKG_VERSION"));

/// Collector transport using Hyper with Rustls (HTTP/1.1, `https` or plain `http`).
///
/// Responsibilities:
/// * Builds the authenticated JSON POST for one visit
/// * Bounds each delivery with a timeout
/// * Drops the response without reading its body
///
/// Each visit is one POST; there is no retry or batching.
pub struct HttpVisitTransport {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
    endpoint: Uri,
    timeout: Option<Duration>,
}

impl HttpVisitTransport {
    /// Create a transport posting to `endpoint`.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint: Uri = endpoint
            .parse()
            .wrap_err_with(|| format!("Invalid collector endpoint: {endpoint}"))?;
        if endpoint.host().is_none() {
            return Err(eyre::eyre!("Collector endpoint has no host: {endpoint}"));
        }

        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!("Created collector transport for {}", endpoint);
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Build the outgoing POST for one visit body.
    fn build_request(&self, access_token: &str, body: Bytes) -> TransportResult<Request<AxumBody>> {
        let authorization = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Request::builder()
            .method("POST")
            .uri(self.endpoint.clone())
            .version(Version::HTTP_11)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, authorization)
            .header(header::USER_AGENT, USER_AGENT)
            .body(AxumBody::from(body))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl VisitTransport for HttpVisitTransport {
    async fn send_visit(&self, access_token: &str, body: Bytes) -> TransportResult<()> {
        let request = self.build_request(access_token, body)?;
        let in_flight = self.client.request(request);

        let result = match self.timeout {
            Some(limit) => timeout(limit, in_flight)
                .await
                .map_err(|_| TransportError::Timeout(limit.as_secs()))?,
            None => in_flight.await,
        };

        match result {
            Ok(response) => {
                let status = response.status();
                tracing::debug!("Collector {} answered {}", self.endpoint, status);
                if status.is_success() {
                    Ok(())
                } else {
                    Err(TransportError::CollectorError {
                        url: self.endpoint.to_string(),
                        status,
                    })
                }
            }
            Err(e) => Err(TransportError::ConnectionError(format!(
                "POST {} failed: {e}",
                self.endpoint
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_creation() {
        let transport = HttpVisitTransport::new(DEFAULT_COLLECTOR_ENDPOINT, None);
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_relative_endpoint() {
        assert!(HttpVisitTransport::new("/visit", None).is_err());
    }

    #[tokio::test]
    async fn test_build_request_headers() {
        let transport = HttpVisitTransport::new(DEFAULT_COLLECTOR_ENDPOINT, None).unwrap();
        let req = transport
            .build_request("tok123", Bytes::from_static(b"{}"))
            .unwrap();

        assert_eq!(req.method(), "POST");
        assert_eq!(req.uri(), "https://analytics.usehall.com/visit");
        let headers = req.headers();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            HeaderValue::from_static("Bearer tok123")
        );
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            HeaderValue::from_static("application/json")
        );
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            HttpVisitTransport::new(&format!("http://{addr}/visit"), Some(Duration::from_secs(2)))
                .unwrap();
        let result = transport
            .send_visit("tok123", Bytes::from_static(b"{}"))
            .await;
        assert!(matches!(result, Err(TransportError::ConnectionError(_))));
    }
}
