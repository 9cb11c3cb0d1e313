//! Axum middleware wiring the visit reporter into a host's request pipeline.
//!
//! The layer is registered once at startup. Per request it snapshots the request
//! environment, lets the reporter decide and (maybe) spawn a dispatch, then hands the
//! untouched request to the rest of the stack. The response never waits on the
//! collector.
use std::sync::Arc;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::core::{context::RequestContext, reporter::VisitReporter};

/// Report the visit, then run the downstream handler.
pub async fn visit_beacon(req: Request, next: Next, reporter: Arc<VisitReporter>) -> Response {
    reporter.report(&RequestContext::from_request(&req));
    next.run(req).await
}

/// Create a cloneable closure wrapping [`visit_beacon`].
pub fn create_visit_beacon_middleware(
    reporter: Arc<VisitReporter>,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
+ Clone {
    move |req, next| {
        let reporter = reporter.clone();
        Box::pin(async move { visit_beacon(req, next, reporter).await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        middleware,
    };
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use tokio::sync::mpsc;
    use tower::ServiceExt; // for oneshot

    use super::*;
    use crate::{
        adapters::MemoryConfigStore,
        ports::{
            config_store::Settings,
            transport::{TransportResult, VisitTransport},
        },
    };

    struct RecordingTransport {
        tx: mpsc::UnboundedSender<Bytes>,
    }

    #[async_trait]
    impl VisitTransport for RecordingTransport {
        async fn send_visit(&self, _access_token: &str, body: Bytes) -> TransportResult<()> {
            let _ = self.tx.send(body);
            Ok(())
        }
    }

    fn app(settings: Settings) -> (Router, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Arc::new(VisitReporter::new(
            Arc::new(MemoryConfigStore::with_settings(settings)),
            Arc::new(RecordingTransport { tx }),
        ));
        let router = Router::new()
            .fallback(|| async { "hello" })
            .layer(middleware::from_fn(create_visit_beacon_middleware(reporter)));
        (router, rx)
    }

    fn enabled() -> Settings {
        Settings {
            enabled: true,
            access_token: "tok123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reports_and_passes_response_through() {
        let (app, mut rx) = app(enabled());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/blog/post-1")
                    .header(header::HOST, "example.com")
                    .header(header::USER_AGENT, "TestBot/1.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello");

        let sent = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("dispatch timed out")
            .expect("channel closed");
        let json: serde_json::Value = serde_json::from_slice(&sent).unwrap();
        assert_eq!(json["request_path"], "/blog/post-1");
        assert_eq!(json["request_headers"]["Host"], "example.com");
    }

    #[tokio::test]
    async fn test_http2_request_reports_authority_as_host() {
        let (app, mut rx) = app(enabled());

        // HTTP/2 carries the host in :authority, which hyper exposes on the URI
        let response = app
            .oneshot(
                Request::builder()
                    .version(axum::http::Version::HTTP_2)
                    .uri("http://example.com/blog/post-1")
                    .header(header::USER_AGENT, "TestBot/1.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("dispatch timed out")
            .expect("channel closed");
        let json: serde_json::Value = serde_json::from_slice(&sent).unwrap();
        assert_eq!(json["request_path"], "/blog/post-1");
        assert_eq!(json["request_headers"]["Host"], "example.com");
        assert_eq!(json["request_headers"]["User-Agent"], "TestBot/1.0");
    }

    #[tokio::test]
    async fn test_disabled_does_not_report() {
        let (app, mut rx) = app(Settings {
            enabled: false,
            ..enabled()
        });

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
