// End-to-end checks: host router + real HTTP transport + a local fake collector
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    routing::post,
};
use beacon::{
    app,
    adapters::{FileConfigStore, HttpVisitTransport, MemoryConfigStore},
    config::BeaconConfig,
    ports::config_store::{ConfigStore, Settings},
};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

type Captured = (HeaderMap, Bytes);

/// Start a collector on an ephemeral port that records every POST it receives.
async fn spawn_collector() -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    let (tx, rx) = mpsc::unbounded_channel::<Captured>();

    async fn capture(
        State(tx): State<mpsc::UnboundedSender<Captured>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let _ = tx.send((headers, body));
        StatusCode::NO_CONTENT
    }

    let router = Router::new().route("/visit", post(capture)).with_state(tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, rx)
}

fn site_config(site_root: &std::path::Path, endpoint: &str) -> BeaconConfig {
    BeaconConfig::builder()
        .site_root(site_root.to_string_lossy())
        .collector_endpoint(endpoint)
        .collector_timeout_secs(Some(2))
        .build()
        .unwrap()
}

fn enabled_store(token: &str) -> Arc<MemoryConfigStore> {
    Arc::new(MemoryConfigStore::with_settings(Settings {
        enabled: true,
        access_token: token.to_string(),
    }))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_eligible_visit_reaches_collector() {
    let site = tempfile::tempdir().unwrap();
    let (collector, mut visits) = spawn_collector().await;
    let endpoint = format!("http://{collector}/visit");

    let config = site_config(site.path(), &endpoint);
    let transport =
        Arc::new(HttpVisitTransport::new(&endpoint, config.collector_timeout()).unwrap());
    let app = app::build_router(&config, enabled_store("tok123"), transport);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/blog/post-1")
                .header("Host", "example.com")
                .header("User-Agent", "Mozilla/5.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    // The static site has no such file; the beacon must not change that
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (headers, body) = tokio::time::timeout(Duration::from_secs(5), visits.recv())
        .await
        .expect("collector never received the visit")
        .unwrap();

    assert_eq!(headers.get("authorization").unwrap(), "Bearer tok123");
    assert_eq!(headers.get("content-type").unwrap(), "application/json");

    let visit: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(visit["request_path"], "/blog/post-1");
    assert_eq!(visit["request_method"], "GET");
    assert_eq!(visit["request_headers"]["Host"], "example.com");
    assert_eq!(visit["request_headers"]["User-Agent"], "Mozilla/5.0");
    assert!(visit["request_headers"].get("Referer").is_none());
    assert!(visit["request_timestamp"].as_i64().unwrap() > 0);

    // Exactly one delivery per request
    let extra = tokio::time::timeout(Duration::from_millis(300), visits.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ineligible_requests_are_not_sent() {
    let site = tempfile::tempdir().unwrap();
    let (collector, mut visits) = spawn_collector().await;
    let endpoint = format!("http://{collector}/visit");

    let config = site_config(site.path(), &endpoint);
    let store = enabled_store("tok123");
    let transport = Arc::new(HttpVisitTransport::new(&endpoint, None).unwrap());
    let app = app::build_router(&config, store.clone(), transport);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/wp-admin/index.php")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    store.set_enabled(false).unwrap();
    app.oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let got = tokio::time::timeout(Duration::from_millis(500), visits.recv()).await;
    assert!(got.is_err(), "ineligible requests must not be reported");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_collector_does_not_affect_response() {
    let site = tempfile::tempdir().unwrap();
    tokio::fs::write(site.path().join("index.html"), "<h1>home</h1>")
        .await
        .unwrap();

    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = listener.local_addr().unwrap();
    drop(listener);
    let endpoint = format!("http://{closed}/visit");

    let config = site_config(site.path(), &endpoint);
    let transport = Arc::new(HttpVisitTransport::new(&endpoint, None).unwrap());
    let app = app::build_router(&config, enabled_store("tok123"), transport);

    let started = std::time::Instant::now();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .header("Host", "example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<h1>home</h1>");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stalled_collector_does_not_delay_response() {
    let site = tempfile::tempdir().unwrap();
    tokio::fs::write(site.path().join("index.html"), "<h1>home</h1>")
        .await
        .unwrap();

    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stalled = listener.local_addr().unwrap();
    let (accepted_tx, mut accepted) = mpsc::unbounded_channel::<()>();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
            let _ = accepted_tx.send(());
        }
    });
    let endpoint = format!("http://{stalled}/visit");

    let config = site_config(site.path(), &endpoint);
    let transport = Arc::new(HttpVisitTransport::new(&endpoint, None).unwrap());
    let app = app::build_router(&config, enabled_store("tok123"), transport);

    let started = std::time::Instant::now();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .header("Host", "example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let elapsed = started.elapsed();

    assert_eq!(&body[..], b"<h1>home</h1>");
    assert!(
        elapsed < Duration::from_millis(200),
        "response waited on the collector: {elapsed:?}"
    );

    // The visit POST really was in flight against the stalled collector
    tokio::time::timeout(Duration::from_secs(2), accepted.recv())
        .await
        .expect("collector connection never opened")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_settings_api_updates_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("beacon-settings.json");
    let (collector, mut visits) = spawn_collector().await;
    let endpoint = format!("http://{collector}/visit");

    let config = BeaconConfig::builder()
        .site_root(dir.path().to_string_lossy())
        .collector_endpoint(&endpoint)
        .store_path(settings_path.to_string_lossy())
        .settings_api("/_beacon/settings", "admin-secret")
        .build()
        .unwrap();

    let store = Arc::new(FileConfigStore::new(&settings_path).unwrap());
    assert!(!store.is_initialized());
    let transport = Arc::new(HttpVisitTransport::new(&endpoint, None).unwrap());
    let app = app::build_router(&config, store.clone(), transport);

    let unauthorized = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/_beacon/settings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_beacon/settings")
                .header("Authorization", "Bearer admin-secret")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from("access_token=new%20tok!&enabled=1"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(view["enabled"], true);
    assert_eq!(view["has_access_token"], true);

    assert_eq!(store.get_access_token(), "newtok");
    let on_disk: Settings =
        serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
    assert_eq!(on_disk.access_token, "newtok");

    // Settings traffic itself is never reported
    let got = tokio::time::timeout(Duration::from_millis(500), visits.recv()).await;
    assert!(got.is_err());
}
