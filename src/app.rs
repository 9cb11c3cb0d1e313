//! Router assembly for the bundled host.
//!
//! The host serves a static site, optionally mounts the settings API, and wraps
//! everything in the visit beacon layer so each inbound request is considered for
//! reporting exactly once.
use std::sync::Arc;

use axum::{Router, middleware};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    adapters::{middleware::create_visit_beacon_middleware, settings_api::settings_router},
    config::models::BeaconConfig,
    core::{EligibilityFilter, RequestMetadataExtractor, VisitReporter},
    ports::{config_store::ConfigStore, transport::VisitTransport},
};

/// Build the reporter described by `config`.
pub fn build_reporter(
    config: &BeaconConfig,
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn VisitTransport>,
) -> VisitReporter {
    VisitReporter::new(store, transport)
        .with_filter(EligibilityFilter::new(config.excluded_prefixes()))
        .with_extractor(RequestMetadataExtractor::new(config.reporter.headers.clone()))
}

/// Build the full host router: static site, settings API, beacon and request tracing.
pub fn build_router(
    config: &BeaconConfig,
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn VisitTransport>,
) -> Router {
    let reporter = Arc::new(build_reporter(config, store.clone(), transport));

    let mut app = Router::new().fallback_service(ServeDir::new(&config.site.root));

    match config.settings_api.admin_token.as_deref() {
        Some(admin_token) => {
            tracing::info!("Settings API mounted at {}", config.settings_api.mount);
            app = app.merge(settings_router(
                store,
                admin_token,
                &config.settings_api.mount,
            ));
        }
        None => tracing::info!("No admin token configured, settings API disabled"),
    }

    app.layer(middleware::from_fn(create_visit_beacon_middleware(reporter)))
        .layer(TraceLayer::new_for_http())
}
