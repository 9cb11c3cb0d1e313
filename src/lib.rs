//! Beacon - a fire-and-forget request-visit reporter.
//!
//! On each inbound request to a host site the beacon decides whether the visit should
//! be reported and, if so, POSTs its metadata (path, method, selected headers, client
//! IP, timestamp) to a remote analytics collector with a bearer credential. Delivery
//! runs on a detached task: a slow or failing collector never delays or breaks the
//! host's response.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use axum::{Router, middleware};
//! use beacon::{
//!     FileConfigStore, HttpVisitTransport, VisitReporter,
//!     adapters::create_visit_beacon_middleware,
//! };
//!
//! # fn main() -> eyre::Result<()> {
//! let store = Arc::new(FileConfigStore::new("beacon-settings.json")?);
//! let transport = Arc::new(HttpVisitTransport::new(
//!     "https://analytics.usehall.com/visit",
//!     None,
//! )?);
//! let reporter = Arc::new(VisitReporter::new(store, transport));
//! let app: Router = Router::new()
//!     .layer(middleware::from_fn(create_visit_beacon_middleware(reporter)));
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits for settings storage and collector delivery)
//! from **adapters** (file/memory stores, the hyper transport, axum middleware and the
//! settings API) while the decision logic lives in `core`:
//! * [`core::extractor`] reads sanitized metadata out of a [`core::RequestContext`]
//! * [`core::eligibility`] decides whether a visit is reported
//! * [`core::reporter`] builds the report and dispatches it without waiting
//!
//! # Error Handling
//! Startup and configuration paths return `eyre::Result<T>` with context attached.
//! The request path has no error channel at all: [`VisitReporter::report`] returns
//! nothing and swallows every delivery failure.
pub mod app;
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate and embedders
pub use crate::{
    adapters::{FileConfigStore, HttpVisitTransport, MemoryConfigStore},
    core::{RequestContext, VisitReport, VisitReporter},
    ports::{config_store::ConfigStore, transport::VisitTransport},
};
