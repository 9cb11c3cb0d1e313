pub mod config_store;
pub mod http_transport;
pub mod middleware;
pub mod settings_api;

/// Re-export commonly used types from adapters
pub use config_store::{FileConfigStore, MemoryConfigStore};
pub use http_transport::HttpVisitTransport;
pub use middleware::*;
pub use settings_api::settings_router;
