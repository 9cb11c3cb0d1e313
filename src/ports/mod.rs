pub mod config_store;
pub mod transport;

pub use config_store::{ConfigStore, Settings, StoreError, StoreResult};
pub use transport::{TransportError, TransportResult, VisitTransport};
