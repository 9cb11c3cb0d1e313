pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_config, load_config_unchecked};
pub use models::*;
pub use validation::{BeaconConfigValidator, ValidationError, ValidationResult};
