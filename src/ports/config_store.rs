use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::sanitize::is_valid_access_token;

/// Operator settings read on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether visits are reported at all
    pub enabled: bool,
    /// Bearer credential sent to the collector; empty means "not configured"
    pub access_token: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            access_token: String::new(),
        }
    }
}

/// Error type for settings persistence
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// Error when reading or writing the backing file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error when the stored document cannot be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error when a token violates the `[A-Za-z0-9_-]{0,255}` invariant
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
}

/// Result type for settings persistence
pub type StoreResult<T> = Result<T, StoreError>;

/// ConfigStore defines the port for durable beacon settings.
///
/// Getters never fail: they answer from the last successfully loaded snapshot.
pub trait ConfigStore: Send + Sync + 'static {
    /// Current settings snapshot
    fn snapshot(&self) -> Settings;

    fn get_enabled(&self) -> bool {
        self.snapshot().enabled
    }

    fn get_access_token(&self) -> String {
        self.snapshot().access_token
    }

    fn set_enabled(&self, enabled: bool) -> StoreResult<()>;

    /// Store a new access token. Tokens outside the allowed alphabet are rejected.
    fn set_access_token(&self, token: String) -> StoreResult<()>;

    /// Whether settings were ever written (used by activation)
    fn is_initialized(&self) -> bool;

    /// Remove every stored setting (used by uninstall)
    fn clear(&self) -> StoreResult<()>;
}

/// Reject tokens that break the stored-token invariant.
pub fn ensure_valid_token(token: &str) -> StoreResult<()> {
    if is_valid_access_token(token) {
        Ok(())
    } else {
        Err(StoreError::InvalidToken(format!(
            "{} characters, must match [A-Za-z0-9_-]{{0,255}}",
            token.chars().count()
        )))
    }
}
