//! Operator-facing settings rules: form submissions, activation and uninstall.
use serde::{Deserialize, Serialize};

use super::sanitize::sanitize_access_token;
use crate::ports::config_store::{ConfigStore, StoreResult};

/// Message returned after a successful settings submission.
pub const SETTINGS_SAVED: &str = "Settings saved successfully.";

/// A settings submission.
///
/// `enabled` follows checkbox semantics: reporting is enabled when the field is
/// present at all, whatever its value, and disabled when it is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub enabled: Option<String>,
}

/// Settings as shown to an operator; the token itself is never echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsView {
    pub enabled: bool,
    pub has_access_token: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SettingsView {
    pub fn from_store(store: &dyn ConfigStore) -> Self {
        let settings = store.snapshot();
        Self {
            enabled: settings.enabled,
            has_access_token: !settings.access_token.is_empty(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Apply a submission: a token that sanitizes to empty leaves the stored one alone,
/// and `enabled` is always rewritten from the checkbox.
pub fn apply_settings(store: &dyn ConfigStore, form: &SettingsForm) -> StoreResult<()> {
    if let Some(raw) = &form.access_token {
        let token = sanitize_access_token(raw);
        if !token.is_empty() {
            store.set_access_token(token)?;
            tracing::info!("Access token updated");
        }
    }

    let enabled = form.enabled.is_some();
    store.set_enabled(enabled)?;
    tracing::info!(enabled, "Reporting toggled");
    Ok(())
}

/// Write default settings the first time the beacon is activated.
///
/// Returns `true` when defaults were written.
pub fn activate(store: &dyn ConfigStore) -> StoreResult<bool> {
    if store.is_initialized() {
        return Ok(false);
    }
    store.set_enabled(true)?;
    tracing::info!("Beacon activated with default settings");
    Ok(true)
}

/// Remove every stored setting.
pub fn uninstall(store: &dyn ConfigStore) -> StoreResult<()> {
    store.clear()?;
    tracing::info!("Beacon settings removed");
    Ok(())
}
