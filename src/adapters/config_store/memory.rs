use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;

use crate::ports::config_store::{
    ConfigStore, Settings, StoreResult, ensure_valid_token,
};

/// Process-local settings store.
///
/// Reads are lock-free snapshots; every write swaps in a whole new [`Settings`].
/// Useful for embedding hosts that own persistence themselves, and for tests.
#[derive(Debug)]
pub struct MemoryConfigStore {
    settings: ArcSwap<Settings>,
    initialized: AtomicBool,
}

impl MemoryConfigStore {
    /// Empty store holding the defaults, not yet initialized.
    pub fn new() -> Self {
        Self {
            settings: ArcSwap::from_pointee(Settings::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Store pre-populated with `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            initialized: AtomicBool::new(true),
        }
    }

    fn update(&self, f: impl Fn(&mut Settings)) {
        self.settings.rcu(|current| {
            let mut next = Settings::clone(current);
            f(&mut next);
            next
        });
        self.initialized.store(true, Ordering::Release);
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn snapshot(&self) -> Settings {
        Settings::clone(&self.settings.load())
    }

    fn set_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.update(|s| s.enabled = enabled);
        Ok(())
    }

    fn set_access_token(&self, token: String) -> StoreResult<()> {
        ensure_valid_token(&token)?;
        self.update(|s| s.access_token.clone_from(&token));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn clear(&self) -> StoreResult<()> {
        self.settings.store(std::sync::Arc::new(Settings::default()));
        self.initialized.store(false, Ordering::Release);
        Ok(())
    }
}
