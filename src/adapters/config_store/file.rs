use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use arc_swap::ArcSwap;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};

use crate::{
    ports::config_store::{ConfigStore, Settings, StoreError, StoreResult, ensure_valid_token},
    tracing_setup::component_span,
};

/// Settings store persisted as a JSON document on disk.
///
/// The last good snapshot is cached in memory so request-path reads never touch the
/// file system. With [`FileConfigStore::watched`] edits made by another process (for
/// example the `settings` CLI while the server runs) are picked up live.
pub struct FileConfigStore {
    path: PathBuf,
    cache: Arc<ArcSwap<Settings>>,
    initialized: Arc<AtomicBool>,
    write_lock: Mutex<()>,
    // Kept alive for the lifetime of the store; never accessed after init
    _watcher: Option<notify::RecommendedWatcher>,
}

impl FileConfigStore {
    /// Open the store at `path`. A missing file means "never initialized".
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let loaded = read_settings(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        let initialized = loaded.is_some();

        Ok(Self {
            path,
            cache: Arc::new(ArcSwap::from_pointee(loaded.unwrap_or_default())),
            initialized: Arc::new(AtomicBool::new(initialized)),
            write_lock: Mutex::new(()),
            _watcher: None,
        })
    }

    /// Open the store and reload it whenever the file changes on disk.
    pub fn watched(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path)?;
        store.init_watcher()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_watcher(&mut self) -> Result<()> {
        let cache = self.cache.clone();
        let initialized = self.initialized.clone();
        let settings_path = self.path.clone();
        let settings_filename = settings_path
            .file_name()
            .ok_or_else(|| eyre::eyre!("Invalid settings path"))?
            .to_owned();
        let span = component_span("settings_store");

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let _enter = span.enter();
                match res {
                    Ok(event) => {
                        if (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(&settings_filename))
                        {
                            tracing::debug!("Settings file changed: {:?}", event.kind);
                            reload(&settings_path, &cache, &initialized);
                        }
                    }
                    Err(e) => tracing::error!("Settings watch error: {:?}", e),
                }
            })?;

        let watch_dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch settings directory")?;

        self._watcher = Some(watcher);
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) -> StoreResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = Settings::clone(&self.cache.load());
        f(&mut next);
        write_settings(&self.path, &next)?;
        self.cache.store(Arc::new(next));
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }
}

fn reload(path: &Path, cache: &ArcSwap<Settings>, initialized: &AtomicBool) {
    match read_settings(path) {
        Ok(Some(settings)) => {
            cache.store(Arc::new(settings));
            initialized.store(true, Ordering::Release);
            tracing::info!("Reloaded settings from {}", path.display());
        }
        Ok(None) => {
            cache.store(Arc::new(Settings::default()));
            initialized.store(false, Ordering::Release);
            tracing::info!("Settings file {} removed, using defaults", path.display());
        }
        // Partial writes from other editors land here; keep the last good snapshot.
        Err(e) => tracing::warn!("Ignoring unreadable settings file {}: {}", path.display(), e),
    }
}

fn read_settings(path: &Path) -> StoreResult<Option<Settings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let settings: Settings = serde_json::from_str(&raw)?;
    ensure_valid_token(&settings.access_token)?;
    Ok(Some(settings))
}

fn write_settings(path: &Path, settings: &Settings) -> StoreResult<()> {
    let body = serde_json::to_vec_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl ConfigStore for FileConfigStore {
    fn snapshot(&self) -> Settings {
        Settings::clone(&self.cache.load())
    }

    fn set_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.update(|s| s.enabled = enabled)
    }

    fn set_access_token(&self, token: String) -> StoreResult<()> {
        ensure_valid_token(&token)?;
        self.update(|s| s.access_token = token)
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn clear(&self) -> StoreResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::IoError(e)),
        }
        self.cache.store(Arc::new(Settings::default()));
        self.initialized.store(false, Ordering::Release);
        Ok(())
    }
}
