//! Configuration data structures for the beacon.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and to
//! `BEACON__*` environment overrides. Every section has defaults so that an empty
//! file (or no file) yields a runnable configuration.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    adapters::http_transport::DEFAULT_COLLECTOR_ENDPOINT, core::extractor::DEFAULT_HEADER_SET,
};

/// Static site served by the bundled demo host
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SiteConfig {
    /// Root directory for static files
    pub root: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: "./public".to_string(),
        }
    }
}

/// Remote analytics collector
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    /// Absolute URL visits are POSTed to
    pub endpoint: String,
    /// Per-delivery timeout; `None` leaves it to the transport
    pub timeout_secs: Option<u64>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COLLECTOR_ENDPOINT.to_string(),
            timeout_secs: Some(10),
        }
    }
}

/// What gets reported
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReporterConfig {
    /// Header names included in reports, in order
    pub headers: Vec<String>,
    /// Path prefixes never reported, on top of the built-in system prefixes
    pub excluded_prefixes: Vec<String>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            headers: DEFAULT_HEADER_SET.iter().map(|h| h.to_string()).collect(),
            excluded_prefixes: Vec::new(),
        }
    }
}

/// Where operator settings live
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON settings file
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "beacon-settings.json".to_string(),
        }
    }
}

/// Settings HTTP surface
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SettingsApiConfig {
    /// Route the settings API is mounted on
    pub mount: String,
    /// Bearer token required by the API; the API is not mounted without one
    pub admin_token: Option<String>,
}

impl Default for SettingsApiConfig {
    fn default() -> Self {
        Self {
            mount: "/_beacon/settings".to_string(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BeaconConfig {
    pub listen_addr: String,
    pub site: SiteConfig,
    pub collector: CollectorConfig,
    pub reporter: ReporterConfig,
    pub store: StoreConfig,
    pub settings_api: SettingsApiConfig,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            site: SiteConfig::default(),
            collector: CollectorConfig::default(),
            reporter: ReporterConfig::default(),
            store: StoreConfig::default(),
            settings_api: SettingsApiConfig::default(),
        }
    }
}

impl BeaconConfig {
    /// Create a new configuration builder
    pub fn builder() -> BeaconConfigBuilder {
        BeaconConfigBuilder::default()
    }

    pub fn collector_timeout(&self) -> Option<Duration> {
        self.collector.timeout_secs.map(Duration::from_secs)
    }

    /// Every prefix the reporter must skip: configured ones plus the settings API
    /// mount when it is served.
    pub fn excluded_prefixes(&self) -> Vec<String> {
        let mut prefixes = self.reporter.excluded_prefixes.clone();
        if self.settings_api.admin_token.is_some() {
            prefixes.push(self.settings_api.mount.clone());
        }
        prefixes
    }
}

/// Builder for BeaconConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct BeaconConfigBuilder {
    config: BeaconConfig,
}

impl BeaconConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn site_root(mut self, root: impl Into<String>) -> Self {
        self.config.site.root = root.into();
        self
    }

    pub fn collector_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.collector.endpoint = endpoint.into();
        self
    }

    pub fn collector_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.collector.timeout_secs = secs;
        self
    }

    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.config.reporter.headers.push(name.into());
        self
    }

    pub fn excluded_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.reporter.excluded_prefixes.push(prefix.into());
        self
    }

    pub fn store_path(mut self, path: impl Into<String>) -> Self {
        self.config.store.path = path.into();
        self
    }

    pub fn settings_api(mut self, mount: impl Into<String>, admin_token: impl Into<String>) -> Self {
        self.config.settings_api = SettingsApiConfig {
            mount: mount.into(),
            admin_token: Some(admin_token.into()),
        };
        self
    }

    /// Build the configuration; fails if the listen address is empty.
    pub fn build(self) -> Result<BeaconConfig, String> {
        if self.config.listen_addr.is_empty() {
            return Err("listen_addr is required".to_string());
        }
        Ok(self.config)
    }
}
