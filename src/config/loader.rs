use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::{models::BeaconConfig, validation::BeaconConfigValidator};

/// Prefix of environment variables overriding file values (`BEACON__COLLECTOR__ENDPOINT`).
pub const ENV_PREFIX: &str = "BEACON";

/// Load and validate configuration from `config_path` plus environment overrides.
///
/// A missing file is not an error: defaults and the environment still apply.
pub fn load_config(config_path: &str) -> Result<BeaconConfig> {
    let config = load_config_unchecked(config_path)?;
    BeaconConfigValidator::validate(&config)
        .with_context(|| format!("Invalid configuration in {config_path}"))?;
    Ok(config)
}

/// Load configuration without validation (used by the `validate` command)
pub fn load_config_unchecked(config_path: &str) -> Result<BeaconConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let settings = Config::builder()
        .add_source(
            File::new(
                config_path
                    .to_str()
                    .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
                format,
            )
            .required(false),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let beacon_config: BeaconConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(beacon_config)
}
