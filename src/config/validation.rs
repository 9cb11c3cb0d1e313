use std::net::SocketAddr;

use http::HeaderName;
use url::Url;

use crate::config::models::BeaconConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid collector endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Beacon configuration validator
pub struct BeaconConfigValidator;

impl BeaconConfigValidator {
    /// Validate the entire configuration, reporting every problem at once
    pub fn validate(config: &BeaconConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_endpoint(&config.collector.endpoint) {
            errors.push(e);
        }

        if config.collector.timeout_secs == Some(0) {
            errors.push(ValidationError::InvalidField {
                field: "collector.timeout_secs".to_string(),
                message: "Timeout must be greater than zero (omit it to use the transport default)"
                    .to_string(),
            });
        }

        for name in &config.reporter.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("reporter.headers: {name}"),
                    message: "Not a valid HTTP header name".to_string(),
                });
            }
        }

        for prefix in &config.reporter.excluded_prefixes {
            if let Err(e) = Self::validate_path("reporter.excluded_prefixes", prefix) {
                errors.push(e);
            }
        }

        if let Err(e) = Self::validate_path("settings_api.mount", &config.settings_api.mount) {
            errors.push(e);
        }
        if config
            .settings_api
            .admin_token
            .as_deref()
            .is_some_and(str::is_empty)
        {
            errors.push(ValidationError::InvalidField {
                field: "settings_api.admin_token".to_string(),
                message: "Admin token must not be empty; omit it to disable the settings API"
                    .to_string(),
            });
        }

        if config.store.path.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "store.path".to_string(),
                message: "Settings file path must not be empty".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_endpoint(endpoint: &str) -> ValidationResult<()> {
        let invalid = |reason: &str| ValidationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("Scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("Missing host"));
        }
        Ok(())
    }

    fn validate_path(field: &str, path: &str) -> ValidationResult<()> {
        if !path.starts_with('/') {
            return Err(ValidationError::InvalidField {
                field: format!("{field}: {path}"),
                message: "Paths must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }
        let mut message = format!("{} configuration errors:", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("\n  {}. {}", i + 1, error));
        }
        message
    }
}
