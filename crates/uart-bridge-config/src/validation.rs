// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every violation before failing so a bad file is fixed in one pass.

use crate::{BridgeConfig, ConfigError, ConfigResult};
use std::net::SocketAddr;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    ExceedsLimit { field: String, value: usize, limit_field: String, limit: usize },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::ExceedsLimit {
                field,
                value,
                limit_field,
                limit,
            } => {
                write!(
                    f,
                    "{} = {} exceeds {} = {}",
                    field, value, limit_field, limit
                )
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &BridgeConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_serial(config, &mut errors);
    validate_wireless(config, &mut errors);
    validate_bridge(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn require_positive(field: &str, value: usize, errors: &mut Vec<ConfigValidationError>) {
    if value == 0 {
        errors.push(invalid(field, "must be greater than 0"));
    }
}

fn validate_serial(config: &BridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    let serial = &config.serial;

    if serial.port.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "serial.port".to_string(),
        });
    }
    if serial.baud_rate == 0 {
        errors.push(invalid("serial.baud_rate", "must be greater than 0"));
    }
    if !(5..=8).contains(&serial.data_bits) {
        errors.push(invalid(
            "serial.data_bits",
            format!("{} is not one of 5, 6, 7, 8", serial.data_bits),
        ));
    }
    if !matches!(serial.stop_bits, 1 | 2) {
        errors.push(invalid(
            "serial.stop_bits",
            format!("{} is not 1 or 2", serial.stop_bits),
        ));
    }
    require_positive("serial.rx_chunk_size", serial.rx_chunk_size, errors);
    require_positive("serial.rx_buffer_size", serial.rx_buffer_size, errors);
    if serial.read_timeout_ms == 0 {
        errors.push(invalid("serial.read_timeout_ms", "must be greater than 0"));
    }

    // A single serial chunk must fit the initial staging allocation
    if serial.rx_chunk_size > config.bridge.staging_capacity {
        errors.push(ConfigValidationError::ExceedsLimit {
            field: "serial.rx_chunk_size".to_string(),
            value: serial.rx_chunk_size,
            limit_field: "bridge.staging_capacity".to_string(),
            limit: config.bridge.staging_capacity,
        });
    }
}

fn validate_wireless(config: &BridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    let wireless = &config.wireless;

    if wireless.listen_address.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "wireless.listen_address".to_string(),
        });
    } else if let Err(e) = wireless.listen_address.parse::<SocketAddr>() {
        errors.push(invalid("wireless.listen_address", e.to_string()));
    }

    require_positive("wireless.max_inbound_size", wireless.max_inbound_size, errors);
    if wireless.max_inbound_size > config.bridge.staging_capacity {
        errors.push(ConfigValidationError::ExceedsLimit {
            field: "wireless.max_inbound_size".to_string(),
            value: wireless.max_inbound_size,
            limit_field: "bridge.staging_capacity".to_string(),
            limit: config.bridge.staging_capacity,
        });
    }
    if wireless.write_timeout_ms == 0 {
        errors.push(invalid("wireless.write_timeout_ms", "must be greater than 0"));
    }
}

fn validate_bridge(config: &BridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    require_positive("bridge.queue_capacity", config.bridge.queue_capacity, errors);
    require_positive("bridge.staging_capacity", config.bridge.staging_capacity, errors);
}

fn validate_logging(config: &BridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(invalid(
            "logging.level",
            format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        ));
    }
    // The run folder just created counts as one of the kept runs
    require_positive("logging.retention_runs", config.logging.retention_runs, errors);
    if config.logging.file_logging && config.logging.log_dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.log_dir".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn test_chunk_larger_than_staging_rejected() {
        let mut config = BridgeConfig::default();
        config.bridge.staging_capacity = 256;
        config.serial.rx_chunk_size = 512;
        config.wireless.max_inbound_size = 128;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("serial.rx_chunk_size = 512 exceeds bridge.staging_capacity = 256"));
        assert!(!err.contains("wireless.max_inbound_size"));
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = BridgeConfig::default();
        config.serial.port = String::new();
        config.serial.data_bits = 9;
        config.serial.stop_bits = 3;
        config.wireless.listen_address = "not-an-address".to_string();
        config.bridge.queue_capacity = 0;
        config.logging.level = "loud".to_string();

        let err = match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        };
        assert!(err.starts_with("Configuration validation failed:"));
        for field in [
            "serial.port",
            "serial.data_bits",
            "serial.stop_bits",
            "wireless.listen_address",
            "bridge.queue_capacity",
            "logging.level",
        ] {
            assert!(err.contains(field), "missing {} in:\n{}", field, err);
        }
        assert_eq!(err.lines().count(), 7);
    }

    #[test]
    fn test_zero_retention_runs_rejected() {
        let mut config = BridgeConfig::default();
        config.logging.retention_runs = 0;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("logging.retention_runs"), "{}", err);

        config.logging.retention_runs = 1;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = BridgeConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
