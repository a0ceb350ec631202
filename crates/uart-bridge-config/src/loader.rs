// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are layered in this order, later layers winning:
//! 1. TOML file (or built-in defaults when no file exists)
//! 2. Environment variables (`UART_BRIDGE_*`)
//! 3. CLI arguments

use crate::{BridgeConfig, ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "UART_BRIDGE_CONFIG_PATH";

/// Find the bridge configuration file
///
/// Search order:
/// 1. `UART_BRIDGE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./uart_bridge.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found, cannot be read, or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BridgeConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: BridgeConfig = toml::from_str(&content)?;

    apply_overrides(&mut config, cli_args);
    Ok(config)
}

/// Like [`load_config`] with no explicit path, but falls back to defaults
/// when no config file can be found
///
/// Returns the path that was loaded, if any.
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<(BridgeConfig, Option<PathBuf>)> {
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args).map(|config| (config, Some(path))),
        Err(ConfigError::FileNotFound(_)) if env::var_os(CONFIG_PATH_ENV).is_none() => {
            let mut config = BridgeConfig::default();
            apply_overrides(&mut config, cli_args);
            Ok((config, None))
        }
        Err(e) => Err(e),
    }
}

fn apply_overrides(config: &mut BridgeConfig, cli_args: Option<&HashMap<String, String>>) {
    apply_environment_overrides(config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(config, cli);
    }
}

/// Overwrite `target` when `value` parses; unparsable overrides are ignored
fn set_parsed<T: FromStr>(target: &mut T, value: &str) {
    if let Ok(parsed) = value.trim().parse::<T>() {
        *target = parsed;
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `UART_BRIDGE_SERIAL_PORT` -> `serial.port`
/// - `UART_BRIDGE_BAUD_RATE` -> `serial.baud_rate`
/// - `UART_BRIDGE_PARITY` -> `serial.parity`
/// - `UART_BRIDGE_FLOW_CONTROL` -> `serial.flow_control`
/// - `UART_BRIDGE_LISTEN_ADDRESS` -> `wireless.listen_address`
/// - `UART_BRIDGE_DEVICE_NAME` -> `wireless.device_name`
/// - `UART_BRIDGE_QUEUE_CAPACITY` -> `bridge.queue_capacity`
/// - `UART_BRIDGE_STAGING_CAPACITY` -> `bridge.staging_capacity`
/// - `UART_BRIDGE_LOG_LEVEL` -> `logging.level`
/// - `UART_BRIDGE_LOG_FORMAT` -> `logging.format`
/// - `UART_BRIDGE_LOG_DIR` -> `logging.log_dir`
/// - `UART_BRIDGE_FILE_LOGGING` -> `logging.file_logging`
pub fn apply_environment_overrides(config: &mut BridgeConfig) {
    // Serial
    if let Ok(value) = env::var("UART_BRIDGE_SERIAL_PORT") {
        config.serial.port = value;
    }
    if let Ok(value) = env::var("UART_BRIDGE_BAUD_RATE") {
        set_parsed(&mut config.serial.baud_rate, &value);
    }
    if let Ok(value) = env::var("UART_BRIDGE_PARITY") {
        set_parsed(&mut config.serial.parity, &value);
    }
    if let Ok(value) = env::var("UART_BRIDGE_FLOW_CONTROL") {
        config.serial.flow_control = parse_flag(&value);
    }

    // Wireless
    if let Ok(value) = env::var("UART_BRIDGE_LISTEN_ADDRESS") {
        config.wireless.listen_address = value;
    }
    if let Ok(value) = env::var("UART_BRIDGE_DEVICE_NAME") {
        config.wireless.device_name = value;
    }

    // Coordinator
    if let Ok(value) = env::var("UART_BRIDGE_QUEUE_CAPACITY") {
        set_parsed(&mut config.bridge.queue_capacity, &value);
    }
    if let Ok(value) = env::var("UART_BRIDGE_STAGING_CAPACITY") {
        set_parsed(&mut config.bridge.staging_capacity, &value);
    }

    // Logging
    if let Ok(value) = env::var("UART_BRIDGE_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("UART_BRIDGE_LOG_FORMAT") {
        set_parsed(&mut config.logging.format, &value);
    }
    if let Ok(value) = env::var("UART_BRIDGE_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("UART_BRIDGE_FILE_LOGGING") {
        config.logging.file_logging = parse_flag(&value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys: `serial_port`, `baud_rate`, `listen_address`, `queue_capacity`,
/// `staging_capacity`, `log_level`, `log_format`, `file_logging`.
pub fn apply_cli_overrides(config: &mut BridgeConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("serial_port") {
        config.serial.port = value.clone();
    }
    if let Some(value) = cli_args.get("baud_rate") {
        set_parsed(&mut config.serial.baud_rate, value);
    }
    if let Some(value) = cli_args.get("listen_address") {
        config.wireless.listen_address = value.clone();
    }
    if let Some(value) = cli_args.get("queue_capacity") {
        set_parsed(&mut config.bridge.queue_capacity, value);
    }
    if let Some(value) = cli_args.get("staging_capacity") {
        set_parsed(&mut config.bridge.staging_capacity, value);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        set_parsed(&mut config.logging.format, value);
    }
    if let Some(value) = cli_args.get("file_logging") {
        config.logging.file_logging = parse_flag(value);
    }
}
