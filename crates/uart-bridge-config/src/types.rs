// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `uart_bridge.toml`. Every field has a
//! default, so a partial file (or none at all) is a valid starting point.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub wireless: WirelessConfig,
    pub bridge: CoordinatorSettings,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Render the configuration as TOML, e.g. to show effective settings
    pub fn to_toml(&self) -> crate::ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| crate::ConfigError::InvalidValue(e.to_string()))
    }
}

/// Parity bit setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl std::str::FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            other => Err(format!("unknown parity '{}'", other)),
        }
    }
}

/// Wired serial line
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path or name (e.g. `/dev/ttyUSB0`, `COM3`)
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub flow_control: bool,
    /// Largest chunk handed to the bridge per read
    pub rx_chunk_size: usize,
    /// Driver receive buffer; holding more pending bytes than this counts as overflow
    pub rx_buffer_size: usize,
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: false,
            rx_chunk_size: 1024,
            rx_buffer_size: 1024,
            read_timeout_ms: 100,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Wireless side
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WirelessConfig {
    /// Socket address the link listens on for its single peer
    pub listen_address: String,
    /// Name announced in logs when the link comes up
    pub device_name: String,
    /// Largest inbound payload per event; larger reads are split
    pub max_inbound_size: usize,
    /// A write blocked for longer than this is reported as congestion
    pub write_timeout_ms: u64,
    /// Delay before a congested link signals that it can take data again
    pub congestion_backoff_ms: u64,
}

impl Default for WirelessConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:7878".to_string(),
            device_name: "UART-BRIDGE".to_string(),
            max_inbound_size: 1024,
            write_timeout_ms: 500,
            congestion_backoff_ms: 50,
        }
    }
}

impl WirelessConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn congestion_backoff(&self) -> Duration {
        Duration::from_millis(self.congestion_backoff_ms)
    }
}

/// Coordinator sizing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Event queue depth
    pub queue_capacity: usize,
    /// Initial staging buffer size in bytes
    pub staging_capacity: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 20,
            staging_capacity: 1024,
        }
    }
}

/// Console log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ConsoleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ConsoleFormat::Text),
            "json" => Ok(ConsoleFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub format: ConsoleFormat,
    /// Write JSON log files in addition to the console
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: ConsoleFormat::Text,
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [serial]
            port = "/dev/ttyS1"
            parity = "even"

            [bridge]
            queue_capacity = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyS1");
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.bridge.queue_capacity, 64);
        assert_eq!(config.bridge.staging_capacity, 1024);
        assert_eq!(config.wireless, WirelessConfig::default());
    }

    #[test]
    fn test_parity_from_str() {
        assert_eq!("ODD".parse::<Parity>().unwrap(), Parity::Odd);
        assert!("mark".parse::<Parity>().is_err());
    }

    #[test]
    fn test_log_format_key() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.format, ConsoleFormat::Json);
        assert_eq!(BridgeConfig::default().logging.format, ConsoleFormat::Text);
        assert!(toml::from_str::<BridgeConfig>("[logging]\nformat = \"xml\"").is_err());
        assert_eq!("JSON".parse::<ConsoleFormat>().unwrap(), ConsoleFormat::Json);
    }

    #[test]
    fn test_toml_rendering_reloads() {
        let mut config = BridgeConfig::default();
        config.serial.port = "COM3".to_string();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[serial]"));
        let reloaded: BridgeConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_config_serializes_to_json() {
        let json = serde_json::to_value(BridgeConfig::default()).unwrap();
        assert_eq!(json["serial"]["parity"], "none");
        assert_eq!(json["wireless"]["max_inbound_size"], 1024);
    }
}
