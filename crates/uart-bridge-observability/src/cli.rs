// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-uart-bridge-core` or `--debug-all`, and the
//! `UART_BRIDGE_DEBUG` environment variable.

use std::collections::BTreeSet;
use std::env;

use crate::{crate_target, KNOWN_CRATES};

/// Environment variable listing crates to debug (comma-separated, or `all`)
pub const DEBUG_ENV: &str = "UART_BRIDGE_DEBUG";

/// Crates with debug logging switched on
///
/// # Example
/// ```rust
/// use uart_bridge_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-uart-bridge-core".to_string()]);
/// assert!(flags.is_enabled("uart-bridge-core"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }
        flags
    }

    /// Merge a `UART_BRIDGE_DEBUG` style value (`all` or comma-separated names)
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',').map(str::trim) {
            if !crate_name.is_empty() {
                self.enable(crate_name);
            }
        }
    }

    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string());
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Names that are not workspace crates (typos, usually)
    pub fn unknown_crates(&self) -> Vec<&str> {
        self.enabled_crates
            .iter()
            .map(String::as_str)
            .filter(|name| !KNOWN_CRATES.contains(name))
            .collect()
    }

    /// Build an `EnvFilter` directive string
    ///
    /// Format: `uart_bridge_core=debug,uart_bridge_hal=debug,info`. Crate names
    /// are turned into tracing targets (hyphens become underscores).
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|name| format!("{}=debug", crate_target(name)))
            .collect();
        filters.push(base_level.to_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and `UART_BRIDGE_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var(DEBUG_ENV) {
        flags.merge_env_value(&value);
    }
    flags
}

/// Strip `--debug-*` flags so the remaining arguments can go to the CLI parser
pub fn strip_debug_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .filter(|arg| !arg.starts_with("--debug-"))
        .collect()
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  {env}={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  {env}=all                               Enable debug for all crates

Examples:
  --debug-uart-bridge-core
  --debug-uart-bridge-core --debug-uart-bridge-transports
  {env}=uart-bridge-core,uart-bridge-transports
"#,
        KNOWN_CRATES.join(", "),
        env = DEBUG_ENV
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-uart-bridge-core".to_string()]);
        assert!(flags.is_enabled("uart-bridge-core"));
        assert!(!flags.is_enabled("uart-bridge-hal"));
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
        assert!(flags.unknown_crates().is_empty());
    }

    #[test]
    fn test_filter_string_uses_targets() {
        let flags = CrateDebugFlags::from_args(vec![
            "--debug-uart-bridge-transports".to_string(),
            "--debug-uart-bridge-core".to_string(),
        ]);
        assert_eq!(
            flags.to_filter_string("WARN"),
            "uart_bridge_core=debug,uart_bridge_transports=debug,warn"
        );
        assert_eq!(CrateDebugFlags::default().to_filter_string("info"), "info");
    }

    #[test]
    fn test_env_value_merge() {
        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value(" uart-bridge-hal, ,uart-bridge-config ");
        assert!(flags.is_enabled("uart-bridge-hal"));
        assert!(flags.is_enabled("uart-bridge-config"));
        assert_eq!(flags.enabled_crates.len(), 2);

        flags.merge_env_value("all");
        assert_eq!(flags.enabled_crates.len(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_unknown_crates_reported() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-uart-brdige".to_string()]);
        assert_eq!(flags.unknown_crates(), vec!["uart-brdige"]);
    }

    #[test]
    fn test_strip_debug_flags() {
        let args = vec![
            "uart-bridge".to_string(),
            "--debug-all".to_string(),
            "--port".to_string(),
            "/dev/ttyUSB1".to_string(),
        ];
        assert_eq!(
            strip_debug_flags(args),
            vec!["uart-bridge", "--port", "/dev/ttyUSB1"]
        );
    }
}
