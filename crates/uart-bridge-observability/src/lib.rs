// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! # uart-bridge-observability
//!
//! Logging setup shared by the bridge binary and its tests, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files in a timestamped folder per run

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Workspace crate names accepted by `--debug-<crate>`
pub const KNOWN_CRATES: &[&str] = &[
    "uart-bridge",
    "uart-bridge-core",
    "uart-bridge-hal",
    "uart-bridge-transports",
    "uart-bridge-config",
    "uart-bridge-observability",
];

/// Tracing target for a crate name (`uart-bridge-core` -> `uart_bridge_core`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
