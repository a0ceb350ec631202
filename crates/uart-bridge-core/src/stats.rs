// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Counters kept by the coordinator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Serial bytes acknowledged by the wireless link
    pub bytes_to_wireless: u64,
    /// Wireless bytes handed to the serial port
    pub bytes_to_serial: u64,
    /// Wireless writes issued (including retries)
    pub writes_issued: u64,
    /// Writes reissued after a failure or a congestion-cleared signal
    pub write_retries: u64,
    /// Times the link reported congestion
    pub congestion_events: u64,
    /// Serial bytes dropped because no peer was connected
    pub serial_bytes_dropped: u64,
    /// Session resets processed
    pub session_resets: u64,
    /// Completions that referred to a write from a previous session
    pub stale_completions: u64,
    /// Wireless write calls rejected synchronously
    pub link_errors: u64,
    /// Serial writes that failed
    pub serial_errors: u64,
}
