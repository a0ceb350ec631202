// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Normalized bridge events
//!
//! Transport adapters translate their driver callbacks into [`Event`]s and
//! enqueue them; the coordinator consumes each event exactly once. Byte
//! payloads are owned by the event and dropped after the coordinator is done
//! with them, on every path.

use std::fmt;

use uart_bridge_hal::SessionHandle;

/// Bridge event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Bytes read from the serial line
    SerialReceived { bytes: Vec<u8> },

    /// Bytes received from the wireless peer
    WirelessReceived { bytes: Vec<u8> },

    /// The last wireless write completed
    WriteSucceeded {
        bytes_written: usize,
        still_congested: bool,
    },

    /// The last wireless write failed, or congestion has cleared
    ///
    /// `due_to_congestion == false` doubles as the congestion-cleared signal:
    /// either way the link can take the buffer again.
    WriteFailed { due_to_congestion: bool },

    /// A peer connected (`Some`) or disconnected (`None`)
    SessionReset { new_handle: Option<SessionHandle> },
}

impl Event {
    /// The congestion-cleared signal
    pub fn congestion_cleared() -> Self {
        Event::WriteFailed {
            due_to_congestion: false,
        }
    }

    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SerialReceived { .. } => "serial-received",
            Event::WirelessReceived { .. } => "wireless-received",
            Event::WriteSucceeded { .. } => "write-succeeded",
            Event::WriteFailed { .. } => "write-failed",
            Event::SessionReset { .. } => "session-reset",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::SerialReceived { bytes } | Event::WirelessReceived { bytes } => {
                write!(f, "{} [{} bytes]", self.kind(), bytes.len())
            }
            Event::WriteSucceeded {
                bytes_written,
                still_congested,
            } => write!(
                f,
                "{} [{} bytes, congested={}]",
                self.kind(),
                bytes_written,
                still_congested
            ),
            Event::WriteFailed { due_to_congestion } => {
                write!(f, "{} [congestion={}]", self.kind(), due_to_congestion)
            }
            Event::SessionReset { new_handle } => match new_handle {
                Some(handle) => write!(f, "{} [handle={}]", self.kind(), handle),
                None => write!(f, "{} [disconnected]", self.kind()),
            },
        }
    }
}
