// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

use uart_bridge_hal::SessionHandle;

/// Wireless session state as seen by the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current peer, `None` when disconnected
    pub handle: Option<SessionHandle>,

    /// The link cannot accept another write right now
    pub congested: bool,

    /// A write was issued and its completion has not been observed
    pub write_in_flight: bool,
}

impl SessionState {
    /// Start over for a newly connected (or departed) peer
    pub fn reset(&mut self, handle: Option<SessionHandle>) {
        *self = SessionState {
            handle,
            ..Default::default()
        };
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// The link can take a new write
    pub fn is_writable(&self) -> bool {
        self.handle.is_some() && !self.congested && !self.write_in_flight
    }
}
