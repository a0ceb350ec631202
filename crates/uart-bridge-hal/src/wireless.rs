// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Wireless link write seam
//!
//! The coordinator issues writes through [`WirelessLink`] and learns about
//! their outcome later, as events delivered by the session adapter.
//!
//! ## Contract
//!
//! - `write` copies `data` before returning. The caller may mutate or drop
//!   its buffer immediately afterwards.
//! - `write` never blocks waiting for the peer. Completion (bytes written,
//!   congestion flag) is reported exactly once per accepted write.
//! - At most one write is in flight per session. The coordinator guarantees
//!   this; implementations may reject a second write with
//!   [`LinkError::WriteInFlight`].

use crate::session::SessionHandle;

/// Errors returned synchronously by [`WirelessLink::write`]
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No peer is connected
    #[error("no active wireless session")]
    NoSession,

    /// The handle does not belong to the active session
    #[error("stale session handle {got} (active: {expected})")]
    StaleHandle {
        expected: SessionHandle,
        got: SessionHandle,
    },

    /// A previous write has not completed yet
    #[error("a write is already in flight")]
    WriteInFlight,

    /// The link was shut down
    #[error("wireless link closed")]
    Closed,

    /// Underlying I/O failure
    #[error("wireless link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fire-and-forget writes to the connected wireless peer
pub trait WirelessLink {
    /// Queue `data` for transmission to the peer identified by `handle`
    ///
    /// # Errors
    ///
    /// Returns an error if the write could not be queued at all. In that
    /// case no completion will be reported for it.
    fn write(&mut self, handle: SessionHandle, data: &[u8]) -> Result<(), LinkError>;

    /// Largest payload a single write accepts (`None` = unbounded)
    fn max_write_size(&self) -> Option<usize> {
        None
    }
}

impl<T: WirelessLink + ?Sized> WirelessLink for Box<T> {
    fn write(&mut self, handle: SessionHandle, data: &[u8]) -> Result<(), LinkError> {
        (**self).write(handle, data)
    }

    fn max_write_size(&self) -> Option<usize> {
        (**self).max_write_size()
    }
}
