// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Wireless session adapter
//!
//! Wireless stacks report activity through callbacks on their own threads.
//! [`SessionAdapter`] turns those callbacks into bridge events:
//!
//! | Callback | Event |
//! |---|---|
//! | session opened | `SessionReset { Some(handle) }` |
//! | session closed | `SessionReset { None }` (once per open session) |
//! | data received | `WirelessReceived`, split to `max_inbound_size` |
//! | write completed | `WriteSucceeded` |
//! | write failed | `WriteFailed` |
//! | congestion cleared | `WriteFailed { due_to_congestion: false }`, only on a congested to clear edge |
//!
//! Inbound data is copied out of the stack's buffer before the callback
//! returns; the stack may reuse it immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uart_bridge_core::{Event, EventSender, QueueError};
use uart_bridge_hal::{PeerAddress, SessionHandle};

#[derive(Debug)]
struct AdapterState {
    session: Mutex<Option<(SessionHandle, PeerAddress)>>,
    congested: AtomicBool,
}

/// Callback sink for a wireless stack; cheap to clone into every stack thread
#[derive(Debug, Clone)]
pub struct SessionAdapter {
    events: EventSender,
    max_inbound_size: usize,
    state: Arc<AdapterState>,
}

impl SessionAdapter {
    pub fn new(events: EventSender, max_inbound_size: usize) -> Self {
        Self {
            events,
            max_inbound_size: max_inbound_size.max(1),
            state: Arc::new(AdapterState {
                session: Mutex::new(None),
                congested: AtomicBool::new(false),
            }),
        }
    }

    /// Largest payload carried by one `WirelessReceived` event
    pub fn max_inbound_size(&self) -> usize {
        self.max_inbound_size
    }

    /// Handle of the open session, if any
    pub fn current_session(&self) -> Option<SessionHandle> {
        self.state.session.lock().as_ref().map(|(handle, _)| *handle)
    }

    pub fn is_congested(&self) -> bool {
        self.state.congested.load(Ordering::Acquire)
    }

    /// A peer connected
    pub fn on_session_opened(
        &self,
        handle: SessionHandle,
        peer: PeerAddress,
    ) -> Result<(), QueueError> {
        {
            let mut session = self.state.session.lock();
            if let Some((previous, _)) = session.as_ref() {
                warn!(
                    "session {} opened while session {} was still open",
                    handle, previous
                );
            }
            info!("wireless session opened [handle={}, peer={}]", handle, peer);
            *session = Some((handle, peer));
            // A new session starts uncongested; pending clears from the old one are void
            self.state.congested.store(false, Ordering::Release);
        }
        self.events.send(Event::SessionReset {
            new_handle: Some(handle),
        })
    }

    /// The peer behind `handle` disconnected
    ///
    /// Ignored unless `handle` is the open session, so a close is reported
    /// once per session.
    pub fn on_session_closed(&self, handle: SessionHandle) -> Result<(), QueueError> {
        {
            let mut session = self.state.session.lock();
            match session.as_ref() {
                Some((current, peer)) if *current == handle => {
                    info!("wireless session closed [handle={}, peer={}]", handle, peer);
                    *session = None;
                }
                _ => {
                    debug!("ignoring close of inactive session {}", handle);
                    return Ok(());
                }
            }
            self.state.congested.store(false, Ordering::Release);
        }
        self.events.send(Event::SessionReset { new_handle: None })
    }

    /// Bytes arrived from the peer
    ///
    /// Copies `data` into one or more owned events of at most
    /// `max_inbound_size` bytes each.
    pub fn on_data(&self, data: &[u8]) -> Result<(), QueueError> {
        for chunk in data.chunks(self.max_inbound_size) {
            self.events.send(Event::WirelessReceived {
                bytes: chunk.to_vec(),
            })?;
        }
        Ok(())
    }

    /// A write finished; `congested` is the link's state afterwards
    pub fn on_write_complete(
        &self,
        bytes_written: usize,
        congested: bool,
    ) -> Result<(), QueueError> {
        if congested {
            self.state.congested.store(true, Ordering::Release);
        }
        self.events.send(Event::WriteSucceeded {
            bytes_written,
            still_congested: congested,
        })
    }

    /// A write failed outright
    pub fn on_write_failed(&self, due_to_congestion: bool) -> Result<(), QueueError> {
        if due_to_congestion {
            self.state.congested.store(true, Ordering::Release);
        }
        self.events.send(Event::WriteFailed { due_to_congestion })
    }

    /// The link's congestion state changed
    ///
    /// Only a congested to clear transition produces an event.
    pub fn on_congestion_changed(&self, congested: bool) -> Result<(), QueueError> {
        if congested {
            self.state.congested.store(true, Ordering::Release);
            return Ok(());
        }
        if self.state.congested.swap(false, Ordering::AcqRel) {
            debug!("wireless congestion cleared");
            self.events.send(Event::congestion_cleared())?;
        }
        Ok(())
    }
}
