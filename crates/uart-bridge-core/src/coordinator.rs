// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Bridge coordinator
//!
//! The coordinator is the single consumer of the event queue and the only
//! owner of the staging buffer and the session state. Adapters run on their
//! own threads and talk to it exclusively through events, so none of this
//! state is shared or locked.
//!
//! ## Flow-control policy
//!
//! ```text
//! SerialReceived ──► no session? drop
//!                    idle (empty, not congested)? push + write whole buffer
//!                    otherwise push only
//! WriteSucceeded ──► pop n, record congestion, keep writing if clear
//! WriteFailed    ──► congestion: wait for the cleared signal
//!                    otherwise: retry the whole buffer once
//! SessionReset   ──► clear buffer, adopt new handle
//! ```
//!
//! Writes are fire-and-forget: the link copies the bytes before returning,
//! and the outcome comes back later as a `WriteSucceeded`/`WriteFailed`
//! event. Because only this loop issues writes, and it only writes when no
//! completion is outstanding, at most one write is ever in flight.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace, warn};
use uart_bridge_hal::{SerialIO, SessionHandle, WirelessLink};

use crate::buffer::StagingBuffer;
use crate::event::Event;
use crate::queue::EventReceiver;
use crate::session::SessionState;
use crate::stats::BridgeStats;

/// Coordinator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Initial staging buffer capacity in bytes
    pub staging_capacity: usize,
    /// Largest wireless payload accepted per `WirelessReceived` event
    pub max_inbound_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            staging_capacity: crate::DEFAULT_STAGING_CAPACITY,
            max_inbound_size: crate::DEFAULT_MAX_INBOUND_SIZE,
        }
    }
}

/// Single-threaded bridge state machine
pub struct Coordinator<L, S> {
    buffer: StagingBuffer,
    session: SessionState,
    link: L,
    serial: S,
    max_inbound_size: usize,
    stats: BridgeStats,
}

impl<L, S> Coordinator<L, S>
where
    L: WirelessLink,
    S: SerialIO,
{
    pub fn new(config: CoordinatorConfig, link: L, serial: S) -> Self {
        Self {
            buffer: StagingBuffer::with_capacity(config.staging_capacity),
            session: SessionState::default(),
            link,
            serial,
            max_inbound_size: config.max_inbound_size,
            stats: BridgeStats::default(),
        }
    }

    pub fn buffer(&self) -> &StagingBuffer {
        &self.buffer
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Process events until every producer is gone
    ///
    /// Blocks on the queue whenever it is empty. Returns the final counters.
    pub fn run(mut self, queue: EventReceiver) -> BridgeStats {
        info!(
            "bridge coordinator started [staging capacity {} bytes, max inbound {} bytes]",
            self.buffer.capacity(),
            self.max_inbound_size
        );

        while let Some(event) = queue.recv() {
            self.handle_event(event);
        }

        info!("event queue closed, coordinator stopping: {:?}", self.stats);
        self.stats
    }

    /// Apply one event to the bridge state
    pub fn handle_event(&mut self, event: Event) {
        trace!("handling {}", event);
        match event {
            Event::SerialReceived { bytes } => self.on_serial_received(bytes),
            Event::WirelessReceived { bytes } => self.on_wireless_received(bytes),
            Event::WriteSucceeded {
                bytes_written,
                still_congested,
            } => self.on_write_succeeded(bytes_written, still_congested),
            Event::WriteFailed { due_to_congestion } => self.on_write_failed(due_to_congestion),
            Event::SessionReset { new_handle } => self.on_session_reset(new_handle),
        }
    }

    fn on_serial_received(&mut self, bytes: Vec<u8>) {
        let Some(handle) = self.session.handle else {
            self.stats.serial_bytes_dropped += bytes.len() as u64;
            debug!("no wireless session, dropping serial data [{} bytes]", bytes.len());
            return;
        };

        debug!(
            "received serial data [{} bytes - {} buffered]",
            bytes.len(),
            self.buffer.len()
        );

        // Evaluated before the push: only an idle link starts a new write.
        let was_idle =
            self.buffer.is_empty() && !self.session.congested && !self.session.write_in_flight;
        self.buffer.push(&bytes);

        if was_idle {
            self.write_buffer(handle);
        }
    }

    fn on_wireless_received(&mut self, bytes: Vec<u8>) {
        assert!(
            bytes.len() <= self.max_inbound_size,
            "wireless payload of {} bytes exceeds the {} byte inbound limit",
            bytes.len(),
            self.max_inbound_size
        );

        debug!("received wireless data [{} bytes]", bytes.len());

        let mut remaining = bytes.as_slice();
        while !remaining.is_empty() {
            match self.serial.write(remaining) {
                Ok(0) => {
                    self.stats.serial_errors += 1;
                    error!(
                        "serial port accepted 0 bytes, dropping {} of {} wireless bytes",
                        remaining.len(),
                        bytes.len()
                    );
                    return;
                }
                Ok(written) => {
                    self.stats.bytes_to_serial += written as u64;
                    remaining = &remaining[written..];
                }
                Err(e) => {
                    self.stats.serial_errors += 1;
                    error!(
                        "serial write failed, dropping {} of {} wireless bytes: {}",
                        remaining.len(),
                        bytes.len(),
                        e
                    );
                    return;
                }
            }
        }
    }

    fn on_write_succeeded(&mut self, bytes_written: usize, still_congested: bool) {
        if !self.session.write_in_flight {
            // The write belonged to a session that has since been reset.
            self.stats.stale_completions += 1;
            warn!(
                "ignoring write completion with no write in flight [{} bytes, handle={:?}, buffered={}]",
                bytes_written, self.session.handle, self.buffer.len()
            );
            return;
        }
        self.session.write_in_flight = false;

        assert!(
            !self.buffer.is_empty()
                && bytes_written <= self.buffer.len()
                && !self.session.congested,
            "write completion of {} bytes does not match bridge state [buffered={}, congested={}]",
            bytes_written,
            self.buffer.len(),
            self.session.congested
        );

        debug!(
            "successful wireless write [{} bytes - {} left]",
            bytes_written,
            self.buffer.len() - bytes_written
        );

        self.buffer.pop_front(bytes_written);
        self.stats.bytes_to_wireless += bytes_written as u64;

        self.session.congested = still_congested;
        if still_congested {
            self.stats.congestion_events += 1;
            warn!(
                "wireless link congested [{} bytes buffered, handle={:?}]",
                self.buffer.len(),
                self.session.handle
            );
            return;
        }

        if !self.buffer.is_empty() {
            if let Some(handle) = self.session.handle {
                debug!("continuing wireless write [{} bytes]", self.buffer.len());
                self.write_buffer(handle);
            }
        }
    }

    fn on_write_failed(&mut self, due_to_congestion: bool) {
        self.session.write_in_flight = false;

        if due_to_congestion {
            if !self.session.congested {
                self.stats.congestion_events += 1;
            }
            self.session.congested = true;
            warn!(
                "wireless write failed due to congestion, waiting for it to clear [{} bytes buffered, handle={:?}]",
                self.buffer.len(),
                self.session.handle
            );
            return;
        }

        // Either a transient failure or congestion is over: the link can
        // take the buffer again.
        self.session.congested = false;

        if self.buffer.is_empty() {
            debug!("write-again signal with nothing buffered");
            return;
        }

        let Some(handle) = self.session.handle else {
            debug!(
                "write-again signal without a session [{} bytes buffered]",
                self.buffer.len()
            );
            return;
        };

        warn!(
            "retrying wireless write [{} bytes, handle={}]",
            self.buffer.len(),
            handle
        );
        self.stats.write_retries += 1;
        self.write_buffer(handle);
    }

    fn on_session_reset(&mut self, new_handle: Option<SessionHandle>) {
        if !self.buffer.is_empty() {
            warn!(
                "cleared staging buffer [{} bytes, handle={:?} -> {:?}]",
                self.buffer.len(),
                self.session.handle,
                new_handle
            );
        }

        self.buffer.clear();
        self.session.reset(new_handle);
        self.stats.session_resets += 1;

        match new_handle {
            Some(handle) => info!("wireless session opened [handle={}]", handle),
            None => info!("wireless session closed"),
        }
    }

    /// Issue a write of the buffered bytes
    fn write_buffer(&mut self, handle: SessionHandle) {
        debug_assert!(!self.session.write_in_flight, "overlapping wireless write");

        let data = match self.link.max_write_size() {
            Some(max) if max < self.buffer.len() => &self.buffer.as_slice()[..max],
            _ => self.buffer.as_slice(),
        };

        match self.link.write(handle, data) {
            Ok(()) => {
                self.session.write_in_flight = true;
                self.stats.writes_issued += 1;
            }
            Err(e) => {
                self.stats.link_errors += 1;
                error!(
                    "wireless write of {} bytes failed: {} [handle={}, congested={}, buffered={}]",
                    data.len(),
                    e,
                    handle,
                    self.session.congested,
                    self.buffer.len()
                );
            }
        }
    }
}

impl<L, S> Coordinator<L, S>
where
    L: WirelessLink + Send + 'static,
    S: SerialIO + Send + 'static,
{
    /// Run the coordinator on a dedicated thread
    pub fn spawn(self, queue: EventReceiver) -> io::Result<JoinHandle<BridgeStats>> {
        thread::Builder::new()
            .name("bridge-coordinator".to_string())
            .spawn(move || self.run(queue))
    }
}
