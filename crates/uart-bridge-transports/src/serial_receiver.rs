// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Serial receive thread
//!
//! Reads the serial line in chunks of at most `chunk_size` bytes and hands
//! each chunk to the coordinator as an owned `SerialReceived` event. A
//! receive overflow discards whatever the driver still holds and starts over
//! with a clean chunk; the event queue itself is never touched.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};
use uart_bridge_core::{Event, EventSender};
use uart_bridge_hal::{SerialError, SerialIO};

/// Pause after an unexpected I/O error before reading again
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Counters reported when the receiver stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub chunks: u64,
    pub bytes: u64,
    pub overflows: u64,
    pub io_errors: u64,
    /// Chunks that had to wait for room in the event queue
    pub queue_stalls: u64,
}

/// Why the receive loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    QueueClosed,
    Disconnected,
}

/// Handle to the serial receive thread
///
/// Stops and joins the thread on drop.
pub struct SerialReceiver {
    handle: Option<JoinHandle<ReceiverStats>>,
    shutdown: Arc<AtomicBool>,
}

impl SerialReceiver {
    /// Spawn the receive thread
    ///
    /// The serial backend must time out reads (see [`SerialIO::read`]) so the
    /// thread can notice [`stop`](Self::stop).
    pub fn spawn<S>(serial: S, chunk_size: usize, events: EventSender) -> io::Result<Self>
    where
        S: SerialIO + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("serial-receiver".to_string())
            .spawn(move || {
                let mut serial = serial;
                let mut stats = ReceiverStats::default();
                let reason =
                    receive_loop(&mut serial, chunk_size, &events, &shutdown_clone, &mut stats);
                info!(
                    "serial receiver stopped ({:?}) [{} chunks, {} bytes, {} overflows, {} queue stalls]",
                    reason, stats.chunks, stats.bytes, stats.overflows, stats.queue_stalls
                );
                stats
            })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Signal the thread to stop and wait for it
    ///
    /// Returns the receiver's counters the first time it is called.
    pub fn stop(&mut self) -> Option<ReceiverStats> {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("serial receiver thread panicked: {:?}", e);
                None
            }
        }
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SerialReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read chunks from `serial` and enqueue them until shut down
///
/// Runs on the caller's thread; [`SerialReceiver::spawn`] wraps it.
pub fn receive_loop<S: SerialIO + ?Sized>(
    serial: &mut S,
    chunk_size: usize,
    events: &EventSender,
    shutdown: &AtomicBool,
    stats: &mut ReceiverStats,
) -> StopReason {
    let mut chunk = vec![0u8; chunk_size.max(1)];

    while !shutdown.load(Ordering::Relaxed) {
        match serial.read(&mut chunk) {
            Ok(0) | Err(SerialError::Timeout) => continue,
            Ok(n) => {
                stats.chunks += 1;
                stats.bytes += n as u64;
                trace!("serial chunk received [{} bytes]", n);
                let queue = events.stats();
                if queue.is_full {
                    stats.queue_stalls += 1;
                    debug!(
                        "event queue full [{}/{} events, {:.0}% used], waiting for the coordinator",
                        queue.len,
                        queue.capacity,
                        queue.utilization() * 100.0
                    );
                }
                if events
                    .send(Event::SerialReceived {
                        bytes: chunk[..n].to_vec(),
                    })
                    .is_err()
                {
                    return StopReason::QueueClosed;
                }
            }
            Err(e) if e.is_overflow() => {
                stats.overflows += 1;
                warn!("serial receive overflow, discarding pending input: {}", e);
                if let Err(e) = serial.discard_input() {
                    error!("failed to discard serial input: {}", e);
                }
            }
            Err(SerialError::Disconnected) => {
                error!("serial device disconnected");
                return StopReason::Disconnected;
            }
            Err(e) => {
                stats.io_errors += 1;
                warn!("serial read failed: {}", e);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    debug!("serial receiver shutting down");
    StopReason::Shutdown
}
