// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded ordered event queue
//!
//! Every producer (serial receiver, session adapter) holds an
//! [`EventSender`]; the coordinator holds the single [`EventReceiver`].
//!
//! # Backpressure
//! - `send()` blocks while the queue is full; events are never dropped
//! - `send()` fails only once the receiving side is gone

use crossbeam::channel::{self, Receiver, RecvError, Sender};

use crate::event::Event;

/// Queue errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The coordinator dropped its receiver
    #[error("event queue closed ({0} dropped)")]
    Closed(&'static str),
}

/// Producer handle
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

/// Consumer handle, owned by the coordinator
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<Event>,
}

/// Create the event queue with the given capacity
///
/// # Arguments
/// - `capacity`: Maximum number of events that can be queued (at least 1)
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = channel::bounded(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Enqueue `event`, waiting for room if the queue is full
    pub fn send(&self, event: Event) -> Result<(), QueueError> {
        let kind = event.kind();
        self.tx.send(event).map_err(|_| QueueError::Closed(kind))
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_sender(&self.tx)
    }
}

impl EventReceiver {
    /// Wait for the next event. `None` once every sender is dropped and the
    /// queue is drained.
    pub fn recv(&self) -> Option<Event> {
        match self.rx.recv() {
            Ok(event) => Some(event),
            Err(RecvError) => None,
        }
    }

    /// Non-blocking receive
    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Iterator for EventReceiver {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.recv()
    }
}

/// Statistics for monitoring queue health
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub capacity: usize,
    pub len: usize,
    pub is_full: bool,
    pub is_empty: bool,
}

impl QueueStats {
    fn from_sender(sender: &Sender<Event>) -> Self {
        Self {
            capacity: sender.capacity().unwrap_or(0),
            len: sender.len(),
            is_full: sender.is_full(),
            is_empty: sender.is_empty(),
        }
    }

    /// Calculate utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f64 / self.capacity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = event_queue(4);
        tx.send(Event::SerialReceived { bytes: vec![1] }).unwrap();
        tx.send(Event::SerialReceived { bytes: vec![2] }).unwrap();

        assert_eq!(rx.recv(), Some(Event::SerialReceived { bytes: vec![1] }));
        assert_eq!(rx.recv(), Some(Event::SerialReceived { bytes: vec![2] }));
    }

    #[test]
    fn test_send_blocks_when_full() {
        let (tx, rx) = event_queue(1);
        tx.send(Event::congestion_cleared()).unwrap();
        assert!(tx.stats().is_full);

        let producer = thread::spawn(move || {
            // Blocks until the consumer makes room
            tx.send(Event::SessionReset { new_handle: None }).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(rx.recv(), Some(Event::congestion_cleared()));
        producer.join().unwrap();
        assert_eq!(rx.recv(), Some(Event::SessionReset { new_handle: None }));
    }

    #[test]
    fn test_closed_queue() {
        let (tx, rx) = event_queue(2);
        drop(rx);
        let err = tx.send(Event::congestion_cleared()).unwrap_err();
        assert_eq!(err.to_string(), "event queue closed (write-failed dropped)");
    }

    #[test]
    fn test_receiver_ends_when_senders_drop() {
        let (tx, rx) = event_queue(2);
        let second = tx.clone();
        second.send(Event::congestion_cleared()).unwrap();
        drop(tx);
        drop(second);

        assert_eq!(rx.recv(), Some(Event::congestion_cleared()));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_queue_stats() {
        let (tx, _rx) = event_queue(10);
        let stats = tx.stats();
        assert_eq!(stats.capacity, 10);
        assert_eq!(stats.len, 0);
        assert!(stats.is_empty);
        assert!(!stats.is_full);
        assert_eq!(stats.utilization(), 0.0);

        tx.send(Event::congestion_cleared()).unwrap();
        assert_eq!(tx.stats().utilization(), 0.1);
    }
}
