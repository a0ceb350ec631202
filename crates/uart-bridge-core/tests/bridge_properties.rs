// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Flow-control properties of the bridge coordinator
//!
//! A scripted link plays the wireless side: it records every write, refuses
//! overlapping writes and writes issued while it reported congestion, and
//! acknowledges bytes only when the test says so.

use proptest::prelude::*;
use uart_bridge_core::{event_queue, Coordinator, CoordinatorConfig, Event, SessionHandle};
use uart_bridge_hal::{LinkError, SerialError, SerialIO, WirelessLink};

#[derive(Default)]
struct ScriptedLink {
    /// Bytes of the write currently in flight
    pending: Option<Vec<u8>>,
    /// The link last reported congestion and has not cleared it yet
    congested: bool,
    /// Bytes acknowledged so far, in order
    delivered: Vec<u8>,
    writes: usize,
}

impl WirelessLink for ScriptedLink {
    fn write(&mut self, _handle: SessionHandle, data: &[u8]) -> Result<(), LinkError> {
        assert!(self.pending.is_none(), "write issued while another is in flight");
        assert!(!self.congested, "write issued while the link is congested");
        self.pending = Some(data.to_vec());
        self.writes += 1;
        Ok(())
    }
}

#[derive(Default)]
struct NullSerial {
    written: Vec<u8>,
}

impl SerialIO for NullSerial {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        self.written.extend_from_slice(data);
        Ok(data.len())
    }

    fn read(&mut self, _buffer: &mut [u8]) -> Result<usize, SerialError> {
        Err(SerialError::Timeout)
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        Ok(())
    }
}

type Bridge = Coordinator<ScriptedLink, NullSerial>;

fn bridge() -> Bridge {
    let mut bridge = Coordinator::new(
        CoordinatorConfig {
            staging_capacity: 4,
            max_inbound_size: 64,
        },
        ScriptedLink::default(),
        NullSerial::default(),
    );
    bridge.handle_event(Event::SessionReset {
        new_handle: SessionHandle::new(1),
    });
    bridge
}

/// Acknowledge `n` bytes of the pending write (clamped to its length)
fn complete(bridge: &mut Bridge, n: usize, congested: bool) {
    let Some(pending) = bridge.link_mut().pending.take() else {
        return;
    };
    let n = n.min(pending.len());
    let link = bridge.link_mut();
    link.delivered.extend_from_slice(&pending[..n]);
    link.congested = congested;
    bridge.handle_event(Event::WriteSucceeded {
        bytes_written: n,
        still_congested: congested,
    });
}

fn clear_congestion(bridge: &mut Bridge) {
    if !bridge.link().congested {
        return;
    }
    bridge.link_mut().congested = false;
    bridge.handle_event(Event::congestion_cleared());
}

/// Let the link drain everything that is buffered
fn drain(bridge: &mut Bridge) {
    for _ in 0..10_000 {
        if bridge.link().congested {
            clear_congestion(bridge);
        } else if bridge.link().pending.is_some() {
            complete(bridge, usize::MAX, false);
        } else {
            return;
        }
    }
    panic!("bridge did not drain");
}

#[derive(Debug, Clone)]
enum Step {
    Serial(Vec<u8>),
    Complete { n: usize, congested: bool },
    Clear,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => prop::collection::vec(any::<u8>(), 1..12).prop_map(Step::Serial),
        3 => (0usize..16, any::<bool>()).prop_map(|(n, congested)| Step::Complete { n, congested }),
        1 => Just(Step::Clear),
    ]
}

proptest! {
    #[test]
    fn forwarded_bytes_preserve_arrival_order(steps in prop::collection::vec(step(), 1..64)) {
        let mut bridge = bridge();
        let mut received = Vec::new();

        for step in steps {
            match step {
                Step::Serial(bytes) => {
                    received.extend_from_slice(&bytes);
                    bridge.handle_event(Event::SerialReceived { bytes });
                }
                Step::Complete { n, congested } => complete(&mut bridge, n, congested),
                Step::Clear => clear_congestion(&mut bridge),
            }

            // Staged bytes are always the unacknowledged suffix of the input
            let link = bridge.link();
            prop_assert_eq!(link.delivered.len() + bridge.buffer().len(), received.len());
            prop_assert_eq!(bridge.buffer().as_slice(), &received[link.delivered.len()..]);
        }

        drain(&mut bridge);
        prop_assert_eq!(&bridge.link().delivered, &received);
        prop_assert!(bridge.buffer().is_empty());
        prop_assert_eq!(bridge.stats().bytes_to_wireless, received.len() as u64);
    }

    #[test]
    fn pop_accounting_matches_acknowledgements(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 1..8),
        ack in 0usize..64,
    ) {
        let mut bridge = bridge();
        for chunk in &chunks {
            bridge.handle_event(Event::SerialReceived { bytes: chunk.clone() });
        }

        let before = bridge.buffer().as_slice().to_vec();
        let in_flight = bridge.link().pending.as_ref().map_or(0, Vec::len);
        let n = ack.min(in_flight);
        complete(&mut bridge, n, true);

        prop_assert_eq!(bridge.buffer().len(), before.len() - n);
        prop_assert_eq!(bridge.buffer().as_slice(), &before[n..]);
    }

    #[test]
    fn reset_always_empties_buffer(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 0..8)) {
        let mut bridge = bridge();
        for chunk in chunks {
            bridge.handle_event(Event::SerialReceived { bytes: chunk });
        }
        bridge.handle_event(Event::SessionReset { new_handle: None });
        prop_assert_eq!(bridge.buffer().len(), 0);
        prop_assert!(bridge.session().handle.is_none());
    }
}

#[test]
fn scenario_idle_write_then_drained() {
    let mut bridge = bridge();
    bridge.handle_event(Event::SerialReceived {
        bytes: b"AB".to_vec(),
    });
    assert_eq!(bridge.link().pending.as_deref(), Some(&b"AB"[..]));

    complete(&mut bridge, 2, false);
    assert!(bridge.buffer().is_empty());
    assert!(bridge.link().pending.is_none());
    assert_eq!(bridge.link().writes, 1);
}

#[test]
fn scenario_congested_retry_reissues_buffer() {
    let mut bridge = bridge();
    bridge.handle_event(Event::SerialReceived {
        bytes: b"XYZ".to_vec(),
    });
    complete(&mut bridge, 0, true);
    assert!(bridge.session().congested);
    assert_eq!(bridge.buffer().as_slice(), b"XYZ");

    clear_congestion(&mut bridge);
    assert!(!bridge.session().congested);
    assert_eq!(bridge.link().pending.as_deref(), Some(&b"XYZ"[..]));
}

#[test]
fn scenario_no_session_releases_payload() {
    let mut bridge = bridge();
    bridge.handle_event(Event::SessionReset { new_handle: None });
    bridge.handle_event(Event::SerialReceived {
        bytes: b"Q".to_vec(),
    });
    assert!(bridge.buffer().is_empty());
    assert_eq!(bridge.link().writes, 0);
    assert_eq!(bridge.stats().serial_bytes_dropped, 1);
}

#[test]
fn coordinator_thread_stops_when_producers_drop() {
    let (tx, rx) = event_queue(4);
    let coordinator = Coordinator::new(
        CoordinatorConfig::default(),
        ScriptedLink::default(),
        NullSerial::default(),
    );
    let handle = coordinator.spawn(rx).unwrap();

    tx.send(Event::SessionReset {
        new_handle: SessionHandle::new(9),
    })
    .unwrap();
    tx.send(Event::SerialReceived {
        bytes: b"hi".to_vec(),
    })
    .unwrap();
    tx.send(Event::WirelessReceived {
        bytes: b"yo".to_vec(),
    })
    .unwrap();
    drop(tx);

    let stats = handle.join().unwrap();
    assert_eq!(stats.session_resets, 1);
    assert_eq!(stats.writes_issued, 1);
    assert_eq!(stats.bytes_to_serial, 2);
}
