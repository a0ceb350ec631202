// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! # uart-bridge-transports
//!
//! Everything that turns driver activity into bridge events:
//!
//! - [`SerialReceiver`]: reads the serial line on its own thread and enqueues
//!   `SerialReceived` events, resynchronizing after receive overflows.
//! - [`SessionAdapter`]: normalizes wireless session callbacks (open, close,
//!   data, write completion, congestion) into events.
//! - [`SerialPortIo`]: [`SerialIO`](uart_bridge_hal::SerialIO) over the
//!   `serialport` crate.
//! - [`StreamLink`]: a TCP stand-in for the wireless link, one peer at a time.
//!
//! Producers only ever enqueue; the coordinator owns all bridge state.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod serial_port;
pub mod serial_receiver;
pub mod session_adapter;
pub mod stream_link;

pub use error::{TransportError, TransportResult};
pub use serial_port::SerialPortIo;
pub use serial_receiver::{receive_loop, ReceiverStats, SerialReceiver, StopReason};
pub use session_adapter::SessionAdapter;
pub use stream_link::{StreamLink, StreamLinkConfig, StreamLinkService};
