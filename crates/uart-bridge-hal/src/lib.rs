// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Transport seams for the serial <-> wireless bridge
//!
//! This crate defines the platform-agnostic traits the bridge core talks to:
//! - Serial I/O (`SerialIO`)
//! - Wireless link writes (`WirelessLink`)
//! - Session identity (`SessionHandle`, `PeerAddress`)
//!
//! Platform backends (a host serial port, a socket stand-in for the radio,
//! an RTOS driver) implement these traits; the coordinator never sees more
//! than this surface.

/// Serial input/output traits for UART-style communication.
pub mod serial;
/// Session identity types shared by the link and the coordinator.
pub mod session;
/// Wireless link write trait.
pub mod wireless;

pub use serial::{SerialError, SerialIO};
pub use session::{PeerAddress, SessionHandle};
pub use wireless::{LinkError, WirelessLink};
