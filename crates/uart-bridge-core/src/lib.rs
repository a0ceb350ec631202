// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! # uart-bridge-core
//!
//! The bridging core: a single coordinating loop that owns a growable
//! staging buffer, tracks whether the wireless side can accept more data,
//! and decides when to (re)issue a write versus wait.
//!
//! ## Architecture
//!
//! ```text
//!  serial receiver ──┐
//!                    ├──► bounded event queue ──► Coordinator ──► WirelessLink::write
//!  session adapter ──┘                               │
//!                                                    └──────────► SerialIO::write
//! ```
//!
//! Producers only enqueue [`Event`]s. The [`Coordinator`] is the sole reader
//! of the queue and the sole owner of [`StagingBuffer`] and [`SessionState`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default staging buffer size, also the nominal serial chunk size
pub const DEFAULT_STAGING_CAPACITY: usize = 1024;

/// Default event queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Default limit for a single inbound wireless payload
pub const DEFAULT_MAX_INBOUND_SIZE: usize = 1024;

pub mod buffer;
pub mod coordinator;
pub mod event;
pub mod queue;
pub mod session;
pub mod stats;

pub use buffer::StagingBuffer;
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use event::Event;
pub use queue::{event_queue, EventReceiver, EventSender, QueueError, QueueStats};
pub use session::SessionState;
pub use stats::BridgeStats;

pub use uart_bridge_hal::SessionHandle;
