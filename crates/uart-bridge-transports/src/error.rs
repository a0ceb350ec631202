// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Transport error type

use uart_bridge_core::QueueError;
use uart_bridge_hal::{LinkError, SerialError};

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while setting up or running a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device
    #[error("failed to open serial port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    /// Failed to bind the link's listening socket
    #[error("failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Serial(#[from] SerialError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
