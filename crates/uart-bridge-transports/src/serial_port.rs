// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! [`SerialIO`] backed by the `serialport` crate

use std::io::{self, Read, Write};

use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort, StopBits};
use tracing::{debug, info};
use uart_bridge_config::{Parity, SerialConfig};
use uart_bridge_hal::{SerialError, SerialIO};

use crate::error::{TransportError, TransportResult};

/// An open host serial port
///
/// Reads return [`SerialError::BufferFull`] when the driver holds more than
/// `rx_buffer_size` unread bytes, so the receiver can drop the backlog and
/// resynchronize.
pub struct SerialPortIo {
    port: Box<dyn SerialPort>,
    name: String,
    rx_buffer_size: usize,
}

fn data_bits(bits: u8) -> TransportResult<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(TransportError::InvalidConfig(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> TransportResult<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(TransportError::InvalidConfig(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

/// Map a `serialport` error onto the HAL error type
fn map_port_error(err: serialport::Error) -> SerialError {
    match err.kind {
        serialport::ErrorKind::NoDevice => SerialError::Disconnected,
        serialport::ErrorKind::Io(kind) => map_io_error(io::Error::new(kind, err.description)),
        _ => SerialError::Io(io::Error::new(io::ErrorKind::Other, err.description)),
    }
}

fn map_io_error(err: io::Error) -> SerialError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => SerialError::Timeout,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::NotFound => SerialError::Disconnected,
        _ => SerialError::Io(err),
    }
}

impl SerialPortIo {
    /// Open the port described by `config`
    pub fn open(config: &SerialConfig) -> TransportResult<Self> {
        let flow_control = if config.flow_control {
            FlowControl::Hardware
        } else {
            FlowControl::None
        };

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits)?)
            .flow_control(flow_control)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;

        info!(
            "opened serial port {} [{} baud, {}{}{}, flow control {}]",
            config.port,
            config.baud_rate,
            config.data_bits,
            match config.parity {
                Parity::None => 'N',
                Parity::Odd => 'O',
                Parity::Even => 'E',
            },
            config.stop_bits,
            if config.flow_control { "on" } else { "off" }
        );

        Ok(Self {
            port,
            name: config.port.clone(),
            rx_buffer_size: config.rx_buffer_size,
        })
    }

    /// A second handle to the same device
    ///
    /// The receiver reads through one handle while the coordinator writes
    /// through the other.
    pub fn try_clone(&self) -> TransportResult<Self> {
        let port = self.port.try_clone().map_err(map_port_error)?;
        Ok(Self {
            port,
            name: self.name.clone(),
            rx_buffer_size: self.rx_buffer_size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SerialIO for SerialPortIo {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        self.port.write(data).map_err(map_io_error)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SerialError> {
        let pending = self.bytes_available()?;
        if pending > self.rx_buffer_size {
            return Err(SerialError::BufferFull { pending });
        }
        self.port.read(buffer).map_err(map_io_error)
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        self.port.flush().map_err(map_io_error)
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        debug!("discarding pending input on {}", self.name);
        self.port.clear(ClearBuffer::Input).map_err(map_port_error)
    }

    fn bytes_available(&self) -> Result<usize, SerialError> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(map_port_error)
    }
}
