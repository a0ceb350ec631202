// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

/// Serial driver errors
///
/// `Overflow` and `BufferFull` are the two hardware conditions that make the
/// receiver discard pending input and resynchronize.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// Hardware receive FIFO overflowed; bytes were lost by the driver
    #[error("serial receive FIFO overflow")]
    Overflow,

    /// Driver ring buffer is full
    #[error("serial receive buffer full ({pending} bytes pending)")]
    BufferFull { pending: usize },

    /// Read returned without data inside the configured timeout
    #[error("serial read timed out")]
    Timeout,

    /// The device went away
    #[error("serial device disconnected")]
    Disconnected,

    /// Any other I/O failure
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerialError {
    /// True for the conditions that require a flush-and-resync
    pub fn is_overflow(&self) -> bool {
        matches!(self, SerialError::Overflow | SerialError::BufferFull { .. })
    }
}

/// Serial I/O abstraction
pub trait SerialIO {
    /// Write bytes to serial port
    ///
    /// # Arguments
    /// * `data` - Bytes to write
    ///
    /// # Returns
    /// Number of bytes written or error
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError>;

    /// Read bytes from serial port
    ///
    /// Blocks for at most the backend's read timeout. `Err(SerialError::Timeout)`
    /// or `Ok(0)` both mean "nothing arrived".
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SerialError>;

    /// Flush output buffer
    fn flush(&mut self) -> Result<(), SerialError>;

    /// Drop everything the driver has buffered on the receive side
    fn discard_input(&mut self) -> Result<(), SerialError>;

    /// Number of bytes waiting in the driver
    fn bytes_available(&self) -> Result<usize, SerialError> {
        // Default implementation - backends can override
        Ok(0)
    }
}

impl<T: SerialIO + ?Sized> SerialIO for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        (**self).write(data)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read(buffer)
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        (**self).discard_input()
    }

    fn bytes_available(&self) -> Result<usize, SerialError> {
        (**self).bytes_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSerial {
        tx: heapless::Vec<u8, 64>,
        rx: heapless::Vec<u8, 64>,
    }

    impl SerialIO for MockSerial {
        fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
            self.tx
                .extend_from_slice(data)
                .map_err(|_| SerialError::BufferFull { pending: self.tx.len() })?;
            Ok(data.len())
        }

        fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SerialError> {
            if self.rx.is_empty() {
                return Err(SerialError::Timeout);
            }
            let len = self.rx.len().min(buffer.len());
            buffer[..len].copy_from_slice(&self.rx[..len]);
            self.rx.clear();
            Ok(len)
        }

        fn flush(&mut self) -> Result<(), SerialError> {
            Ok(())
        }

        fn discard_input(&mut self) -> Result<(), SerialError> {
            self.rx.clear();
            Ok(())
        }
    }

    #[test]
    fn test_overflow_classification() {
        assert!(SerialError::Overflow.is_overflow());
        assert!(SerialError::BufferFull { pending: 10 }.is_overflow());
        assert!(!SerialError::Timeout.is_overflow());
        assert!(!SerialError::Disconnected.is_overflow());
    }

    #[test]
    fn test_boxed_serial_delegates() {
        let mut serial: Box<dyn SerialIO> = Box::new(MockSerial {
            tx: heapless::Vec::new(),
            rx: heapless::Vec::from_slice(b"ping").unwrap(),
        });

        assert_eq!(serial.write(b"abc").unwrap(), 3);
        assert_eq!(serial.bytes_available().unwrap(), 0);

        let mut buf = [0u8; 8];
        assert_eq!(serial.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"ping");
        assert!(matches!(serial.read(&mut buf), Err(SerialError::Timeout)));
    }

    #[test]
    fn test_discard_input_drops_pending_bytes() {
        let mut serial = MockSerial {
            tx: heapless::Vec::new(),
            rx: heapless::Vec::from_slice(b"garbage").unwrap(),
        };
        serial.discard_input().unwrap();

        let mut buf = [0u8; 8];
        assert!(matches!(serial.read(&mut buf), Err(SerialError::Timeout)));
    }
}
