// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Growable FIFO byte store
//!
//! Holds the serial bytes that have not yet been acknowledged by the
//! wireless link. Bytes are appended at the back and released from the
//! front once a write completes.

/// Byte staging buffer
///
/// Invariant: `len() <= capacity()`. Growth is geometric: when a push does
/// not fit, capacity becomes `max(capacity + missing, capacity * 2)`.
/// Shrinking only happens by compaction on [`pop_front`](Self::pop_front);
/// the allocation itself is kept across [`clear`](Self::clear).
#[derive(Debug)]
pub struct StagingBuffer {
    data: Vec<u8>,
}

impl StagingBuffer {
    /// Create a buffer with `initial_capacity` bytes reserved (at least 1)
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(initial_capacity.max(1)),
        }
    }

    /// Bytes currently held
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes that fit without reallocating
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Contents, oldest byte first
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Append `bytes` at the back
    ///
    /// Allocation failure aborts the process: a partial push would lose
    /// bytes that are already acknowledged to the serial side.
    pub fn push(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let capacity = self.data.capacity();
        let available = capacity - self.data.len();
        if bytes.len() > available {
            let missing = bytes.len() - available;
            let new_capacity = (capacity + missing).max(capacity * 2);
            self.data.reserve_exact(new_capacity - self.data.len());
            tracing::debug!(
                "staging buffer grown [{} -> {} bytes]",
                capacity,
                self.data.capacity()
            );
        }

        self.data.extend_from_slice(bytes);
    }

    /// Release the `n` oldest bytes
    ///
    /// # Panics
    ///
    /// Panics if `n > len()`. Popping bytes that were never staged means
    /// the caller's accounting is broken.
    pub fn pop_front(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        assert!(
            n <= self.data.len(),
            "pop_front({}) on staging buffer holding {} bytes",
            n,
            self.data.len()
        );

        let remaining = self.data.len() - n;
        if remaining > 0 {
            self.data.copy_within(n.., 0);
        }
        self.data.truncate(remaining);
    }

    /// Drop all held bytes, keeping the allocation
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::with_capacity(crate::DEFAULT_STAGING_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let mut buf = StagingBuffer::with_capacity(8);
        buf.push(b"abc");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.as_slice(), b"abc");
        assert!(buf.capacity() >= 8);
    }

    #[test]
    fn test_growth_at_least_doubles() {
        let mut buf = StagingBuffer::with_capacity(4);
        let before = buf.capacity();
        buf.push(b"abcde");
        assert!(buf.capacity() >= before * 2);
        assert_eq!(buf.as_slice(), b"abcde");
    }

    #[test]
    fn test_growth_fits_large_push() {
        let mut buf = StagingBuffer::with_capacity(4);
        buf.push(b"ab");
        let payload = vec![7u8; 100];
        buf.push(&payload);
        assert_eq!(buf.len(), 102);
        assert!(buf.capacity() >= 102);
        assert_eq!(&buf.as_slice()[2..], payload.as_slice());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buf = StagingBuffer::with_capacity(0);
        assert!(buf.capacity() >= 1);
        buf.push(b"xyz");
        assert_eq!(buf.as_slice(), b"xyz");
    }

    #[test]
    fn test_pop_front_compacts() {
        let mut buf = StagingBuffer::with_capacity(16);
        buf.push(b"hello world");
        buf.pop_front(6);
        assert_eq!(buf.as_slice(), b"world");
        buf.pop_front(5);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_pop_zero_is_noop() {
        let mut buf = StagingBuffer::with_capacity(4);
        buf.push(b"ab");
        buf.pop_front(0);
        assert_eq!(buf.as_slice(), b"ab");

        let mut empty = StagingBuffer::with_capacity(4);
        empty.pop_front(0);
        assert!(empty.is_empty());
    }

    #[test]
    #[should_panic(expected = "pop_front(3)")]
    fn test_pop_past_end_panics() {
        let mut buf = StagingBuffer::with_capacity(4);
        buf.push(b"ab");
        buf.pop_front(3);
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut buf = StagingBuffer::with_capacity(4);
        buf.push(&[1u8; 64]);
        let capacity = buf.capacity();
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), capacity);
    }
}
