// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU32;

/// Opaque identifier of the currently connected wireless peer
///
/// Handles are never zero; "no peer" is `Option::<SessionHandle>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(NonZeroU32);

impl SessionHandle {
    /// Wrap a raw handle. Returns `None` for the zero sentinel.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(SessionHandle)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote end of a session, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PeerAddress {
    Socket(SocketAddr),
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAddress::Socket(addr) => write!(f, "sock:[{}]", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_handle_is_absent() {
        assert!(SessionHandle::new(0).is_none());
        assert_eq!(SessionHandle::new(129).map(SessionHandle::get), Some(129));
    }

    #[test]
    fn test_socket_peer_format() {
        let peer = PeerAddress::Socket("127.0.0.1:4000".parse().unwrap());
        assert_eq!(peer.to_string(), "sock:[127.0.0.1:4000]");
    }
}
