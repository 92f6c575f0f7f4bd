//! Output types of the protocol state machine.
//!
// Allow missing_const_for_fn since Vec methods aren't const in stable Rust.
#![allow(clippy::missing_const_for_fn)]

use crate::error::Error;

/// Data to transmit to the server.
///
/// The protocol layer produces these, and the I/O layer is responsible for
/// actually sending them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    /// Raw bytes to send to the server.
    pub data: Vec<u8>,
}

impl Transmit {
    /// Creates a new transmit from bytes.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the data as a string slice, if valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Returns the length of the data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the transmit is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Transmit {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Lifecycle events surfaced to the caller.
#[derive(Debug)]
pub enum ProtocolEvent {
    /// A fatal error; the connection is closed right after.
    Error(Error),
    /// Buffered message data has been written; more may be sent.
    Drain,
    /// The connection is closed. Emitted exactly once.
    Closed,
    /// Ready for a new transaction.
    Idle,
    /// DATA accepted; message data may now be streamed.
    Ready {
        /// Recipients rejected during RCPT TO.
        failed_recipients: Vec<String>,
    },
    /// Message delivery finished.
    Done {
        /// Whether the server accepted the message.
        success: bool,
    },
}

/// One step the I/O layer must carry out, in order.
#[derive(Debug)]
pub enum Output {
    /// Write bytes to the transport.
    Transmit(Transmit),
    /// Upgrade the transport to TLS before writing anything else.
    UpgradeTls,
    /// Close the transport, then report it with
    /// [`Protocol::handle_close`](super::Protocol::handle_close).
    Close,
    /// Deliver an event to the caller.
    Event(ProtocolEvent),
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_transmit_new() {
        let t = Transmit::new(b"QUIT\r\n".to_vec());
        assert_eq!(t.len(), 6);
        assert!(!t.is_empty());
        assert_eq!(t.as_str(), Some("QUIT\r\n"));
    }

    #[test]
    fn test_transmit_empty() {
        let t = Transmit::new(vec![]);
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_transmit_as_ref() {
        let t = Transmit::new(vec![1, 2, 3]);
        let slice: &[u8] = t.as_ref();
        assert_eq!(slice, &[1, 2, 3]);
    }
}
