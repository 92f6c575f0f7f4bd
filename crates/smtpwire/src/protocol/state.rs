//! Protocol state types.

/// What the client expects the next server reply to be.
///
/// Each variant names the step whose reply is awaited; the protocol
/// dispatches every parsed reply through a single `match` on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Transport not open yet.
    #[default]
    Connecting,
    /// Waiting for the `220` greeting.
    Greeting,
    /// LHLO sent (LMTP).
    Lhlo,
    /// EHLO sent.
    Ehlo,
    /// HELO sent after EHLO was refused.
    Helo,
    /// STARTTLS sent.
    StartTls,
    /// `AUTH LOGIN` sent, waiting for the username challenge.
    AuthLoginUser,
    /// Username sent, waiting for the password challenge.
    AuthLoginPass,
    /// `AUTH XOAUTH2` sent.
    AuthXOAuth2,
    /// Final authentication step sent.
    AuthComplete,
    /// Ready for a new transaction (or streaming message data).
    Idle,
    /// MAIL FROM sent.
    Mail,
    /// RCPT TO sent.
    Rcpt,
    /// DATA sent.
    Data,
    /// Message terminator sent, waiting for the delivery status.
    Stream,
    /// RSET sent.
    Rset,
    /// QUIT sent; whatever comes back closes the connection.
    Quit,
    /// Connection closed.
    Closed,
}

impl State {
    /// Returns true while a reply to an authentication step is awaited.
    #[must_use]
    pub const fn is_authenticating(self) -> bool {
        matches!(
            self,
            Self::AuthLoginUser | Self::AuthLoginPass | Self::AuthXOAuth2 | Self::AuthComplete
        )
    }

    /// Returns true while a mail transaction is being negotiated.
    #[must_use]
    pub const fn in_transaction(self) -> bool {
        matches!(self, Self::Mail | Self::Rcpt | Self::Data | Self::Stream)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        assert_eq!(State::default(), State::Connecting);
    }

    #[test]
    fn test_is_authenticating() {
        assert!(State::AuthLoginUser.is_authenticating());
        assert!(State::AuthComplete.is_authenticating());
        assert!(!State::Ehlo.is_authenticating());
        assert!(!State::Idle.is_authenticating());
    }

    #[test]
    fn test_in_transaction() {
        assert!(State::Mail.in_transaction());
        assert!(State::Stream.in_transaction());
        assert!(!State::Idle.in_transaction());
        assert!(!State::Quit.in_transaction());
    }
}
