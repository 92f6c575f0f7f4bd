//! Envelope state for one mail transaction.

use std::collections::VecDeque;

/// Sender, recipients and per-recipient outcome of one transaction.
///
/// Created by the caller with [`Envelope::new`] and handed to
/// [`Protocol::use_envelope`](crate::protocol::Protocol::use_envelope), which
/// owns it from then on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    from: String,
    to: Vec<String>,
    rcpt_queue: VecDeque<String>,
    cur_recipient: Option<String>,
    rcpt_failed: Vec<String>,
    response_queue: VecDeque<String>,
}

impl Envelope {
    /// Creates an envelope. An empty `from` is replaced by
    /// `anonymous@<client name>` when the transaction starts.
    #[must_use]
    pub fn new<I, S>(from: impl Into<String>, to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let to: Vec<String> = to.into_iter().map(Into::into).collect();
        Self {
            from: from.into(),
            rcpt_queue: to.iter().cloned().collect(),
            to,
            ..Self::default()
        }
    }

    /// Fills in the anonymous sender if none was given.
    pub(crate) fn default_sender(&mut self, client_name: &str) {
        if self.from.is_empty() {
            self.from = format!("anonymous@{client_name}");
        }
    }

    /// Sender address.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// All recipients as given by the caller.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Recipient whose `RCPT TO` reply is awaited.
    #[must_use]
    pub fn current_recipient(&self) -> Option<&str> {
        self.cur_recipient.as_deref()
    }

    /// Recipients rejected so far.
    #[must_use]
    pub fn rcpt_failed(&self) -> &[String] {
        &self.rcpt_failed
    }

    /// Recipients not yet offered with `RCPT TO`.
    #[must_use]
    pub fn pending_recipients(&self) -> usize {
        self.rcpt_queue.len()
    }

    /// Accepted recipients still waiting for their LMTP delivery status.
    #[must_use]
    pub fn awaiting_delivery(&self) -> usize {
        self.response_queue.len()
    }

    /// Moves the next queued recipient into the current slot.
    pub(crate) fn next_recipient(&mut self) -> Option<&str> {
        self.cur_recipient = self.rcpt_queue.pop_front();
        self.cur_recipient.as_deref()
    }

    /// Records the `RCPT TO` outcome for the current recipient.
    ///
    /// Accepted recipients are only queued for a delivery status in LMTP
    /// mode, where the server answers once per recipient after DATA.
    pub(crate) fn record_rcpt(&mut self, accepted: bool, lmtp: bool) -> Option<String> {
        let rcpt = self.cur_recipient.take()?;
        if !accepted {
            self.rcpt_failed.push(rcpt.clone());
        } else if lmtp {
            self.response_queue.push_back(rcpt.clone());
        }
        Some(rcpt)
    }

    /// True if at least one recipient survived `RCPT TO`.
    #[must_use]
    pub fn any_accepted(&self) -> bool {
        self.rcpt_failed.len() < self.to.len()
    }

    /// Consumes one LMTP delivery status.
    pub(crate) fn record_delivery(&mut self, delivered: bool) -> Option<String> {
        let rcpt = self.response_queue.pop_front()?;
        if !delivered {
            self.rcpt_failed.push(rcpt.clone());
        }
        Some(rcpt)
    }
}
