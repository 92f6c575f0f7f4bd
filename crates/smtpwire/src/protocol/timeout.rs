//! Idle timeout tracking.
//!
//! A single deadline represents "no progress for too long". The allowed
//! window grows with the number of bytes written so slow links get time to
//! drain large writes. While message data is streamed the window is
//! cumulative across all writes of the body.

use std::time::{Duration, Instant};

/// Default minimum window.
pub const DEFAULT_LOWER_BOUND: Duration = Duration::from_secs(10);

/// Default extra milliseconds granted per byte written (10 KB/s floor).
pub const DEFAULT_PER_BYTE_MS: f64 = 0.1;

/// Computes and holds the pending idle deadline.
#[derive(Debug, Clone)]
pub struct TimeoutManager {
    lower_bound: Duration,
    per_byte_ms: f64,
    start: Option<Instant>,
    period: Option<Duration>,
    deadline: Option<Instant>,
    /// Length of the window the pending deadline closes.
    window: Option<Duration>,
}

impl Default for TimeoutManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOWER_BOUND, DEFAULT_PER_BYTE_MS)
    }
}

impl TimeoutManager {
    /// Creates a manager with the given window parameters.
    #[must_use]
    pub const fn new(lower_bound: Duration, per_byte_ms: f64) -> Self {
        Self {
            lower_bound,
            per_byte_ms,
            start: None,
            period: None,
            deadline: None,
            window: None,
        }
    }

    /// Extra time granted for `byte_len` bytes.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn prolong_period(&self, byte_len: usize) -> Duration {
        let millis = (byte_len as f64 * self.per_byte_ms).floor().max(0.0);
        Duration::from_millis(millis as u64)
    }

    /// Re-arms the deadline after `byte_len` bytes were handed to the
    /// transport, replacing any pending deadline.
    pub fn on_send(&mut self, byte_len: usize, data_mode: bool, now: Instant) {
        let prolong = self.prolong_period(byte_len);

        let (armed_at, window) = if data_mode {
            let start = *self.start.get_or_insert(now);
            let period = self.period.unwrap_or(self.lower_bound) + prolong;
            self.period = Some(period);
            (start, period)
        } else {
            (now, self.lower_bound + prolong)
        };

        self.deadline = Some(armed_at + window);
        self.window = Some(window);
    }

    /// Forgets the cumulative data-mode window.
    pub fn end_data(&mut self) {
        self.start = None;
        self.period = None;
    }

    /// Clears the pending deadline (data was received).
    pub fn clear(&mut self) {
        self.deadline = None;
        self.window = None;
    }

    /// Returns the pending deadline, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if a deadline is armed and has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Returns the full window of the pending deadline.
    ///
    /// In data mode this is measured from the first body write, so it
    /// covers every byte of the body sent so far.
    #[must_use]
    pub const fn window(&self) -> Option<Duration> {
        self.window
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn command_mode_window() {
        let mut tm = TimeoutManager::default();
        let now = Instant::now();
        tm.on_send(1000, false, now);
        assert_eq!(tm.deadline(), Some(now + Duration::from_millis(10_100)));
    }

    #[test]
    fn command_mode_replaces_previous_deadline() {
        let mut tm = TimeoutManager::default();
        let t0 = Instant::now();
        tm.on_send(10, false, t0);
        let t1 = t0 + Duration::from_secs(5);
        tm.on_send(10, false, t1);
        assert_eq!(tm.deadline(), Some(t1 + Duration::from_millis(10_001)));
    }

    #[test]
    fn prolong_is_floored() {
        let tm = TimeoutManager::default();
        assert_eq!(tm.prolong_period(9), Duration::ZERO);
        assert_eq!(tm.prolong_period(19), Duration::from_millis(1));
        assert_eq!(tm.prolong_period(100_000), Duration::from_secs(10));
    }

    #[test]
    fn data_mode_window_is_cumulative() {
        let mut tm = TimeoutManager::new(Duration::from_millis(1000), 1.0);
        let start = Instant::now();
        tm.on_send(100, true, start);
        assert_eq!(tm.deadline(), Some(start + Duration::from_millis(1100)));

        // Later sends extend the window from the original start.
        let later = start + Duration::from_millis(500);
        tm.on_send(200, true, later);
        assert_eq!(tm.deadline(), Some(start + Duration::from_millis(1300)));
        assert_eq!(tm.window(), Some(Duration::from_millis(1300)));
    }

    #[test]
    fn end_data_resets_window() {
        let mut tm = TimeoutManager::new(Duration::from_millis(1000), 1.0);
        let start = Instant::now();
        tm.on_send(100, true, start);
        tm.end_data();

        let next = start + Duration::from_secs(60);
        tm.on_send(50, true, next);
        assert_eq!(tm.deadline(), Some(next + Duration::from_millis(1050)));
    }

    #[test]
    fn clear_and_expiry() {
        let mut tm = TimeoutManager::new(Duration::from_millis(100), 0.0);
        let now = Instant::now();
        assert!(!tm.is_expired(now));

        tm.on_send(1, false, now);
        assert!(!tm.is_expired(now));
        assert!(tm.is_expired(now + Duration::from_millis(100)));
        assert_eq!(tm.window(), Some(Duration::from_millis(100)));

        tm.clear();
        assert!(tm.deadline().is_none());
        assert!(tm.window().is_none());
        assert!(!tm.is_expired(now + Duration::from_secs(1)));
    }
}
