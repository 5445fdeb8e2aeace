//! Heartbeat Bookkeeping
//!
//! Tracks connection liveness signals. The server sends a single-byte binary
//! frame as a heartbeat; the client additionally sends an empty-payload ping
//! on a fixed interval and records pong receipts. Both clocks are wall-clock
//! timestamps so the host can compare them against its own time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Interval between client keep-alive pings.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(3);

/// Liveness timestamps shared between the connection loop and the host.
#[derive(Debug)]
pub struct HeartbeatState {
    last_beat: RwLock<DateTime<Utc>>,
    last_pong: RwLock<DateTime<Utc>>,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Create heartbeat state stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            last_beat: RwLock::new(now),
            last_pong: RwLock::new(now),
        }
    }

    /// Record a server heartbeat frame.
    pub fn record_beat(&self) {
        *self.last_beat.write() = Utc::now();
    }

    /// Record a pong receipt.
    pub fn record_pong(&self) {
        *self.last_pong.write() = Utc::now();
    }

    /// Wall-clock time of the last server heartbeat.
    #[must_use]
    pub fn last_beat_time(&self) -> DateTime<Utc> {
        *self.last_beat.read()
    }

    /// Wall-clock time of the last pong receipt.
    #[must_use]
    pub fn last_pong_time(&self) -> DateTime<Utc> {
        *self.last_pong.read()
    }

    /// Restamp both clocks for a fresh connection epoch.
    ///
    /// A stale pong time from a previous epoch would otherwise read as an
    /// immediately dead connection.
    pub fn reset(&self) {
        let now = Utc::now();
        *self.last_beat.write() = now;
        *self.last_pong.write() = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_advances_monotonically() {
        let state = HeartbeatState::new();
        let before = state.last_beat_time();

        std::thread::sleep(Duration::from_millis(5));
        state.record_beat();

        assert!(state.last_beat_time() > before);
    }

    #[test]
    fn pong_tracked_independently_of_beat() {
        let state = HeartbeatState::new();
        let beat_before = state.last_beat_time();

        std::thread::sleep(Duration::from_millis(5));
        state.record_pong();

        assert_eq!(state.last_beat_time(), beat_before);
        assert!(state.last_pong_time() > beat_before);
    }

    #[test]
    fn reset_restamps_both_clocks() {
        let state = HeartbeatState::new();
        let before = state.last_beat_time();

        std::thread::sleep(Duration::from_millis(5));
        state.reset();

        assert!(state.last_beat_time() > before);
        assert!(state.last_pong_time() > before);
    }
}
