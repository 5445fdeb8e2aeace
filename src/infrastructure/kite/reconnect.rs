//! Reconnection Policy
//!
//! Exponential backoff for WebSocket reconnection. The delay doubles after
//! every attempt up to a configured ceiling, and the attempt counter is
//! reset only by a successful connection open.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Ceiling on the delay between attempts.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub multiplier: f64,
    /// Maximum number of attempts before giving up (0 = unlimited).
    pub max_tries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_tries: 30,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_tries: u32,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            max_tries,
        }
    }
}

/// Reconnection policy implementing capped exponential backoff.
///
/// Delays are deterministic: with the default multiplier the sequence is
/// `initial, 2*initial, 4*initial, …` capped at `max_delay`.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    tries: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
            tries: 0,
        }
    }

    /// Claim the next attempt and return the delay to sleep before it.
    ///
    /// Returns `None` once the configured attempt budget is spent.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_tries > 0 && self.tries >= self.config.max_tries {
            return None;
        }
        self.tries += 1;

        let delay = self.current_delay;

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let capped = next_millis.min(self.config.max_delay.as_millis());
        self.current_delay = Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX));

        Some(delay)
    }

    /// Reset the policy after a successful connection open.
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.tries = 0;
    }

    /// Number of attempts claimed since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.tries
    }

    /// Check whether another attempt is still within budget.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_tries == 0 || self.tries < self.config.max_tries
    }
}
