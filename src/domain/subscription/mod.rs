//! Subscription Ledger
//!
//! Tracks which instruments the client holds subscriptions for and at which
//! detail level, so that subscriptions can be restored deterministically
//! after a reconnect.
//!
//! # Design
//!
//! The ledger is a token → mode map. A token subscribed without an explicit
//! mode is stored with no mode at all; on resubscription such entries are
//! promoted to [`Mode::Quote`]. The ledger is only mutated by host
//! subscribe/unsubscribe/set-mode calls — the reconnect path reads it but
//! never writes it.

use std::collections::HashMap;

use crate::domain::tick::Mode;

// =============================================================================
// Resubscription Batches
// =============================================================================

/// The ledger partitioned by mode, ready to replay after a reconnect.
///
/// Entries subscribed without an explicit mode are folded into `quote`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResubscriptionBatches {
    /// Tokens to restore at LTP detail.
    pub ltp: Vec<i32>,
    /// Tokens to restore at quote detail (including mode-less entries).
    pub quote: Vec<i32>,
    /// Tokens to restore at full detail.
    pub full: Vec<i32>,
}

impl ResubscriptionBatches {
    /// Check whether there is anything to replay.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ltp.is_empty() && self.quote.is_empty() && self.full.is_empty()
    }

    /// Total number of tokens across all batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ltp.len() + self.quote.len() + self.full.len()
    }
}

// =============================================================================
// Subscription Ledger
// =============================================================================

/// Map from instrument token to its current subscription mode.
///
/// `None` marks a token subscribed without an explicit mode.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionLedger {
    entries: HashMap<i32, Option<Mode>>,
}

impl SubscriptionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the ledger tracks no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether a token is tracked.
    #[must_use]
    pub fn contains(&self, instrument_token: i32) -> bool {
        self.entries.contains_key(&instrument_token)
    }

    /// Get the stored mode for a token.
    ///
    /// Returns `None` if the token is not tracked, and `Some(None)` if it is
    /// tracked without an explicit mode.
    #[must_use]
    pub fn mode_of(&self, instrument_token: i32) -> Option<Option<Mode>> {
        self.entries.get(&instrument_token).copied()
    }

    /// Record subscriptions for the given tokens.
    ///
    /// New tokens are stored without a mode; tokens already tracked keep
    /// their current mode.
    pub fn subscribe(&mut self, instrument_tokens: &[i32]) {
        for &token in instrument_tokens {
            self.entries.entry(token).or_insert(None);
        }
    }

    /// Drop the given tokens from the ledger, if present.
    pub fn unsubscribe(&mut self, instrument_tokens: &[i32]) {
        for token in instrument_tokens {
            self.entries.remove(token);
        }
    }

    /// Store `mode` for each of the given tokens, overwriting any previous
    /// mode and inserting tokens that were not yet tracked.
    pub fn set_mode(&mut self, mode: Mode, instrument_tokens: &[i32]) {
        for &token in instrument_tokens {
            self.entries.insert(token, Some(mode));
        }
    }

    /// Partition the ledger into per-mode batches for resubscription.
    #[must_use]
    pub fn resubscription_batches(&self) -> ResubscriptionBatches {
        let mut batches = ResubscriptionBatches::default();
        for (&token, mode) in &self.entries {
            match mode {
                Some(Mode::Ltp) => batches.ltp.push(token),
                Some(Mode::Full) => batches.full.push(token),
                Some(Mode::Quote) | None => batches.quote.push(token),
            }
        }
        batches
    }
}
