//! # Per-Miner Submission Accounting
//!
//! Rolling-window submission and rejection counters that back the miner
//! rate limits at the ingress.
//!
//! ## Accounting rules
//!
//! - `/submit` reserves a slot and increments `submissions`.
//! - A submission that fails ingress validation releases the slot and is
//!   marked failed without counting against the cap.
//! - A consensus deny increments `rejections` only. The submission was
//!   already counted at reservation time, so denying must never touch
//!   `submissions` again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rate limit policy for one miner hotkey.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Submissions allowed inside one rolling window.
    pub max_submissions: u32,
    /// Rejections tolerated inside one rolling window. Sub-cap of
    /// `max_submissions`.
    pub max_rejections: u32,
    /// Rolling window length in seconds.
    pub window_secs: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions: 10,
            max_rejections: 8,
            window_secs: 24 * 60 * 60,
        }
    }
}

/// Why a reservation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("submission cap reached ({0} in window)")]
    SubmissionCapReached(u32),
    #[error("rejection cap reached ({0} in window)")]
    RejectionCapReached(u32),
}

/// Rolling-window counters for one miner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionCounters {
    /// Submissions counted in the current window.
    pub submissions: u32,
    /// Final deny count in the current window.
    pub rejections: u32,
    /// In-flight reservations not yet resolved by consensus.
    pub slot_reservations: u32,
    /// Start of the current rolling window.
    pub window_start: DateTime<Utc>,
}

impl SubmissionCounters {
    /// Fresh counters with a window starting `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            submissions: 0,
            rejections: 0,
            slot_reservations: 0,
            window_start: now,
        }
    }

    /// Reset the window if it has rolled past the configured length.
    fn roll(&mut self, config: &RateLimitConfig, now: DateTime<Utc>) {
        if now - self.window_start >= Duration::seconds(config.window_secs) {
            self.submissions = 0;
            self.rejections = 0;
            self.window_start = now;
            // Reservations survive the roll: they are still in flight.
        }
    }

    /// Reserve a submission slot, counting it against the cap.
    pub fn try_reserve(
        &mut self,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        self.roll(config, now);
        if self.submissions >= config.max_submissions {
            return Err(RateLimitError::SubmissionCapReached(config.max_submissions));
        }
        if self.rejections >= config.max_rejections {
            return Err(RateLimitError::RejectionCapReached(config.max_rejections));
        }
        self.submissions += 1;
        self.slot_reservations += 1;
        Ok(())
    }

    /// Release a slot for a submission that failed ingress validation.
    /// The submission no longer counts against the cap.
    pub fn release_failed(&mut self) {
        self.submissions = self.submissions.saturating_sub(1);
        self.slot_reservations = self.slot_reservations.saturating_sub(1);
    }

    /// Resolve a reservation with a consensus outcome. Denies increment
    /// `rejections` exactly once and never re-count the submission.
    pub fn resolve(&mut self, denied: bool) {
        self.slot_reservations = self.slot_reservations.saturating_sub(1);
        if denied {
            self.rejections += 1;
        }
    }
}
