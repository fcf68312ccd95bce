//! Repeat-vote throttle.
//!
//! Bounds how many times one voter may vote on the same content inside a
//! rolling window. Credit and debit votes count together. An event is inside
//! the window while `created_at + window > now`, so a slot frees up exactly
//! one window after the vote that occupied it.
//!
//! The check is read-only: a denial never writes to the ledger.

use tabcoin_types::{ContentId, Timestamp, UserId, VotePolicy};

use crate::{BalanceLedger, LedgerError};

/// Outcome of a throttle check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The vote may proceed; `remaining` more votes fit in the window
    /// including this one.
    Allowed { remaining: u32 },
    /// The limit is reached; the next vote is possible at `retry_not_before`.
    Denied { retry_not_before: Timestamp },
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ThrottleDecision::Allowed { .. })
    }
}

#[derive(Clone)]
pub struct ThrottleGuard {
    ledger: BalanceLedger,
    limit: u32,
    window_secs: u64,
}

impl ThrottleGuard {
    pub fn new(ledger: BalanceLedger, limit: u32, window_secs: u64) -> Self {
        Self {
            ledger,
            limit,
            window_secs,
        }
    }

    pub fn from_policy(ledger: BalanceLedger, policy: &VotePolicy) -> Self {
        Self::new(
            ledger,
            policy.repeat_vote_limit,
            policy.repeat_vote_window_secs,
        )
    }

    /// Earliest `created_at` still inside the window ending at `now`.
    fn window_start(&self, now: Timestamp) -> Timestamp {
        let cutoff = now.saturating_sub_secs(self.window_secs);
        if cutoff.has_expired(self.window_secs, now) {
            cutoff.saturating_add_secs(1)
        } else {
            cutoff
        }
    }

    pub fn check_allowed(
        &self,
        voter: &UserId,
        content: &ContentId,
        now: Timestamp,
    ) -> Result<ThrottleDecision, LedgerError> {
        let recent = self
            .ledger
            .vote_events_since(voter, content, self.window_start(now))?;
        let count = recent.len();
        let limit = self.limit as usize;

        if count < limit {
            return Ok(ThrottleDecision::Allowed {
                remaining: (limit - count) as u32,
            });
        }

        // Once the oldest `count - limit + 1` votes age out the count drops
        // below the limit; the last of those sets the retry time.
        let retry_not_before = recent
            .get(count - limit)
            .map(|e| e.created_at.saturating_add_secs(self.window_secs))
            .unwrap_or_else(|| now.saturating_add_secs(self.window_secs));

        tracing::debug!(
            voter = %voter,
            content = %content,
            count,
            retry_not_before = %retry_not_before,
            "repeat vote throttled"
        );
        Ok(ThrottleDecision::Denied { retry_not_before })
    }
}
