//! The balance ledger: an append-only log of signed balance events.

use std::sync::Arc;

use tabcoin_store::BalanceEventStore;
use tabcoin_types::{
    BalanceEvent, BalanceType, ContentId, NewBalanceEvent, RecipientId, Timestamp, UserId,
};

use crate::LedgerError;

/// Append-only access to balance events.
///
/// Cheap to clone; every clone shares the same backing store.
#[derive(Clone)]
pub struct BalanceLedger {
    store: Arc<dyn BalanceEventStore>,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn BalanceEventStore>) -> Self {
        Self { store }
    }

    /// Commit `events` as one atomic batch.
    ///
    /// On error nothing was written; the caller must treat the whole batch
    /// as not applied.
    pub fn append_events(
        &self,
        events: &[NewBalanceEvent],
    ) -> Result<Vec<BalanceEvent>, LedgerError> {
        let committed = self.store.append_events(events)?;
        tracing::trace!(count = committed.len(), "ledger batch committed");
        Ok(committed)
    }

    /// Signed sum of all events for the account; zero when it has none.
    pub fn sum_balance(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64, LedgerError> {
        Ok(self.store.sum_balance(recipient, balance_type)?)
    }

    /// Events of one account created at or after `since`, oldest first.
    pub fn events_since(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, LedgerError> {
        Ok(self
            .store
            .recipient_events_since(recipient, balance_type, since)?)
    }

    /// Content effect events of `voter`'s votes on `content` created at or
    /// after `since`, oldest first.
    pub fn vote_events_since(
        &self,
        voter: &UserId,
        content: &ContentId,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, LedgerError> {
        Ok(self.store.vote_events_since(voter, content, since)?)
    }

    pub fn event_count(&self) -> Result<u64, LedgerError> {
        Ok(self.store.event_count()?)
    }
}
