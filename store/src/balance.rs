//! Balance event storage trait.

use crate::StoreError;
use tabcoin_types::{
    BalanceEvent, BalanceType, ContentId, NewBalanceEvent, RecipientId, Timestamp, UserId,
};

/// Append-only store of balance events.
///
/// Implementations index events by `(balance_type, recipient)` for balance
/// sums and by the `(voter, content)` pair of vote events for throttling.
pub trait BalanceEventStore: Send + Sync {
    /// Commit a batch of events atomically and return them with their
    /// assigned ids, in input order.
    ///
    /// Either every event becomes visible or none does; readers never
    /// observe a partial batch.
    fn append_events(&self, events: &[NewBalanceEvent]) -> Result<Vec<BalanceEvent>, StoreError>;

    /// Signed sum of all event amounts for the account. Zero when the
    /// account has no events.
    fn sum_balance(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64, StoreError>;

    /// Events of one account with `created_at >= since`, ascending by
    /// `(created_at, id)`.
    fn recipient_events_since(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, StoreError>;

    /// Content effect events of votes cast by `voter` on `content` with
    /// `created_at >= since`, ascending by `(created_at, id)`.
    fn vote_events_since(
        &self,
        voter: &UserId,
        content: &ContentId,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, StoreError>;

    /// Total number of committed events.
    fn event_count(&self) -> Result<u64, StoreError>;

    /// All events of one account, ascending.
    fn recipient_events(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
    ) -> Result<Vec<BalanceEvent>, StoreError> {
        self.recipient_events_since(recipient, balance_type, Timestamp::EPOCH)
    }
}
