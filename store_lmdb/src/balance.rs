//! LMDB implementation of BalanceEventStore.
//!
//! Balance sums are served from the `balances` database, which the write batch
//! maintains in the same transaction as the event rows. The event log remains
//! the source of truth; [`crate::check_integrity`] recomputes every sum from it.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use tabcoin_store::{BalanceEventStore, StoreError};
use tabcoin_types::{
    BalanceEvent, BalanceType, ContentId, EventId, NewBalanceEvent, RecipientId, Timestamp,
    UserId,
};

use crate::environment::Databases;
use crate::keys;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

pub struct LmdbBalanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) dbs: Databases,
}

impl LmdbBalanceStore {
    fn get_event(&self, rtxn: &RoTxn, id: EventId) -> Result<BalanceEvent, LmdbError> {
        let bytes = self
            .dbs
            .events
            .get(rtxn, &keys::event_key(id))?
            .ok_or_else(|| LmdbError::NotFound(format!("event {id}")))?;
        Ok(bincode::deserialize(bytes)?)
    }

    /// Load the events referenced by an index range `[prefix ++ since, next(prefix))`.
    fn scan_index(
        &self,
        index: Database<Bytes, Bytes>,
        prefix: Vec<u8>,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, LmdbError> {
        let lower = keys::with_since(prefix.clone(), since);
        let mut upper = prefix;
        let upper_bound = if keys::increment_prefix(&mut upper) {
            Bound::Excluded(upper.as_slice())
        } else {
            Bound::Unbounded
        };
        let bounds = (Bound::Included(lower.as_slice()), upper_bound);

        let rtxn = self.env.read_txn()?;
        let mut events = Vec::new();
        for entry in index.range(&rtxn, &bounds)? {
            let (key, _) = entry?;
            let id = keys::trailing_event_id(key)?;
            events.push(self.get_event(&rtxn, id)?);
        }
        Ok(events)
    }

    /// Every committed event in id order. Used by integrity checks.
    pub fn iter_events(&self) -> Result<Vec<BalanceEvent>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut events = Vec::new();
        for entry in self.dbs.events.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            events.push(bincode::deserialize(bytes).map_err(LmdbError::from)?);
        }
        Ok(events)
    }
}

impl BalanceEventStore for LmdbBalanceStore {
    fn append_events(&self, events: &[NewBalanceEvent]) -> Result<Vec<BalanceEvent>, StoreError> {
        let mut batch = WriteBatch::new(&self.env, self.dbs)?;
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            committed.push(batch.append_event(event.clone())?);
        }
        batch.commit()?;
        tracing::trace!(count = committed.len(), "appended balance events");
        Ok(committed)
    }

    fn sum_balance(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64, StoreError> {
        let key = keys::account_key(balance_type, recipient.as_str())?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let sum = match self.dbs.balances.get(&rtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.try_into().map_err(|_| {
                    StoreError::Corruption(format!(
                        "balance for {balance_type} {recipient} has unexpected byte length"
                    ))
                })?;
                i64::from_be_bytes(raw)
            }
            None => 0,
        };
        Ok(sum)
    }

    fn recipient_events_since(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, StoreError> {
        let prefix = keys::account_key(balance_type, recipient.as_str())?;
        Ok(self.scan_index(self.dbs.recipient_index, prefix, since)?)
    }

    fn vote_events_since(
        &self,
        voter: &UserId,
        content: &ContentId,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, StoreError> {
        let prefix = keys::vote_prefix(voter.as_str(), content.as_str())?;
        Ok(self.scan_index(self.dbs.vote_index, prefix, since)?)
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.dbs.events.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
