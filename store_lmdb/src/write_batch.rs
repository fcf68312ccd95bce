//! Write batching: groups multiple store operations into a single LMDB write
//! transaction so that they become visible together.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! let cost = batch.append_event(cost_event)?;
//! let effect = batch.append_event(content_event)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::{Env, RwTxn};

use tabcoin_store::StoreError;
use tabcoin_types::{BalanceEvent, ContentId, EventId, NewBalanceEvent, UserId};

use crate::environment::Databases;
use crate::keys;
use crate::LmdbError;

pub(crate) const NEXT_EVENT_ID_KEY: &[u8] = b"next_event_id";

/// A write batch that groups multiple store operations into a single LMDB
/// write transaction.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    dbs: Databases,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a Env, dbs: Databases) -> Result<Self, StoreError> {
        let txn = env.write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, dbs })
    }

    // ── Event operations ────────────────────────────────────────────────

    /// Reserve the next event id. Ids start at 1.
    fn next_event_id(&mut self) -> Result<EventId, StoreError> {
        let next = self
            .dbs
            .meta
            .get(&self.txn, NEXT_EVENT_ID_KEY)
            .map_err(LmdbError::from)?
            .and_then(|b| b.try_into().ok().map(u64::from_be_bytes))
            .unwrap_or(1);
        let following = next
            .checked_add(1)
            .ok_or_else(|| StoreError::Corruption("event id space exhausted".to_string()))?;
        self.dbs
            .meta
            .put(&mut self.txn, NEXT_EVENT_ID_KEY, &following.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(EventId::new(next))
    }

    /// Append one event: the event row, both indexes, and the materialised
    /// running balance of its account.
    pub fn append_event(&mut self, event: NewBalanceEvent) -> Result<BalanceEvent, StoreError> {
        let id = self.next_event_id()?;
        let event = event.into_committed(id);
        let bytes = bincode::serialize(&event).map_err(LmdbError::from)?;

        self.dbs
            .events
            .put(&mut self.txn, &keys::event_key(id), &bytes)
            .map_err(LmdbError::from)?;

        let account = keys::account_key(event.balance_type, event.recipient.as_str())?;
        let recipient_key = keys::with_order_suffix(account.clone(), event.created_at, id);
        self.dbs
            .recipient_index
            .put(&mut self.txn, &recipient_key, &[])
            .map_err(LmdbError::from)?;

        if let Some((voter, content)) = event.originator.vote_pair() {
            let prefix = keys::vote_prefix(voter.as_str(), content.as_str())?;
            let vote_key = keys::with_order_suffix(prefix, event.created_at, id);
            self.dbs
                .vote_index
                .put(&mut self.txn, &vote_key, &[])
                .map_err(LmdbError::from)?;
        }

        self.add_to_balance(&account, event.amount)?;
        Ok(event)
    }

    fn add_to_balance(&mut self, account: &[u8], amount: i64) -> Result<(), StoreError> {
        let current = self
            .dbs
            .balances
            .get(&self.txn, account)
            .map_err(LmdbError::from)?
            .and_then(|b| b.try_into().ok().map(i64::from_be_bytes))
            .unwrap_or(0);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::Corruption("balance overflow".to_string()))?;
        self.dbs
            .balances
            .put(&mut self.txn, account, &updated.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Content operations ──────────────────────────────────────────────

    /// Record content ownership and the owner index entry.
    pub fn register_content(&mut self, content: &ContentId, owner: &UserId) -> Result<(), StoreError> {
        let existing = self
            .dbs
            .contents
            .get(&self.txn, content.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .map(|b| String::from_utf8_lossy(b).into_owned());
        match existing {
            Some(current) if current == owner.as_str() => return Ok(()),
            Some(current) => {
                return Err(StoreError::Duplicate(format!(
                    "content {content} already owned by {current}"
                )))
            }
            None => {}
        }

        self.dbs
            .contents
            .put(
                &mut self.txn,
                content.as_str().as_bytes(),
                owner.as_str().as_bytes(),
            )
            .map_err(LmdbError::from)?;

        let mut owner_key = keys::owner_prefix(owner.as_str())?;
        owner_key.extend_from_slice(content.as_str().as_bytes());
        self.dbs
            .owner_index
            .put(&mut self.txn, &owner_key, &[])
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Commit ──────────────────────────────────────────────────────────

    /// Commit all batched operations atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
