//! Nullable stores: thread-safe in-memory storage for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tabcoin_store::{BalanceEventStore, ContentDirectory, StoreError};
use tabcoin_types::{
    BalanceEvent, BalanceType, ContentId, EventId, NewBalanceEvent, RecipientId, Timestamp,
    UserId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-memory balance event store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Appends can be made to fail or to stall, which lets tests observe how
/// callers behave when the backing store misbehaves.
pub struct NullBalanceStore {
    events: Mutex<Vec<BalanceEvent>>,
    failing_appends: AtomicU32,
    append_latency: Mutex<Option<Duration>>,
}

impl NullBalanceStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing_appends: AtomicU32::new(0),
            append_latency: Mutex::new(None),
        }
    }

    /// Make the next `count` calls to `append_events` fail without writing.
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Sleep for `latency` at the start of every append.
    pub fn set_append_latency(&self, latency: Duration) {
        *lock(&self.append_latency) = Some(latency);
    }

    /// Snapshot of every committed event, in append order.
    pub fn events(&self) -> Vec<BalanceEvent> {
        lock(&self.events).clone()
    }

    fn take_failure(&self) -> bool {
        self.failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn filtered<F>(&self, since: Timestamp, keep: F) -> Vec<BalanceEvent>
    where
        F: Fn(&BalanceEvent) -> bool,
    {
        let mut matched: Vec<BalanceEvent> = lock(&self.events)
            .iter()
            .filter(|e| e.created_at >= since && keep(e))
            .cloned()
            .collect();
        matched.sort_by_key(BalanceEvent::order_key);
        matched
    }
}

impl Default for NullBalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceEventStore for NullBalanceStore {
    fn append_events(&self, events: &[NewBalanceEvent]) -> Result<Vec<BalanceEvent>, StoreError> {
        let latency = *lock(&self.append_latency);
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
        if self.take_failure() {
            return Err(StoreError::Backend("injected append failure".to_string()));
        }

        let mut stored = lock(&self.events);
        let mut next = stored.last().map_or(1, |e| e.id.value() + 1);
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            committed.push(event.clone().into_committed(EventId::new(next)));
            next += 1;
        }
        stored.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn sum_balance(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64, StoreError> {
        Ok(lock(&self.events)
            .iter()
            .filter(|e| e.balance_type == balance_type && &e.recipient == recipient)
            .map(|e| e.amount)
            .sum())
    }

    fn recipient_events_since(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, StoreError> {
        Ok(self.filtered(since, |e| {
            e.balance_type == balance_type && &e.recipient == recipient
        }))
    }

    fn vote_events_since(
        &self,
        voter: &UserId,
        content: &ContentId,
        since: Timestamp,
    ) -> Result<Vec<BalanceEvent>, StoreError> {
        Ok(self.filtered(since, |e| {
            e.originator.vote_pair() == Some((voter, content))
        }))
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.events).len() as u64)
    }
}

/// An in-memory content ownership directory for testing.
pub struct NullContentDirectory {
    owners: Mutex<HashMap<ContentId, UserId>>,
}

impl NullContentDirectory {
    pub fn new() -> Self {
        Self {
            owners: Mutex::new(HashMap::new()),
        }
    }

    /// Build a directory pre-populated with `(content, owner)` pairs.
    pub fn with_contents<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let directory = Self::new();
        {
            let mut owners = lock(&directory.owners);
            for (content, owner) in pairs {
                owners.insert(ContentId::new(content), UserId::new(owner));
            }
        }
        directory
    }
}

impl Default for NullContentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentDirectory for NullContentDirectory {
    fn register_content(&self, content: &ContentId, owner: &UserId) -> Result<(), StoreError> {
        let mut owners = lock(&self.owners);
        match owners.get(content) {
            Some(current) if current == owner => Ok(()),
            Some(current) => Err(StoreError::Duplicate(format!(
                "content {content} already owned by {current}"
            ))),
            None => {
                owners.insert(content.clone(), owner.clone());
                Ok(())
            }
        }
    }

    fn owner_of(&self, content: &ContentId) -> Result<Option<UserId>, StoreError> {
        Ok(lock(&self.owners).get(content).cloned())
    }

    fn contents_owned_by(&self, owner: &UserId) -> Result<Vec<ContentId>, StoreError> {
        let mut contents: Vec<ContentId> = lock(&self.owners)
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(c, _)| c.clone())
            .collect();
        contents.sort();
        Ok(contents)
    }
}
