//! Ledger bookkeeping that lives beside the events.

use tabcoin_types::EventId;

use crate::StoreError;

/// Schema version and event id counter of a persistent store.
pub trait MetaStore {
    /// Current schema version (0 for a fresh database).
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;

    /// The id the next appended event will receive. Ids start at 1 and are
    /// never reused, even after a rolled-back append.
    fn next_event_id(&self) -> Result<EventId, StoreError>;
}
