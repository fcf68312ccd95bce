//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tabcoin_store::{MetaStore, StoreError};
use tabcoin_types::EventId;

use crate::write_batch::NEXT_EVENT_ID_KEY;
use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Reads and writes the `meta` database outside of a write batch.
///
/// The event id counter is only advanced by [`crate::WriteBatch`], inside the
/// same transaction as the events it numbers.
pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbMetaStore {
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.meta_db.get(&rtxn, key)?.map(<[u8]>::to_vec))
    }
}

impl MetaStore for LmdbMetaStore {
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.read(SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    LmdbError::Serialization(
                        "schema_version has unexpected byte length".to_string(),
                    )
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &version.to_le_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn next_event_id(&self) -> Result<EventId, StoreError> {
        match self.read(NEXT_EVENT_ID_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    LmdbError::Serialization("next_event_id has unexpected byte length".into())
                })?;
                Ok(EventId::new(u64::from_be_bytes(arr)))
            }
            None => Ok(EventId::new(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LmdbEnvironment, CURRENT_SCHEMA_VERSION};
    use tabcoin_store::BalanceEventStore;
    use tabcoin_types::{BalanceType, NewBalanceEvent, Originator, RecipientId, Timestamp};

    #[test]
    fn counter_tracks_appends_and_schema_is_stamped() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024)
            .expect("failed to open env");
        let meta = env.meta_store();
        assert_eq!(meta.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(meta.next_event_id().unwrap(), EventId::new(1));

        let grant = NewBalanceEvent {
            balance_type: BalanceType::UserTabcoin,
            recipient: RecipientId::new("u"),
            amount: 4,
            originator: Originator::grant("seed"),
            created_at: Timestamp::new(1),
        };
        env.balance_store()
            .append_events(&[grant.clone(), grant])
            .unwrap();
        assert_eq!(meta.next_event_id().unwrap(), EventId::new(3));
    }
}
