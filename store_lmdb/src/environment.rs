//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use tabcoin_store::StoreError;

use crate::balance::LmdbBalanceStore;
use crate::content::LmdbContentStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

pub(crate) const EVENTS_DB: &str = "events";
pub(crate) const RECIPIENT_INDEX_DB: &str = "events_by_recipient";
pub(crate) const VOTE_INDEX_DB: &str = "events_by_vote";
pub(crate) const BALANCES_DB: &str = "balances";
pub(crate) const CONTENTS_DB: &str = "contents";
pub(crate) const OWNER_INDEX_DB: &str = "contents_by_owner";
pub(crate) const META_DB: &str = "meta";

/// Number of named databases the environment needs.
pub const REQUIRED_DBS: u32 = 7;

/// Database handles shared by every store view.
#[derive(Clone, Copy)]
pub(crate) struct Databases {
    pub events: Database<Bytes, Bytes>,
    pub recipient_index: Database<Bytes, Bytes>,
    pub vote_index: Database<Bytes, Bytes>,
    pub balances: Database<Bytes, Bytes>,
    pub contents: Database<Bytes, Bytes>,
    pub owner_index: Database<Bytes, Bytes>,
    pub meta: Database<Bytes, Bytes>,
}

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    dbs: Databases,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating every
    /// database and bringing the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and path; callers
        // must not open the same directory twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(REQUIRED_DBS))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let dbs = Databases {
            events: env.create_database(&mut wtxn, Some(EVENTS_DB))?,
            recipient_index: env.create_database(&mut wtxn, Some(RECIPIENT_INDEX_DB))?,
            vote_index: env.create_database(&mut wtxn, Some(VOTE_INDEX_DB))?,
            balances: env.create_database(&mut wtxn, Some(BALANCES_DB))?,
            contents: env.create_database(&mut wtxn, Some(CONTENTS_DB))?,
            owner_index: env.create_database(&mut wtxn, Some(OWNER_INDEX_DB))?,
            meta: env.create_database(&mut wtxn, Some(META_DB))?,
        };
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            dbs,
        };
        Migrator::run(&environment.meta_store())?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    /// The underlying heed environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub(crate) fn dbs(&self) -> Databases {
        self.dbs
    }

    /// Begin a write batch. Nothing is visible until [`WriteBatch::commit`].
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(&self.env, self.dbs)
    }

    pub fn balance_store(&self) -> LmdbBalanceStore {
        LmdbBalanceStore {
            env: Arc::clone(&self.env),
            dbs: self.dbs,
        }
    }

    pub fn content_store(&self) -> LmdbContentStore {
        LmdbContentStore {
            env: Arc::clone(&self.env),
            dbs: self.dbs,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.dbs.meta,
        }
    }
}
