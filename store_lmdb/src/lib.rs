//! LMDB storage backend for the TabCoin balance ledger.
//!
//! Implements the storage traits from `tabcoin-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment.

pub mod balance;
pub mod content;
pub mod environment;
pub mod error;
pub mod integrity;
mod keys;
pub mod meta;
pub mod migration;
pub mod write_batch;

pub use balance::LmdbBalanceStore;
pub use content::LmdbContentStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use write_batch::WriteBatch;
