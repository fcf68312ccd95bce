//! Abstract storage traits for the TabCoin balance ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod balance;
pub mod content;
pub mod error;
pub mod meta;

pub use balance::BalanceEventStore;
pub use content::ContentDirectory;
pub use error::StoreError;
pub use meta::MetaStore;
