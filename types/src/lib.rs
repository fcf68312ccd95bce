//! Fundamental types for the TabCoin balance ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, balance types, ledger events, vote requests, projections, policy
//! parameters, and timestamps.

pub mod balance;
pub mod error;
pub mod event;
pub mod hash;
pub mod ids;
pub mod params;
pub mod time;
pub mod vote;

pub use balance::BalanceType;
pub use error::ValidationError;
pub use event::{BalanceEvent, EventId, NewBalanceEvent, Originator};
pub use hash::TransactionId;
pub use ids::{ContentId, RecipientId, UserId};
pub use params::VotePolicy;
pub use time::{Clock, SystemClock, Timestamp};
pub use vote::{ContentTabcoins, UserBalances, VoteKind, VoteRequest};
