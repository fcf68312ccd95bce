//! Event-sourced balance ledger.
//!
//! Balances are never stored as mutable counters: every change is an
//! immutable, signed [`BalanceEvent`](tabcoin_types::BalanceEvent) and a
//! balance is the sum over its history. This crate reads and appends those
//! events, projects them into the shapes callers report, and enforces the
//! repeat-vote throttle.

pub mod error;
pub mod ledger;
pub mod projector;
pub mod throttle;
pub mod transaction;

pub use error::LedgerError;
pub use ledger::BalanceLedger;
pub use projector::BalanceProjector;
pub use throttle::{ThrottleDecision, ThrottleGuard};
pub use transaction::{grant_event, VoteTransaction};
