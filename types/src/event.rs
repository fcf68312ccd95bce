//! Balance events: the append-only unit of the ledger.
//!
//! A recipient's balance for a given [`BalanceType`] is exactly the sum of the
//! `amount` of its events. Events are never updated or deleted; corrections are
//! new, compensating events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BalanceType, ContentId, RecipientId, Timestamp, TransactionId, UserId, VoteKind};

/// Store-assigned event identifier, strictly increasing in append order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The entity that caused a balance event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Originator {
    /// Balance seeded outside voting: initial grants, publication credit.
    Grant { reference: String },
    /// Content effect of an accepted vote. Exactly one per vote, so repeat-vote
    /// throttling counts these.
    Vote {
        voter: UserId,
        content: ContentId,
        transaction: TransactionId,
        kind: VoteKind,
        reason: Option<String>,
    },
    /// Cost and reward legs of a vote transaction, charged to the voter.
    VoteTransaction {
        transaction: TransactionId,
        content: ContentId,
    },
}

impl Originator {
    pub fn grant(reference: impl Into<String>) -> Self {
        Originator::Grant {
            reference: reference.into(),
        }
    }

    /// The `(voter, content)` pair a content effect event is scoped by.
    pub fn vote_pair(&self) -> Option<(&UserId, &ContentId)> {
        match self {
            Originator::Vote { voter, content, .. } => Some((voter, content)),
            _ => None,
        }
    }

    /// The vote kind, for content effect events.
    pub fn vote_kind(&self) -> Option<VoteKind> {
        match self {
            Originator::Vote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The linking transaction, for any of the three legs of a vote.
    pub fn transaction(&self) -> Option<TransactionId> {
        match self {
            Originator::Vote { transaction, .. }
            | Originator::VoteTransaction { transaction, .. } => Some(*transaction),
            Originator::Grant { .. } => None,
        }
    }

    /// Whether this event was produced by a vote transaction.
    pub fn is_vote(&self) -> bool {
        self.transaction().is_some()
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Originator::Grant { .. } => "grant",
            Originator::Vote { .. } => "vote",
            Originator::VoteTransaction { .. } => "vote_transaction",
        }
    }
}

/// An event that has not been committed yet (no id assigned).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBalanceEvent {
    pub balance_type: BalanceType,
    pub recipient: RecipientId,
    pub amount: i64,
    pub originator: Originator,
    pub created_at: Timestamp,
}

impl NewBalanceEvent {
    /// Attach the id assigned by the store at commit time.
    pub fn into_committed(self, id: EventId) -> BalanceEvent {
        BalanceEvent {
            id,
            balance_type: self.balance_type,
            recipient: self.recipient,
            amount: self.amount,
            originator: self.originator,
            created_at: self.created_at,
        }
    }
}

/// A committed, immutable balance event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub id: EventId,
    pub balance_type: BalanceType,
    pub recipient: RecipientId,
    /// Signed: positive increases the recipient's balance, negative decreases it.
    pub amount: i64,
    pub originator: Originator,
    /// The ordering key; ties are broken by `id`.
    pub created_at: Timestamp,
}

impl BalanceEvent {
    /// Total order over events: `(created_at, id)`.
    pub fn order_key(&self) -> (Timestamp, EventId) {
        (self.created_at, self.id)
    }
}
