//! Construction of the linked events that realise one vote.

use tabcoin_types::{
    BalanceType, ContentId, NewBalanceEvent, Originator, RecipientId, Timestamp, TransactionId,
    UserId, VoteKind, VotePolicy,
};

/// A logical vote transaction. Not persisted itself; it expands into three
/// balance events that share one [`TransactionId`] and are appended together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteTransaction {
    pub id: TransactionId,
    pub voter: UserId,
    pub content: ContentId,
    pub kind: VoteKind,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

impl VoteTransaction {
    pub fn new(
        voter: UserId,
        content: ContentId,
        kind: VoteKind,
        reason: Option<String>,
        created_at: Timestamp,
        nonce: u64,
    ) -> Self {
        let id = TransactionId::derive(&voter, &content, kind, created_at, nonce);
        Self {
            id,
            voter,
            content,
            kind,
            reason,
            created_at,
        }
    }

    /// The cost, content effect and reward events, in that order.
    pub fn events(&self, policy: &VotePolicy) -> [NewBalanceEvent; 3] {
        let leg = || Originator::VoteTransaction {
            transaction: self.id,
            content: self.content.clone(),
        };
        let voter = RecipientId::from(&self.voter);

        let cost = NewBalanceEvent {
            balance_type: BalanceType::UserTabcoin,
            recipient: voter.clone(),
            amount: -policy.vote_cost,
            originator: leg(),
            created_at: self.created_at,
        };
        let effect = NewBalanceEvent {
            balance_type: BalanceType::ContentTabcoin,
            recipient: RecipientId::from(&self.content),
            amount: self.kind.content_delta(),
            originator: Originator::Vote {
                voter: self.voter.clone(),
                content: self.content.clone(),
                transaction: self.id,
                kind: self.kind,
                reason: self.reason.clone(),
            },
            created_at: self.created_at,
        };
        let reward = NewBalanceEvent {
            balance_type: BalanceType::UserTabcash,
            recipient: voter,
            amount: policy.vote_reward,
            originator: leg(),
            created_at: self.created_at,
        };
        [cost, effect, reward]
    }
}

/// A single balance event seeded outside voting.
pub fn grant_event(
    recipient: RecipientId,
    balance_type: BalanceType,
    amount: i64,
    reference: impl Into<String>,
    created_at: Timestamp,
) -> NewBalanceEvent {
    NewBalanceEvent {
        balance_type,
        recipient,
        amount,
        originator: Originator::grant(reference),
        created_at,
    }
}
