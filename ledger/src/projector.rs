//! Read-only projections of the event history into reported balances.
//!
//! A content's score is the sum of its `content:tabcoin` events. A user's
//! wallet is the sum of the user's own `user:*` events plus the
//! vote-originated `content:*` events of every content they own. Grants
//! addressed to a content (publication credit) move the content's score but
//! never the owner's wallet.

use std::sync::Arc;

use tabcoin_store::ContentDirectory;
use tabcoin_types::{
    BalanceType, ContentId, ContentTabcoins, Originator, RecipientId, Timestamp, UserBalances,
    UserId, VoteKind,
};

use crate::{BalanceLedger, LedgerError};

#[derive(Clone)]
pub struct BalanceProjector {
    ledger: BalanceLedger,
    directory: Arc<dyn ContentDirectory>,
}

impl BalanceProjector {
    pub fn new(ledger: BalanceLedger, directory: Arc<dyn ContentDirectory>) -> Self {
        Self { ledger, directory }
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &Arc<dyn ContentDirectory> {
        &self.directory
    }

    /// Raw signed sum of one account.
    pub fn balance(
        &self,
        recipient: &RecipientId,
        balance_type: BalanceType,
    ) -> Result<i64, LedgerError> {
        self.ledger.sum_balance(recipient, balance_type)
    }

    /// `{tabcoins, tabcoins_credit, tabcoins_debit}` of a content item.
    ///
    /// All three values come from one read of the content's history, so a
    /// vote committed concurrently is either wholly in the result or absent.
    pub fn content_tabcoins(&self, content: &ContentId) -> Result<ContentTabcoins, LedgerError> {
        let overflow = || LedgerError::BalanceOverflow {
            recipient: content.to_string(),
        };
        let events = self.ledger.events_since(
            &RecipientId::from(content),
            BalanceType::ContentTabcoin,
            Timestamp::EPOCH,
        )?;

        let mut projection = ContentTabcoins::default();
        for event in events {
            projection.tabcoins = projection
                .tabcoins
                .checked_add(event.amount)
                .ok_or_else(overflow)?;
            match event.originator {
                Originator::Vote {
                    kind: VoteKind::Credit,
                    ..
                } if event.amount > 0 => projection.tabcoins_credit += 1,
                Originator::Vote {
                    kind: VoteKind::Debit,
                    ..
                } => {
                    projection.tabcoins_debit = projection
                        .tabcoins_debit
                        .checked_add(event.amount)
                        .ok_or_else(overflow)?
                }
                _ => {}
            }
        }
        Ok(projection)
    }

    /// Tabcoin and tabcash wallet of a user, including what their content
    /// earned or lost through votes.
    pub fn user_balances(&self, user: &UserId) -> Result<UserBalances, LedgerError> {
        Ok(UserBalances {
            tabcoins: self.user_total(user, BalanceType::UserTabcoin)?,
            tabcash: self.user_total(user, BalanceType::UserTabcash)?,
        })
    }

    /// The balance a voter's funds check reads.
    pub fn user_tabcoins(&self, user: &UserId) -> Result<i64, LedgerError> {
        self.user_total(user, BalanceType::UserTabcoin)
    }

    fn user_total(&self, user: &UserId, balance_type: BalanceType) -> Result<i64, LedgerError> {
        let overflow = || LedgerError::BalanceOverflow {
            recipient: user.to_string(),
        };
        let mut total = self
            .ledger
            .sum_balance(&RecipientId::from(user), balance_type)?;

        let content_type = balance_type.content_counterpart();
        for content in self.directory.contents_owned_by(user)? {
            let earned = self.vote_originated_sum(&content, content_type)?;
            total = total.checked_add(earned).ok_or_else(overflow)?;
        }
        Ok(total)
    }

    fn vote_originated_sum(
        &self,
        content: &ContentId,
        balance_type: BalanceType,
    ) -> Result<i64, LedgerError> {
        let events = self.ledger.events_since(
            &RecipientId::from(content),
            balance_type,
            Timestamp::EPOCH,
        )?;
        Ok(events
            .iter()
            .filter(|e| e.originator.is_vote())
            .map(|e| e.amount)
            .sum())
    }
}
