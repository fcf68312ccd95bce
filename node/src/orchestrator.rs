//! The vote transaction state machine.
//!
//! ```text
//! resolve owner ─► throttle pre-check ─► ┌─ exclusive section (voter + owner) ──┐ ─► projection
//!                                        │ throttle re-check ─► funds check ─►  │
//!                                        │ append cost + effect + reward        │
//!                                        └──────────────────────────────────────┘
//! ```
//!
//! The throttle runs once outside the section so that throttled requests never
//! wait for the voter's lock, and once inside so that concurrent requests from
//! one voter cannot overshoot the limit. Every path out of [`VoteOrchestrator::vote_on_content`]
//! either committed all three events or none.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::Instrument;

use tabcoin_ledger::{
    grant_event, BalanceLedger, BalanceProjector, ThrottleDecision, ThrottleGuard,
    VoteTransaction,
};
use tabcoin_store::{BalanceEventStore, ContentDirectory};
use tabcoin_types::{
    BalanceType, Clock, ContentId, ContentTabcoins, RecipientId, UserId, VoteKind, VotePolicy,
    VoteRequest,
};

use crate::error::VoteError;
use crate::metrics::VoteMetrics;
use crate::serializer::ConcurrencySerializer;
use crate::tracing_spans::{grant_span, vote_span};

/// Serializer keys of content grants, kept apart from user keys.
const CONTENT_KEY_PREFIX: &str = "content:";

/// State shared with the exclusive sections running on the blocking pool.
struct VoteCore {
    ledger: BalanceLedger,
    projector: BalanceProjector,
    throttle: ThrottleGuard,
    clock: Arc<dyn Clock>,
    policy: VotePolicy,
    nonce: AtomicU64,
}

impl VoteCore {
    fn check_throttle(&self, voter: &UserId, content: &ContentId) -> Result<(), VoteError> {
        match self
            .throttle
            .check_allowed(voter, content, self.clock.now())?
        {
            ThrottleDecision::Allowed { .. } => Ok(()),
            ThrottleDecision::Denied { retry_not_before } => {
                Err(VoteError::RepeatVoteThrottled { retry_not_before })
            }
        }
    }

    /// Funds check and atomic write. Must only run inside the voter's
    /// exclusive section.
    fn commit_vote(&self, request: VoteRequest) -> Result<ContentTabcoins, VoteError> {
        self.check_throttle(&request.voter, &request.content)?;

        let available = self.projector.user_tabcoins(&request.voter)?;
        if available < self.policy.vote_cost {
            return Err(VoteError::InsufficientFunds {
                required: self.policy.vote_cost,
                available,
            });
        }

        let before = self.projector.content_tabcoins(&request.content)?;
        let tx = VoteTransaction::new(
            request.voter,
            request.content,
            request.kind,
            request.reason,
            self.clock.now(),
            self.nonce.fetch_add(1, Ordering::Relaxed),
        );
        if let Err(e) = self.ledger.append_events(&tx.events(&self.policy)) {
            tracing::warn!(error = %e, "vote transaction not committed");
            return Err(e.into());
        }

        match self.projector.content_tabcoins(&tx.content) {
            Ok(projection) => Ok(projection),
            Err(e) => {
                // The write is durable; report what it must have produced.
                tracing::warn!(error = %e, "projection re-read failed after commit");
                Ok(apply_vote(before, tx.kind))
            }
        }
    }

    fn commit_grant(
        &self,
        recipient: RecipientId,
        balance_type: BalanceType,
        amount: i64,
        reference: String,
    ) -> Result<i64, VoteError> {
        let event = grant_event(
            recipient.clone(),
            balance_type,
            amount,
            reference,
            self.clock.now(),
        );
        self.ledger.append_events(&[event])?;
        Ok(self.ledger.sum_balance(&recipient, balance_type)?)
    }
}

fn apply_vote(mut projection: ContentTabcoins, kind: VoteKind) -> ContentTabcoins {
    let delta = kind.content_delta();
    projection.tabcoins += delta;
    match kind {
        VoteKind::Credit => projection.tabcoins_credit += 1,
        VoteKind::Debit => projection.tabcoins_debit += delta,
    }
    projection
}

/// Accepts votes and grants and turns them into ledger events.
///
/// Every ledger write goes through the [`ConcurrencySerializer`], keyed by
/// every user whose wallet the write affects.
pub struct VoteOrchestrator {
    core: Arc<VoteCore>,
    serializer: Arc<ConcurrencySerializer>,
    metrics: Option<Arc<VoteMetrics>>,
}

impl VoteOrchestrator {
    pub fn new(
        store: Arc<dyn BalanceEventStore>,
        directory: Arc<dyn ContentDirectory>,
        clock: Arc<dyn Clock>,
        policy: VotePolicy,
        serializer: Arc<ConcurrencySerializer>,
    ) -> Self {
        let ledger = BalanceLedger::new(store);
        let projector = BalanceProjector::new(ledger.clone(), directory);
        let throttle = ThrottleGuard::from_policy(ledger.clone(), &policy);
        Self {
            core: Arc::new(VoteCore {
                ledger,
                projector,
                throttle,
                clock,
                policy,
                nonce: AtomicU64::new(0),
            }),
            serializer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<VoteMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn projector(&self) -> &BalanceProjector {
        &self.core.projector
    }

    pub fn policy(&self) -> &VotePolicy {
        &self.core.policy
    }

    pub fn serializer(&self) -> &Arc<ConcurrencySerializer> {
        &self.serializer
    }

    /// Cast one vote and return the content's updated projection.
    ///
    /// The request must already have passed [`VoteRequest::validate`] and the
    /// caller's authorisation checks.
    pub async fn vote_on_content(
        &self,
        request: VoteRequest,
    ) -> Result<ContentTabcoins, VoteError> {
        let span = vote_span(&request.voter, &request.content, request.kind);
        let result = self.vote_inner(request).instrument(span.clone()).await;

        let _entered = span.enter();
        match &result {
            Ok(projection) => {
                tracing::info!(
                    tabcoins = projection.tabcoins,
                    tabcoins_credit = projection.tabcoins_credit,
                    tabcoins_debit = projection.tabcoins_debit,
                    "vote accepted"
                );
                if let Some(m) = &self.metrics {
                    m.votes_accepted.inc();
                }
            }
            Err(e) => {
                match e {
                    VoteError::TooManyConcurrentVotes | VoteError::StorageFailure(_) => {
                        tracing::warn!(error = %e, kind = e.kind().as_str(), "vote rejected")
                    }
                    _ => tracing::debug!(error = %e, kind = e.kind().as_str(), "vote rejected"),
                }
                if let Some(m) = &self.metrics {
                    m.record_rejection(e.kind());
                }
            }
        }
        result
    }

    async fn vote_inner(&self, request: VoteRequest) -> Result<ContentTabcoins, VoteError> {
        let owner = self
            .core
            .projector
            .directory()
            .owner_of(&request.content)?
            .ok_or_else(|| VoteError::ContentNotFound(request.content.clone()))?;
        tracing::trace!(owner = %owner, "content owner resolved");

        self.core.check_throttle(&request.voter, &request.content)?;

        // The owner's wallet changes with this vote and feeds the owner's own
        // funds check, so both users are held for the section.
        let core = Arc::clone(&self.core);
        let voter = request.voter.as_str().to_string();
        self.serializer
            .run_exclusive_all(&[voter.as_str(), owner.as_str()], move || {
                core.commit_vote(request)
            })
            .await?
    }

    /// Append a single grant event and return the account's new balance.
    ///
    /// User balances are serialised under the user. Content grants never
    /// reach a wallet, so they only serialise with other grants to the same
    /// content.
    pub async fn grant(
        &self,
        recipient: RecipientId,
        balance_type: BalanceType,
        amount: i64,
        reference: impl Into<String>,
    ) -> Result<i64, VoteError> {
        let span = grant_span(&recipient, balance_type);
        let reference = reference.into();

        let key = if balance_type.is_user() {
            recipient.as_str().to_string()
        } else {
            let content = ContentId::new(recipient.as_str());
            if self.core.projector.directory().owner_of(&content)?.is_none() {
                return Err(VoteError::ContentNotFound(content));
            }
            format!("{CONTENT_KEY_PREFIX}{content}")
        };

        let core = Arc::clone(&self.core);
        let result = self
            .serializer
            .run_exclusive(&key, move || {
                core.commit_grant(recipient, balance_type, amount, reference)
            })
            .instrument(span.clone())
            .await
            .map_err(VoteError::from)
            .and_then(|r| r);

        let _entered = span.enter();
        match &result {
            Ok(balance) => {
                tracing::info!(amount, balance, "grant applied");
                if let Some(m) = &self.metrics {
                    m.grants_applied.inc();
                }
            }
            Err(e) => tracing::warn!(error = %e, "grant rejected"),
        }
        result
    }

    /// Register `content` under `owner` and optionally credit it on
    /// publication. Returns the content's projection.
    pub async fn publish_content(
        &self,
        content: &ContentId,
        owner: &UserId,
        publication_credit: i64,
    ) -> Result<ContentTabcoins, VoteError> {
        self.core
            .projector
            .directory()
            .register_content(content, owner)?;
        if publication_credit != 0 {
            self.grant(
                RecipientId::from(content),
                BalanceType::ContentTabcoin,
                publication_credit,
                format!("publication:{content}"),
            )
            .await?;
        }
        Ok(self.core.projector.content_tabcoins(content)?)
    }
}
