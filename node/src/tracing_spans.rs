//! Pre-built [`tracing::Span`] constructors for ledger operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! the log lines of one request.

use tracing::{info_span, Span};

use tabcoin_types::{BalanceType, ContentId, RecipientId, UserId, VoteKind};

/// Span covering one vote request, from the throttle pre-check to the
/// returned projection.
pub fn vote_span(voter: &UserId, content: &ContentId, kind: VoteKind) -> Span {
    info_span!("vote", voter = %voter, content = %content, kind = %kind)
}

/// Span covering one grant.
pub fn grant_span(recipient: &RecipientId, balance_type: BalanceType) -> Span {
    info_span!("grant", recipient = %recipient, balance_type = %balance_type)
}
