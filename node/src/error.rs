use serde::Serialize;
use thiserror::Error;

use tabcoin_types::{ContentId, Timestamp};

use crate::serializer::SerializerError;

/// Terminal outcome of a rejected vote or grant. None of these leave any
/// balance change behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("insufficient funds: vote costs {required} tabcoins, balance is {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("repeat vote throttled until {retry_not_before}")]
    RepeatVoteThrottled { retry_not_before: Timestamp },

    #[error("too many concurrent votes for this voter")]
    TooManyConcurrentVotes,

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("content not found: {0}")]
    ContentNotFound(ContentId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteErrorKind {
    InsufficientFunds,
    RepeatVoteThrottled,
    TooManyConcurrentVotes,
    StorageFailure,
    ContentNotFound,
}

impl VoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteErrorKind::InsufficientFunds => "insufficient_funds",
            VoteErrorKind::RepeatVoteThrottled => "repeat_vote_throttled",
            VoteErrorKind::TooManyConcurrentVotes => "too_many_concurrent_votes",
            VoteErrorKind::StorageFailure => "storage_failure",
            VoteErrorKind::ContentNotFound => "content_not_found",
        }
    }
}

impl VoteError {
    pub fn kind(&self) -> VoteErrorKind {
        match self {
            VoteError::InsufficientFunds { .. } => VoteErrorKind::InsufficientFunds,
            VoteError::RepeatVoteThrottled { .. } => VoteErrorKind::RepeatVoteThrottled,
            VoteError::TooManyConcurrentVotes => VoteErrorKind::TooManyConcurrentVotes,
            VoteError::StorageFailure(_) => VoteErrorKind::StorageFailure,
            VoteError::ContentNotFound(_) => VoteErrorKind::ContentNotFound,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoteError::TooManyConcurrentVotes | VoteError::StorageFailure(_)
        )
    }
}

impl From<tabcoin_ledger::LedgerError> for VoteError {
    fn from(e: tabcoin_ledger::LedgerError) -> Self {
        VoteError::StorageFailure(e.to_string())
    }
}

impl From<tabcoin_store::StoreError> for VoteError {
    fn from(e: tabcoin_store::StoreError) -> Self {
        VoteError::StorageFailure(e.to_string())
    }
}

impl From<SerializerError> for VoteError {
    fn from(e: SerializerError) -> Self {
        match e {
            SerializerError::Saturated { .. } | SerializerError::TimedOut { .. } => {
                VoteError::TooManyConcurrentVotes
            }
            SerializerError::Closed | SerializerError::TaskFailed(_) => {
                VoteError::StorageFailure(e.to_string())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] tabcoin_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] tabcoin_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] tabcoin_store_lmdb::LmdbError),

    #[error("vote rejected: {0}")]
    Vote(#[from] VoteError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
