//! Request-boundary validation errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a reason is required for debit votes")]
    MissingReason,

    #[error("reason must have at least {min} characters, got {len}")]
    ReasonTooShort { min: usize, len: usize },

    #[error("reason must have at most {max} characters, got {len}")]
    ReasonTooLong { max: usize, len: usize },

    #[error("unknown transaction type: {0}")]
    UnknownVoteKind(String),

    #[error("unknown balance type: {0}")]
    UnknownBalanceType(String),

    #[error("invalid {0} id")]
    InvalidId(&'static str),
}
