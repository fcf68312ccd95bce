//! Vote requests and the projections returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContentId, UserId, ValidationError};

/// Minimum length (in characters, after trimming) of a debit justification.
pub const REASON_MIN_CHARS: usize = 5;

/// Maximum length (in characters, after trimming) of a debit justification.
pub const REASON_MAX_CHARS: usize = 255;

/// Direction of a vote (`transaction_type`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Credit,
    Debit,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Credit => "credit",
            VoteKind::Debit => "debit",
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            VoteKind::Credit => 1,
            VoteKind::Debit => 2,
        }
    }

    /// Effect on the content's tabcoin balance.
    pub fn content_delta(&self) -> i64 {
        match self {
            VoteKind::Credit => 1,
            VoteKind::Debit => -1,
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(VoteKind::Credit),
            "debit" => Ok(VoteKind::Debit),
            other => Err(ValidationError::UnknownVoteKind(other.to_string())),
        }
    }
}

/// A request to vote on a content item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter: UserId,
    pub content: ContentId,
    pub kind: VoteKind,
    pub reason: Option<String>,
}

impl VoteRequest {
    pub fn credit(voter: impl Into<UserId>, content: impl Into<ContentId>) -> Self {
        Self {
            voter: voter.into(),
            content: content.into(),
            kind: VoteKind::Credit,
            reason: None,
        }
    }

    pub fn debit(
        voter: impl Into<UserId>,
        content: impl Into<ContentId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            voter: voter.into(),
            content: content.into(),
            kind: VoteKind::Debit,
            reason: Some(reason.into()),
        }
    }

    /// Field-shape validation performed at the request boundary.
    ///
    /// The orchestrator trusts that this has already run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.voter.is_valid() {
            return Err(ValidationError::InvalidId("voter"));
        }
        if !self.content.is_valid() {
            return Err(ValidationError::InvalidId("content"));
        }
        match (&self.kind, &self.reason) {
            (VoteKind::Debit, None) => Err(ValidationError::MissingReason),
            (_, Some(reason)) => validate_reason(reason),
            (VoteKind::Credit, None) => Ok(()),
        }
    }
}

fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    let len = reason.trim().chars().count();
    if len < REASON_MIN_CHARS {
        return Err(ValidationError::ReasonTooShort {
            min: REASON_MIN_CHARS,
            len,
        });
    }
    if len > REASON_MAX_CHARS {
        return Err(ValidationError::ReasonTooLong {
            max: REASON_MAX_CHARS,
            len,
        });
    }
    Ok(())
}

/// Externally reported balance shape of a content item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTabcoins {
    pub tabcoins: i64,
    pub tabcoins_credit: i64,
    pub tabcoins_debit: i64,
}

/// Externally reported balances of a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalances {
    pub tabcoins: i64,
    pub tabcash: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_without_reason_is_valid() {
        assert!(VoteRequest::credit("v", "c").validate().is_ok());
    }

    #[test]
    fn debit_requires_reason() {
        let mut request = VoteRequest::debit("v", "c", "conteúdo enganoso");
        assert!(request.validate().is_ok());
        request.reason = None;
        assert!(matches!(
            request.validate(),
            Err(ValidationError::MissingReason)
        ));
    }

    #[test]
    fn reason_length_is_counted_in_trimmed_characters() {
        // Five multi-byte characters surrounded by whitespace.
        assert!(VoteRequest::debit("v", "c", "  ééééé  ").validate().is_ok());
        assert!(matches!(
            VoteRequest::debit("v", "c", "   abcd   ").validate(),
            Err(ValidationError::ReasonTooShort { len: 4, .. })
        ));
    }

    #[test]
    fn reason_over_limit_is_rejected() {
        let long = "a".repeat(REASON_MAX_CHARS + 1);
        assert!(matches!(
            VoteRequest::debit("v", "c", long).validate(),
            Err(ValidationError::ReasonTooLong { len: 256, .. })
        ));
        let exact = "a".repeat(REASON_MAX_CHARS);
        assert!(VoteRequest::debit("v", "c", exact).validate().is_ok());
    }

    #[test]
    fn empty_ids_are_rejected() {
        let request = VoteRequest::credit("", "c");
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidId("voter"))
        ));
    }

    #[test]
    fn vote_kind_parses_wire_names() {
        assert_eq!("credit".parse::<VoteKind>().unwrap(), VoteKind::Credit);
        assert_eq!("debit".parse::<VoteKind>().unwrap(), VoteKind::Debit);
        assert!("upvote".parse::<VoteKind>().is_err());
        assert_eq!(VoteKind::Debit.content_delta(), -1);
    }

    #[test]
    fn content_projection_uses_wire_field_names() {
        let projection = ContentTabcoins {
            tabcoins: 1,
            tabcoins_credit: 1,
            tabcoins_debit: 0,
        };
        let json = serde_json::to_value(projection).unwrap();
        assert_eq!(json["tabcoins_credit"], 1);
        assert_eq!(json["tabcoins_debit"], 0);
    }
}
