//! Logical balance accounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Identifies which logical account a balance event affects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BalanceType {
    #[serde(rename = "user:tabcoin")]
    UserTabcoin,
    #[serde(rename = "user:tabcash")]
    UserTabcash,
    #[serde(rename = "content:tabcoin")]
    ContentTabcoin,
    #[serde(rename = "content:tabcash")]
    ContentTabcash,
}

impl BalanceType {
    pub const ALL: [BalanceType; 4] = [
        BalanceType::UserTabcoin,
        BalanceType::UserTabcash,
        BalanceType::ContentTabcoin,
        BalanceType::ContentTabcash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceType::UserTabcoin => "user:tabcoin",
            BalanceType::UserTabcash => "user:tabcash",
            BalanceType::ContentTabcoin => "content:tabcoin",
            BalanceType::ContentTabcash => "content:tabcash",
        }
    }

    /// Single-byte tag used as the leading byte of storage keys.
    pub fn tag(&self) -> u8 {
        match self {
            BalanceType::UserTabcoin => 1,
            BalanceType::UserTabcash => 2,
            BalanceType::ContentTabcoin => 3,
            BalanceType::ContentTabcash => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Whether the recipient of this balance type is a user (as opposed to content).
    pub fn is_user(&self) -> bool {
        matches!(self, BalanceType::UserTabcoin | BalanceType::UserTabcash)
    }

    /// The content-side account of the same currency. Vote-originated events
    /// on it roll up into the content owner's user-side balance.
    pub fn content_counterpart(&self) -> BalanceType {
        match self {
            BalanceType::UserTabcoin | BalanceType::ContentTabcoin => BalanceType::ContentTabcoin,
            BalanceType::UserTabcash | BalanceType::ContentTabcash => BalanceType::ContentTabcash,
        }
    }
}

impl fmt::Display for BalanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalanceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownBalanceType(s.to_string()))
    }
}
