//! Opaque identifiers for users, content items, and balance recipients.
//!
//! Identifiers are assigned by the content and user stores (UUIDs in practice).
//! The ledger never interprets them beyond equality and byte ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// An id is well-formed when it is non-empty and fits a length-prefixed key.
            pub fn is_valid(&self) -> bool {
                !self.0.is_empty() && self.0.len() <= u16::MAX as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// A user account: voters and content owners.
    UserId
);

string_id!(
    /// A piece of user-generated content.
    ContentId
);

string_id!(
    /// The account a balance event applies to. Its meaning (user or content)
    /// comes from the event's [`BalanceType`](crate::BalanceType).
    RecipientId
);

impl From<&UserId> for RecipientId {
    fn from(id: &UserId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&ContentId> for RecipientId {
    fn from(id: &ContentId) -> Self {
        Self(id.0.clone())
    }
}
