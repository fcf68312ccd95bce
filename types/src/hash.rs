//! Vote transaction identifiers.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ContentId, Timestamp, UserId, VoteKind};

type Blake2b256 = Blake2b<U32>;

/// A 32-byte identifier linking the three balance events of one vote.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the id of a vote transaction.
    ///
    /// `nonce` must be unique per process for a given `(voter, content, created_at)`;
    /// the orchestrator feeds it from a monotonically increasing counter.
    pub fn derive(
        voter: &UserId,
        content: &ContentId,
        kind: VoteKind,
        created_at: Timestamp,
        nonce: u64,
    ) -> Self {
        let mut hasher = Blake2b256::new();
        for part in [voter.as_str().as_bytes(), content.as_str().as_bytes()] {
            hasher.update((part.len() as u32).to_be_bytes());
            hasher.update(part);
        }
        hasher.update([kind.tag()]);
        hasher.update(created_at.as_secs().to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        let result = hasher.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        Self(output)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

// Lower-case hex.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let voter = UserId::new("voter");
        let content = ContentId::new("post");
        let a = TransactionId::derive(&voter, &content, VoteKind::Credit, Timestamp::new(7), 1);
        let b = TransactionId::derive(&voter, &content, VoteKind::Credit, Timestamp::new(7), 1);
        assert_eq!(a, b);
        assert!(!a.is_zero());
    }

    #[test]
    fn nonce_separates_otherwise_identical_votes() {
        let voter = UserId::new("voter");
        let content = ContentId::new("post");
        let a = TransactionId::derive(&voter, &content, VoteKind::Debit, Timestamp::new(7), 1);
        let b = TransactionId::derive(&voter, &content, VoteKind::Debit, Timestamp::new(7), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn length_prefix_prevents_id_concatenation_collisions() {
        let a = TransactionId::derive(
            &UserId::new("ab"),
            &ContentId::new("c"),
            VoteKind::Credit,
            Timestamp::EPOCH,
            0,
        );
        let b = TransactionId::derive(
            &UserId::new("a"),
            &ContentId::new("bc"),
            VoteKind::Credit,
            Timestamp::EPOCH,
            0,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_full_hex() {
        let id = TransactionId::new([0xab; 32]);
        assert_eq!(id.to_string().len(), 64);
        assert!(id.to_string().starts_with("abab"));
    }
}
