//! Binary key layouts.
//!
//! Identifiers have variable length, so every id inside a composite key is
//! prefixed with its length as a big-endian `u16`. This keeps prefix scans
//! unambiguous: `("ab", "c")` and `("a", "bc")` never share a prefix.
//!
//! | Database              | Key                                                   |
//! |-----------------------|-------------------------------------------------------|
//! | `events`              | `id (u64 BE)`                                         |
//! | `events_by_recipient` | `type tag ++ lp(recipient) ++ created_at ++ id`       |
//! | `events_by_vote`      | `lp(voter) ++ lp(content) ++ created_at ++ id`        |
//! | `balances`            | `type tag ++ lp(recipient)`                           |
//! | `contents`            | `content bytes`                                       |
//! | `contents_by_owner`   | `lp(owner) ++ content bytes`                          |

use tabcoin_types::{BalanceType, EventId, Timestamp};

use crate::LmdbError;

pub(crate) fn event_key(id: EventId) -> [u8; 8] {
    id.value().to_be_bytes()
}

fn push_len_prefixed(buf: &mut Vec<u8>, raw: &str) -> Result<(), LmdbError> {
    let len = u16::try_from(raw.len())
        .map_err(|_| LmdbError::InvalidKey(format!("id longer than {} bytes", u16::MAX)))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(raw.as_bytes());
    Ok(())
}

/// `type tag ++ lp(recipient)`: key of the materialised balance and prefix of
/// the recipient index.
pub(crate) fn account_key(balance_type: BalanceType, recipient: &str) -> Result<Vec<u8>, LmdbError> {
    let mut key = Vec::with_capacity(1 + 2 + recipient.len() + 16);
    key.push(balance_type.tag());
    push_len_prefixed(&mut key, recipient)?;
    Ok(key)
}

/// `lp(voter) ++ lp(content)`: prefix of the vote index.
pub(crate) fn vote_prefix(voter: &str, content: &str) -> Result<Vec<u8>, LmdbError> {
    let mut key = Vec::with_capacity(4 + voter.len() + content.len() + 16);
    push_len_prefixed(&mut key, voter)?;
    push_len_prefixed(&mut key, content)?;
    Ok(key)
}

pub(crate) fn owner_prefix(owner: &str) -> Result<Vec<u8>, LmdbError> {
    let mut key = Vec::with_capacity(2 + owner.len() + 36);
    push_len_prefixed(&mut key, owner)?;
    Ok(key)
}

/// Append the `(created_at, id)` ordering suffix to an index prefix.
pub(crate) fn with_order_suffix(mut prefix: Vec<u8>, created_at: Timestamp, id: EventId) -> Vec<u8> {
    prefix.extend_from_slice(&created_at.as_secs().to_be_bytes());
    prefix.extend_from_slice(&id.value().to_be_bytes());
    prefix
}

/// Lower bound for a range scan starting at `since` within `prefix`.
pub(crate) fn with_since(mut prefix: Vec<u8>, since: Timestamp) -> Vec<u8> {
    prefix.extend_from_slice(&since.as_secs().to_be_bytes());
    prefix
}

/// Extract the trailing event id from an index key.
pub(crate) fn trailing_event_id(key: &[u8]) -> Result<EventId, LmdbError> {
    let start = key
        .len()
        .checked_sub(8)
        .ok_or_else(|| LmdbError::InvalidKey("index key shorter than 8 bytes".to_string()))?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&key[start..]);
    Ok(EventId::new(u64::from_be_bytes(raw)))
}

/// Turn `prefix` into the smallest key greater than every key it prefixes.
///
/// Returns `false` when the prefix is all `0xFF` (no upper bound exists).
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) -> bool {
    while let Some(last) = prefix.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return true;
        }
        prefix.pop();
    }
    false
}
