//! Content ownership directory.

use crate::StoreError;
use tabcoin_types::{ContentId, UserId};

/// Resolves which user owns a content item.
///
/// Ownership is owned by the content store, not the ledger; the ledger only
/// consults it to roll content balances up into the owner's balance.
pub trait ContentDirectory: Send + Sync {
    /// Record `owner` as the owner of `content`. Re-registering the same pair
    /// is a no-op; registering an existing content under another owner fails
    /// with [`StoreError::Duplicate`].
    fn register_content(&self, content: &ContentId, owner: &UserId) -> Result<(), StoreError>;

    fn owner_of(&self, content: &ContentId) -> Result<Option<UserId>, StoreError>;

    fn contents_owned_by(&self, owner: &UserId) -> Result<Vec<ContentId>, StoreError>;
}
