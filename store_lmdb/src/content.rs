//! LMDB implementation of ContentDirectory.

use std::ops::Bound;
use std::sync::Arc;

use heed::Env;

use tabcoin_store::{ContentDirectory, StoreError};
use tabcoin_types::{ContentId, UserId};

use crate::environment::Databases;
use crate::keys;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

pub struct LmdbContentStore {
    pub(crate) env: Arc<Env>,
    pub(crate) dbs: Databases,
}

impl ContentDirectory for LmdbContentStore {
    fn register_content(&self, content: &ContentId, owner: &UserId) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new(&self.env, self.dbs)?;
        batch.register_content(content, owner)?;
        batch.commit()
    }

    fn owner_of(&self, content: &ContentId) -> Result<Option<UserId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let owner = self
            .dbs
            .contents
            .get(&rtxn, content.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .map(|bytes| {
                String::from_utf8(bytes.to_vec())
                    .map(UserId::new)
                    .map_err(|e| StoreError::Corruption(format!("owner of {content}: {e}")))
            })
            .transpose()?;
        Ok(owner)
    }

    fn contents_owned_by(&self, owner: &UserId) -> Result<Vec<ContentId>, StoreError> {
        let prefix = keys::owner_prefix(owner.as_str())?;
        let mut upper = prefix.clone();
        let upper_bound = if keys::increment_prefix(&mut upper) {
            Bound::Excluded(upper.as_slice())
        } else {
            Bound::Unbounded
        };
        let bounds = (Bound::Included(prefix.as_slice()), upper_bound);

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .dbs
            .owner_index
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut contents = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let raw = String::from_utf8(key[prefix.len()..].to_vec())
                .map_err(|e| StoreError::Corruption(format!("content owned by {owner}: {e}")))?;
            contents.push(ContentId::new(raw));
        }
        Ok(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn owner_lookup_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        let store = env.content_store();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        store.register_content(&ContentId::new("b-post"), &alice).unwrap();
        store.register_content(&ContentId::new("a-post"), &alice).unwrap();
        store.register_content(&ContentId::new("c-post"), &bob).unwrap();

        assert_eq!(
            store.owner_of(&ContentId::new("c-post")).unwrap(),
            Some(bob.clone())
        );
        assert_eq!(store.owner_of(&ContentId::new("missing")).unwrap(), None);
        assert_eq!(
            store.contents_owned_by(&alice).unwrap(),
            vec![ContentId::new("a-post"), ContentId::new("b-post")]
        );
        assert_eq!(store.contents_owned_by(&bob).unwrap().len(), 1);
    }

    #[test]
    fn owner_prefix_does_not_leak_into_longer_names() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        let store = env.content_store();
        store.register_content(&ContentId::new("x"), &UserId::new("ann")).unwrap();
        store.register_content(&ContentId::new("y"), &UserId::new("anne")).unwrap();

        assert_eq!(
            store.contents_owned_by(&UserId::new("ann")).unwrap(),
            vec![ContentId::new("x")]
        );
    }
}
