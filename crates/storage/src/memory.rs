use crate::{LedgerStore, OwnerSwap, RegistryStore, Result};
use parking_lot::RwLock;
use proofpot_types::{HashKey, Identity, RegistryEntry, Token, TokenId};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// In-memory backend for tests and ephemeral nodes.
///
/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryStorageInner>,
}

#[derive(Default)]
struct MemoryStorageInner {
    entries: RwLock<HashMap<HashKey, RegistryEntry>>,
    ledger: RwLock<LedgerTables>,
    metadata: RwLock<HashMap<String, Vec<u8>>>,
}

/// Primary token table plus the owner index, guarded together so they never
/// disagree.
#[derive(Default)]
struct LedgerTables {
    tokens: HashMap<TokenId, Token>,
    by_owner: HashMap<Identity, BTreeSet<TokenId>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStorage {
    fn insert_entry_if_absent(
        &self,
        hash: &HashKey,
        entry: &RegistryEntry,
    ) -> Result<Option<RegistryEntry>> {
        let mut entries = self.inner.entries.write();
        match entries.entry(*hash) {
            Entry::Occupied(existing) => Ok(Some(*existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(*entry);
                Ok(None)
            }
        }
    }

    fn get_entry(&self, hash: &HashKey) -> Result<Option<RegistryEntry>> {
        Ok(self.inner.entries.read().get(hash).copied())
    }

    fn entry_count(&self) -> Result<u64> {
        Ok(self.inner.entries.read().len() as u64)
    }

    fn load_metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.metadata.read().get(key).cloned())
    }

    fn store_metadata(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.metadata.write().insert(key.to_string(), value);
        Ok(())
    }
}

impl LedgerStore for MemoryStorage {
    fn insert_token_if_absent(&self, token: &Token) -> Result<bool> {
        let mut ledger = self.inner.ledger.write();
        if ledger.tokens.contains_key(&token.token_id) {
            return Ok(false);
        }
        ledger.tokens.insert(token.token_id, token.clone());
        ledger
            .by_owner
            .entry(token.owner)
            .or_default()
            .insert(token.token_id);
        Ok(true)
    }

    fn get_token(&self, token_id: &TokenId) -> Result<Option<Token>> {
        Ok(self.inner.ledger.read().tokens.get(token_id).cloned())
    }

    fn swap_owner(
        &self,
        token_id: &TokenId,
        expected_owner: &Identity,
        new_owner: &Identity,
    ) -> Result<OwnerSwap> {
        let mut ledger = self.inner.ledger.write();
        let updated = match ledger.tokens.get_mut(token_id) {
            None => return Ok(OwnerSwap::Missing),
            Some(token) if token.owner != *expected_owner => {
                return Ok(OwnerSwap::OwnerMismatch {
                    current: token.owner,
                })
            }
            Some(token) => {
                token.owner = *new_owner;
                token.clone()
            }
        };

        if let Some(owned) = ledger.by_owner.get_mut(expected_owner) {
            owned.remove(token_id);
            if owned.is_empty() {
                ledger.by_owner.remove(expected_owner);
            }
        }
        ledger
            .by_owner
            .entry(*new_owner)
            .or_default()
            .insert(*token_id);

        Ok(OwnerSwap::Swapped(updated))
    }

    fn tokens_owned_by(&self, owner: &Identity) -> Result<BTreeSet<TokenId>> {
        Ok(self
            .inner
            .ledger
            .read()
            .by_owner
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    fn token_count(&self) -> Result<u64> {
        Ok(self.inner.ledger.read().tokens.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofpot_types::Timestamp;

    fn token(owner: Identity) -> Token {
        Token::new(TokenId::random(), "Soup", "desc", owner, Timestamp(1))
    }

    #[test]
    fn insert_if_absent_keeps_first_entry() {
        let storage = MemoryStorage::new();
        let hash = HashKey::new([9u8; 32]);
        let first = RegistryEntry {
            creator: Identity::repeat(1),
            registered_at: Timestamp(10),
        };
        let second = RegistryEntry {
            creator: Identity::repeat(2),
            registered_at: Timestamp(20),
        };

        assert_eq!(storage.insert_entry_if_absent(&hash, &first).unwrap(), None);
        assert_eq!(
            storage.insert_entry_if_absent(&hash, &second).unwrap(),
            Some(first)
        );
        assert_eq!(storage.get_entry(&hash).unwrap(), Some(first));
        assert_eq!(storage.entry_count().unwrap(), 1);
    }

    #[test]
    fn swap_owner_moves_owner_index() {
        let storage = MemoryStorage::new();
        let alice = Identity::repeat(0xaa);
        let bob = Identity::repeat(0xbb);
        let token = token(alice);
        assert!(storage.insert_token_if_absent(&token).unwrap());
        assert!(!storage.insert_token_if_absent(&token).unwrap());

        let swapped = storage.swap_owner(&token.token_id, &alice, &bob).unwrap();
        assert!(matches!(swapped, OwnerSwap::Swapped(ref t) if t.owner == bob));
        assert!(storage.tokens_owned_by(&alice).unwrap().is_empty());
        assert!(storage.tokens_owned_by(&bob).unwrap().contains(&token.token_id));

        let stale = storage.swap_owner(&token.token_id, &alice, &bob).unwrap();
        assert_eq!(stale, OwnerSwap::OwnerMismatch { current: bob });
    }

    #[test]
    fn swap_owner_reports_missing_token() {
        let storage = MemoryStorage::new();
        let outcome = storage
            .swap_owner(&TokenId::random(), &Identity::repeat(1), &Identity::repeat(2))
            .unwrap();
        assert_eq!(outcome, OwnerSwap::Missing);
    }

    #[test]
    fn clones_share_tables() {
        let storage = MemoryStorage::new();
        let view = storage.clone();
        storage
            .store_metadata("access_policy", b"{}".to_vec())
            .unwrap();
        assert_eq!(
            view.load_metadata("access_policy").unwrap(),
            Some(b"{}".to_vec())
        );
    }
}
