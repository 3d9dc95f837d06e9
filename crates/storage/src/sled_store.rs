use crate::{LedgerStore, OwnerSwap, RegistryStore, Result};
use proofpot_types::{HashKey, Identity, RegistryEntry, Token, TokenId};
use sled::{Db, Tree};
use std::collections::BTreeSet;
use std::path::Path;

/// Sled-backed implementation
///
/// Trees: `registry` (hash bytes -> entry JSON), `ledger` (uuid bytes ->
/// token JSON) and `meta` (utf-8 key -> raw bytes).
#[derive(Clone)]
pub struct SledStorage {
    db: Db,
    registry: Tree,
    ledger: Tree,
    meta: Tree,
}

impl SledStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Database that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let registry = db.open_tree("registry")?;
        let ledger = db.open_tree("ledger")?;
        let meta = db.open_tree("meta")?;
        tracing::debug!(
            entries = registry.len(),
            tokens = ledger.len(),
            "opened sled storage"
        );
        Ok(Self {
            db,
            registry,
            ledger,
            meta,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl RegistryStore for SledStorage {
    fn insert_entry_if_absent(
        &self,
        hash: &HashKey,
        entry: &RegistryEntry,
    ) -> Result<Option<RegistryEntry>> {
        let data = serde_json::to_vec(entry)?;
        match self
            .registry
            .compare_and_swap(&hash.as_bytes()[..], None as Option<&[u8]>, Some(data))?
        {
            Ok(()) => Ok(None),
            Err(conflict) => conflict
                .current
                .map(|v| serde_json::from_slice(&v))
                .transpose()
                .map_err(Into::into),
        }
    }

    fn get_entry(&self, hash: &HashKey) -> Result<Option<RegistryEntry>> {
        self.registry
            .get(&hash.as_bytes()[..])?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn entry_count(&self) -> Result<u64> {
        Ok(self.registry.len() as u64)
    }

    fn load_metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.meta.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn store_metadata(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.meta.insert(key.as_bytes(), value)?;
        Ok(())
    }
}

impl LedgerStore for SledStorage {
    fn insert_token_if_absent(&self, token: &Token) -> Result<bool> {
        let data = serde_json::to_vec(token)?;
        let inserted = self
            .ledger
            .compare_and_swap(
                token.token_id.as_uuid().as_bytes(),
                None as Option<&[u8]>,
                Some(data),
            )?
            .is_ok();
        Ok(inserted)
    }

    fn get_token(&self, token_id: &TokenId) -> Result<Option<Token>> {
        self.ledger
            .get(token_id.as_uuid().as_bytes())?
            .map(|v| serde_json::from_slice(&v))
            .transpose()
            .map_err(Into::into)
    }

    fn swap_owner(
        &self,
        token_id: &TokenId,
        expected_owner: &Identity,
        new_owner: &Identity,
    ) -> Result<OwnerSwap> {
        let key = token_id.as_uuid().as_bytes();
        loop {
            let Some(current) = self.ledger.get(key)? else {
                return Ok(OwnerSwap::Missing);
            };
            let mut token: Token = serde_json::from_slice(&current)?;
            if token.owner != *expected_owner {
                return Ok(OwnerSwap::OwnerMismatch {
                    current: token.owner,
                });
            }
            token.owner = *new_owner;
            let data = serde_json::to_vec(&token)?;

            // A lost race means the stored bytes changed under us; re-read
            // and re-check the owner against the fresh value.
            if self
                .ledger
                .compare_and_swap(key, Some(current), Some(data))?
                .is_ok()
            {
                return Ok(OwnerSwap::Swapped(token));
            }
        }
    }

    fn tokens_owned_by(&self, owner: &Identity) -> Result<BTreeSet<TokenId>> {
        let mut owned = BTreeSet::new();
        for item in self.ledger.iter() {
            let (_, data) = item?;
            let token: Token = serde_json::from_slice(&data)?;
            if token.owner == *owner {
                owned.insert(token.token_id);
            }
        }
        Ok(owned)
    }

    fn token_count(&self) -> Result<u64> {
        Ok(self.ledger.len() as u64)
    }
}
