//! Storage backends for the authorship registry and the ownership ledger.
//!
//! Both tables are addressed by primary key only. Every mutation the core
//! needs is exposed as a per-key atomic primitive: insert-if-absent for
//! registry entries and token allocation, compare-and-swap for owner changes.

use proofpot_types::{HashKey, Identity, RegistryEntry, Token, TokenId};
use std::collections::BTreeSet;

mod memory;
mod sled_store;

pub use memory::MemoryStorage;
pub use sled_store::SledStorage;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of a conditional owner update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSwap {
    /// The owner matched and was replaced; carries the updated token.
    Swapped(Token),
    /// The token is owned by someone other than the expected owner.
    OwnerMismatch { current: Identity },
    /// No token with this id exists.
    Missing,
}

/// Write-once table of content hash -> authorship entry.
pub trait RegistryStore: Send + Sync {
    /// Store `entry` under `hash` unless the key is taken.
    ///
    /// Returns `None` when the entry was inserted, or the already stored
    /// entry when it was not. The existing entry is never modified.
    fn insert_entry_if_absent(
        &self,
        hash: &HashKey,
        entry: &RegistryEntry,
    ) -> Result<Option<RegistryEntry>>;

    fn get_entry(&self, hash: &HashKey) -> Result<Option<RegistryEntry>>;

    fn entry_count(&self) -> Result<u64>;

    /// Small key/value side table for component configuration state.
    fn load_metadata(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn store_metadata(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// Token id -> token table.
pub trait LedgerStore: Send + Sync {
    /// Insert a freshly minted token. Returns `false` if the id is taken.
    fn insert_token_if_absent(&self, token: &Token) -> Result<bool>;

    fn get_token(&self, token_id: &TokenId) -> Result<Option<Token>>;

    /// Replace the owner of `token_id` with `new_owner` iff it is currently
    /// `expected_owner`.
    fn swap_owner(
        &self,
        token_id: &TokenId,
        expected_owner: &Identity,
        new_owner: &Identity,
    ) -> Result<OwnerSwap>;

    fn tokens_owned_by(&self, owner: &Identity) -> Result<BTreeSet<TokenId>>;

    fn token_count(&self) -> Result<u64>;
}
