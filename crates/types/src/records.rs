//! Records owned by the registry and the ledger.

use crate::clock::Timestamp;
use crate::hash_key::{decode_fixed_hex, HexIdError};
use crate::identity::Identity;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Authorship record stored once per content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub creator: Identity,
    pub registered_at: Timestamp,
}

/// Ledger token identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub Uuid);

impl TokenId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for TokenId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Number of raw bytes in a transaction reference.
pub const TX_REF_BYTES: usize = 32;

/// Opaque reference returned by ledger mutations for traceability.
///
/// No consensus is modelled, so the reference is random and only meaningful
/// inside this system.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxRef([u8; TX_REF_BYTES]);

impl TxRef {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TX_REF_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TX_REF_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl TryFrom<String> for TxRef {
    type Error = HexIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode_fixed_hex::<TX_REF_BYTES>(&value).map(Self)
    }
}

impl From<TxRef> for String {
    fn from(value: TxRef) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxRef({})", self.to_hex())
    }
}

/// Transferable ownership record.
///
/// Only `owner` changes after mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: TokenId,
    pub title: String,
    pub description: String,
    pub creator: Identity,
    pub owner: Identity,
    pub created_at: Timestamp,
}

impl Token {
    /// Fresh token owned by its creator.
    pub fn new(
        token_id: TokenId,
        title: impl Into<String>,
        description: impl Into<String>,
        creator: Identity,
        created_at: Timestamp,
    ) -> Self {
        Self {
            token_id,
            title: title.into(),
            description: description.into(),
            creator,
            owner: creator,
            created_at,
        }
    }
}
