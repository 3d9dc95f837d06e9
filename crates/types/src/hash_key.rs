use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of raw bytes in a content hash.
pub const HASH_KEY_BYTES: usize = 32;

/// Errors that can occur when parsing a `0x`-prefixed hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexIdError {
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("payload is not valid hexadecimal")]
    InvalidHex,
}

/// Decode `0x`-prefixed (or bare) hex into a fixed-width array.
///
/// Both hex cases are accepted; the prefix may be `0x` or `0X`.
pub(crate) fn decode_fixed_hex<const N: usize>(value: &str) -> Result<[u8; N], HexIdError> {
    let trimmed = value.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if payload.len() != N * 2 {
        return Err(HexIdError::InvalidLength {
            expected: N * 2,
            actual: payload.len(),
        });
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(payload, &mut out).map_err(|_| HexIdError::InvalidHex)?;
    Ok(out)
}

/// Opaque content hash used as the registry key.
///
/// The core never computes hashes; it only compares them by byte value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashKey([u8; HASH_KEY_BYTES]);

impl HashKey {
    pub const fn new(bytes: [u8; HASH_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_KEY_BYTES] {
        &self.0
    }

    /// Canonical text form: `0x` followed by 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(value: &str) -> Result<Self, HexIdError> {
        decode_fixed_hex::<HASH_KEY_BYTES>(value).map(Self)
    }
}

impl From<[u8; HASH_KEY_BYTES]> for HashKey {
    fn from(value: [u8; HASH_KEY_BYTES]) -> Self {
        Self(value)
    }
}

impl FromStr for HashKey {
    type Err = HexIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for HashKey {
    type Error = HexIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<HashKey> for String {
    fn from(value: HashKey) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashKey({})", self.to_hex())
    }
}
