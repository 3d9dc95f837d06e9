use crate::hash_key::{decode_fixed_hex, HexIdError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of raw bytes in an identity.
pub const IDENTITY_BYTES: usize = 20;
/// Length of the canonical text form (`0x` + 40 hex digits).
pub const IDENTITY_STRING_LENGTH: usize = 2 + IDENTITY_BYTES * 2;

/// Address-like identifier for creators, owners and callers.
///
/// Identities are normalized to raw bytes when parsed, so `0xAbC...` and
/// `0xabc...` are the same identity. The all-zero value is the null identity
/// and is never a valid creator, owner or administrator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity([u8; IDENTITY_BYTES]);

impl Identity {
    pub const ZERO: Identity = Identity([0u8; IDENTITY_BYTES]);

    pub const fn new(bytes: [u8; IDENTITY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Identity with every byte set to `byte`. Handy for fixtures.
    pub const fn repeat(byte: u8) -> Self {
        Self([byte; IDENTITY_BYTES])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_BYTES] {
        &self.0
    }

    /// Canonical lowercase text form.
    pub fn to_hex(&self) -> String {
        let mut encoded = String::with_capacity(IDENTITY_STRING_LENGTH);
        encoded.push_str("0x");
        encoded.push_str(&hex::encode(self.0));
        encoded
    }

    pub fn from_hex(value: &str) -> Result<Self, HexIdError> {
        decode_fixed_hex::<IDENTITY_BYTES>(value).map(Self)
    }
}

impl From<[u8; IDENTITY_BYTES]> for Identity {
    fn from(value: [u8; IDENTITY_BYTES]) -> Self {
        Self(value)
    }
}

impl FromStr for Identity {
    type Err = HexIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = HexIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}
