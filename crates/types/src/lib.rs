//! Shared types for the ProofPot provenance core.
//!
//! Content hashes and identities are opaque fixed-width byte strings with a
//! `0x`-prefixed hex text form. Parsing accepts either hex case, so two
//! identities compare equal exactly when their canonical bytes do.

pub mod clock;
pub mod events;
pub mod hash_key;
pub mod identity;
pub mod records;

pub use clock::*;
pub use events::*;
pub use hash_key::*;
pub use identity::*;
pub use records::*;

#[cfg(test)]
mod tests;
