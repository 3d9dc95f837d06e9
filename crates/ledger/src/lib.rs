//! Ownership Token Ledger
//!
//! Tokens carry recipe metadata and a transferable owner. The ledger is
//! independent of the authorship registry; applications that want to link
//! the two use the [`CorrelationIndex`].

pub mod correlation;
pub mod errors;
pub mod ledger;

pub use correlation::{ContentId, CorrelationIndex};
pub use errors::*;
pub use ledger::{Minted, OwnershipLedger};
