//! Authorship Registry
//!
//! A write-once mapping from content hash to `(creator, registered_at)`.
//! Writes are gated by an [`AccessPolicy`]; every accepted registration
//! hands back a `RecipeRegistered` event for the runtime to publish.

pub mod errors;
pub mod policy;
pub mod registry;

pub use errors::*;
pub use policy::{AccessPolicy, CreatorSource, PolicyError};
pub use registry::{AuthorshipRegistry, RegistryConfig};
