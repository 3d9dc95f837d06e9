//! Error types for the authorship registry

use crate::policy::PolicyError;
use proofpot_storage::StorageError;
use proofpot_types::{HashKey, Identity};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Recipe hash already registered: {hash}")]
    DuplicateHash { hash: HashKey },

    #[error("Creator address cannot be zero")]
    InvalidCreator,

    #[error("Unauthorized: {caller} is not permitted to perform this operation")]
    Unauthorized { caller: Identity },

    #[error("Administrator address cannot be zero")]
    InvalidAdministrator,

    #[error("Registry storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Stored access policy is unreadable: {0}")]
    PolicyEncoding(#[from] serde_json::Error),
}

impl From<PolicyError> for RegistryError {
    fn from(value: PolicyError) -> Self {
        match value {
            PolicyError::Unauthorized { caller } => RegistryError::Unauthorized { caller },
            PolicyError::InvalidAdministrator => RegistryError::InvalidAdministrator,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
