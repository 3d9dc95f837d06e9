//! Error types for the ownership ledger

use proofpot_storage::StorageError;
use proofpot_types::{Identity, TokenId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Token not found: {token_id}")]
    TokenNotFound { token_id: TokenId },

    #[error("Unauthorized: {caller} does not own token {token_id}")]
    Unauthorized { token_id: TokenId, caller: Identity },

    #[error("Creator address cannot be zero")]
    InvalidCreator,

    #[error("Recipient address cannot be zero")]
    InvalidRecipient,

    #[error("Token title must not be empty")]
    InvalidTitle,

    #[error("Could not allocate a unique token id after {attempts} attempts")]
    TokenIdExhausted { attempts: usize },

    #[error("Ledger storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
