//! Events produced by committed state transitions.
//!
//! Components never deliver events themselves. A mutating call hands its
//! events back inside [`Committed`] and the surrounding runtime publishes
//! them, so an event can never be observed before the state it describes.

use crate::clock::Timestamp;
use crate::hash_key::HashKey;
use crate::identity::Identity;
use crate::records::{TokenId, TxRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvenanceEvent {
    RecipeRegistered {
        hash: HashKey,
        creator: Identity,
        timestamp: Timestamp,
    },
    AdministratorTransferred {
        previous: Identity,
        new: Identity,
    },
    TokenMinted {
        token_id: TokenId,
        creator: Identity,
        tx_ref: TxRef,
        timestamp: Timestamp,
    },
    TokenTransferred {
        token_id: TokenId,
        from: Identity,
        to: Identity,
        tx_ref: TxRef,
    },
}

impl ProvenanceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProvenanceEvent::RecipeRegistered { .. } => "recipe_registered",
            ProvenanceEvent::AdministratorTransferred { .. } => "administrator_transferred",
            ProvenanceEvent::TokenMinted { .. } => "token_minted",
            ProvenanceEvent::TokenTransferred { .. } => "token_transferred",
        }
    }
}

/// Result of a committed mutation plus the events to publish for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub events: Vec<ProvenanceEvent>,
}

impl<T> Committed<T> {
    pub fn new(value: T, event: ProvenanceEvent) -> Self {
        Self {
            value,
            events: vec![event],
        }
    }

    pub fn into_parts(self) -> (T, Vec<ProvenanceEvent>) {
        (self.value, self.events)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            events: self.events,
        }
    }
}
