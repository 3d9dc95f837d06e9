//! Optional link from application content ids to ownership tokens.
//!
//! The index is advisory: it is neither checked against the authorship
//! registry nor kept consistent with it, and re-associating an id simply
//! replaces the previous mapping.

use parking_lot::RwLock;
use proofpot_types::TokenId;
use std::collections::HashMap;
use tracing::debug;

/// Application-defined content identifier.
pub type ContentId = String;

#[derive(Debug, Default)]
pub struct CorrelationIndex {
    links: RwLock<HashMap<ContentId, TokenId>>,
}

impl CorrelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `content_id` to `token_id`, returning the token it pointed to
    /// before, if any.
    pub fn associate(&self, content_id: impl Into<ContentId>, token_id: TokenId) -> Option<TokenId> {
        let content_id = content_id.into();
        let previous = self.links.write().insert(content_id.clone(), token_id);
        if let Some(previous) = previous.filter(|p| *p != token_id) {
            debug!(%content_id, %previous, %token_id, "content correlation replaced");
        }
        previous
    }

    pub fn token_for(&self, content_id: &str) -> Option<TokenId> {
        self.links.read().get(content_id).copied()
    }

    pub fn len(&self) -> usize {
        self.links.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.read().is_empty()
    }
}
