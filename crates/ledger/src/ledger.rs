//! Ownership ledger implementation

use crate::errors::*;
use proofpot_storage::{LedgerStore, OwnerSwap};
use proofpot_types::{Clock, Committed, Identity, ProvenanceEvent, Token, TokenId, TxRef};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fresh UUIDs colliding even once is practically impossible; the bound
/// only keeps a broken id source from spinning forever.
const MAX_ID_ATTEMPTS: usize = 4;

/// A freshly minted token and the reference of the mint transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minted {
    pub token: Token,
    pub tx_ref: TxRef,
}

/// Ownership Ledger
///
/// Token owners change only through [`OwnershipLedger::commit_transfer`]
/// (also reached via [`OwnershipLedger::transfer`]), which compare-and-swaps
/// the owner so concurrent transfers of one token serialize while different
/// tokens proceed independently.
pub struct OwnershipLedger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    confirmation_delay: Duration,
}

impl OwnershipLedger {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            confirmation_delay: Duration::ZERO,
        }
    }

    /// Simulated confirmation latency awaited before a mint or transfer is
    /// committed.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Mint a token owned by `creator`.
    ///
    /// The confirmation delay is awaited before anything is written, so a
    /// cancelled mint leaves no trace.
    pub async fn mint(
        &self,
        title: &str,
        description: &str,
        creator: Identity,
    ) -> Result<Committed<Minted>> {
        self.check_mint(title, creator)?;
        self.await_confirmation().await;
        self.commit_mint(title, description, creator)
    }

    /// Move `token_id` to `to`. Only the current owner may transfer.
    pub async fn transfer(
        &self,
        token_id: TokenId,
        to: Identity,
        caller: Identity,
    ) -> Result<Committed<TxRef>> {
        self.check_transfer(token_id, to, caller)?;
        self.await_confirmation().await;
        self.commit_transfer(token_id, to, caller)
    }

    /// Argument checks performed by [`OwnershipLedger::mint`] before it
    /// suspends.
    pub fn check_mint(&self, title: &str, creator: Identity) -> Result<()> {
        if creator.is_zero() {
            return Err(LedgerError::InvalidCreator);
        }
        if title.trim().is_empty() {
            return Err(LedgerError::InvalidTitle);
        }
        Ok(())
    }

    /// Checks performed by [`OwnershipLedger::transfer`] before it suspends.
    /// The owner is checked again at commit.
    pub fn check_transfer(&self, token_id: TokenId, to: Identity, caller: Identity) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if self.owner_of(&token_id)? != caller {
            return Err(LedgerError::Unauthorized { token_id, caller });
        }
        Ok(())
    }

    /// Wait out the configured confirmation delay.
    pub async fn await_confirmation(&self) {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
    }

    /// Mint without the confirmation delay. Never suspends, so callers can
    /// run it under their own ordering lock.
    pub fn commit_mint(
        &self,
        title: &str,
        description: &str,
        creator: Identity,
    ) -> Result<Committed<Minted>> {
        self.check_mint(title, creator)?;

        let created_at = self.clock.now();
        let mut token = Token::new(TokenId::random(), title, description, creator, created_at);
        let mut attempts = 1;
        while !self.store.insert_token_if_absent(&token)? {
            if attempts == MAX_ID_ATTEMPTS {
                return Err(LedgerError::TokenIdExhausted { attempts });
            }
            attempts += 1;
            token.token_id = TokenId::random();
        }

        let tx_ref = TxRef::generate();
        debug!(token_id = %token.token_id, %creator, %tx_ref, "token minted");

        let event = ProvenanceEvent::TokenMinted {
            token_id: token.token_id,
            creator,
            tx_ref,
            timestamp: created_at,
        };
        Ok(Committed::new(Minted { token, tx_ref }, event))
    }

    /// Transfer without the confirmation delay. Never suspends.
    pub fn commit_transfer(
        &self,
        token_id: TokenId,
        to: Identity,
        caller: Identity,
    ) -> Result<Committed<TxRef>> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }

        match self.store.swap_owner(&token_id, &caller, &to)? {
            OwnerSwap::Swapped(_) => {}
            OwnerSwap::OwnerMismatch { current } => {
                debug!(%token_id, %caller, %current, "transfer rejected, caller is not the owner");
                return Err(LedgerError::Unauthorized { token_id, caller });
            }
            OwnerSwap::Missing => return Err(LedgerError::TokenNotFound { token_id }),
        }

        let tx_ref = TxRef::generate();
        debug!(%token_id, from = %caller, %to, %tx_ref, "token transferred");

        let event = ProvenanceEvent::TokenTransferred {
            token_id,
            from: caller,
            to,
            tx_ref,
        };
        Ok(Committed::new(tx_ref, event))
    }

    pub fn owner_of(&self, token_id: &TokenId) -> Result<Identity> {
        self.store
            .get_token(token_id)?
            .map(|token| token.owner)
            .ok_or(LedgerError::TokenNotFound {
                token_id: *token_id,
            })
    }

    pub fn tokens_owned_by(&self, owner: &Identity) -> Result<BTreeSet<TokenId>> {
        Ok(self.store.tokens_owned_by(owner)?)
    }

    pub fn details(&self, token_id: &TokenId) -> Result<Option<Token>> {
        Ok(self.store.get_token(token_id)?)
    }

    pub fn token_count(&self) -> Result<u64> {
        Ok(self.store.token_count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofpot_storage::MemoryStorage;
    use proofpot_types::{ManualClock, Timestamp};

    const AAA: Identity = Identity::repeat(0xaa);
    const BBB: Identity = Identity::repeat(0xbb);
    const CCC: Identity = Identity::repeat(0xcc);

    fn ledger() -> OwnershipLedger {
        OwnershipLedger::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(ManualClock::new(Timestamp(500))),
        )
    }

    #[tokio::test]
    async fn test_mint_assigns_creator_as_owner() {
        let ledger = ledger();
        let (minted, events) = ledger.mint("Soup", "desc", AAA).await.unwrap().into_parts();

        let t1 = minted.token.token_id;
        assert_eq!(ledger.owner_of(&t1).unwrap(), AAA);
        assert_eq!(minted.token.created_at, Timestamp(500));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ProvenanceEvent::TokenMinted { token_id, tx_ref, .. }
                if token_id == t1 && tx_ref == minted.tx_ref
        ));

        let details = ledger.details(&t1).unwrap().unwrap();
        assert_eq!(details.title, "Soup");
        assert_eq!(details.description, "desc");
        assert_eq!(details.creator, AAA);
    }

    #[tokio::test]
    async fn test_transfer_scenario() {
        let ledger = ledger();
        let t1 = ledger.mint("Soup", "desc", AAA).await.unwrap().value.token.token_id;

        ledger.transfer(t1, BBB, AAA).await.unwrap();
        assert_eq!(ledger.owner_of(&t1).unwrap(), BBB);

        let err = ledger.transfer(t1, CCC, AAA).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { caller, .. } if caller == AAA));
        assert_eq!(ledger.owner_of(&t1).unwrap(), BBB);

        let token = ledger.details(&t1).unwrap().unwrap();
        assert_eq!(token.creator, AAA);
    }

    #[tokio::test]
    async fn test_tokens_can_return_to_previous_owner() {
        let ledger = ledger();
        let t1 = ledger.mint("Stew", "", AAA).await.unwrap().value.token.token_id;

        ledger.transfer(t1, BBB, AAA).await.unwrap();
        ledger.transfer(t1, AAA, BBB).await.unwrap();
        assert_eq!(ledger.owner_of(&t1).unwrap(), AAA);
        assert!(ledger.tokens_owned_by(&BBB).unwrap().is_empty());
        assert!(ledger.tokens_owned_by(&AAA).unwrap().contains(&t1));
    }

    #[tokio::test]
    async fn test_mint_validation() {
        let ledger = ledger();
        assert!(matches!(
            ledger.mint("Soup", "", Identity::ZERO).await,
            Err(LedgerError::InvalidCreator)
        ));
        assert!(matches!(
            ledger.mint("   ", "", AAA).await,
            Err(LedgerError::InvalidTitle)
        ));
        assert_eq!(ledger.token_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_failures() {
        let ledger = ledger();
        let unknown = TokenId::random();
        assert!(matches!(
            ledger.transfer(unknown, BBB, AAA).await,
            Err(LedgerError::TokenNotFound { token_id }) if token_id == unknown
        ));
        assert!(matches!(
            ledger.owner_of(&unknown),
            Err(LedgerError::TokenNotFound { .. })
        ));
        assert_eq!(ledger.details(&unknown).unwrap(), None);

        let t1 = ledger.mint("Soup", "", AAA).await.unwrap().value.token.token_id;
        assert!(matches!(
            ledger.transfer(t1, Identity::ZERO, AAA).await,
            Err(LedgerError::InvalidRecipient)
        ));
        assert_eq!(ledger.owner_of(&t1).unwrap(), AAA);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_delay_is_awaited() {
        let ledger = ledger().with_confirmation_delay(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        ledger.mint("Soup", "", AAA).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn test_commit_steps_apply_the_same_rules() {
        let ledger = ledger();
        assert!(matches!(
            ledger.commit_mint("", "", AAA),
            Err(LedgerError::InvalidTitle)
        ));

        let t1 = ledger.commit_mint("Soup", "", AAA).unwrap().value.token.token_id;
        assert!(matches!(
            ledger.check_transfer(t1, BBB, CCC),
            Err(LedgerError::Unauthorized { .. })
        ));
        ledger.check_transfer(t1, BBB, AAA).unwrap();

        assert!(matches!(
            ledger.commit_transfer(t1, BBB, CCC),
            Err(LedgerError::Unauthorized { .. })
        ));
        ledger.commit_transfer(t1, BBB, AAA).unwrap();
        assert_eq!(ledger.owner_of(&t1).unwrap(), BBB);
        assert!(matches!(
            ledger.commit_transfer(TokenId::random(), BBB, AAA),
            Err(LedgerError::TokenNotFound { .. })
        ));
    }
}
