//! Authorship registry implementation

use crate::errors::*;
use crate::policy::{AccessPolicy, CreatorSource};
use parking_lot::{Mutex, RwLock};
use proofpot_storage::RegistryStore;
use proofpot_types::{Clock, Committed, HashKey, Identity, ProvenanceEvent, RegistryEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Metadata key under which the access policy is persisted.
const POLICY_KEY: &str = "access_policy";

/// Registry settings applied when the store holds no policy yet.
///
/// Without an explicit creator source the registry uses the default of the
/// policy it ends up running with, which may be a persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub policy: AccessPolicy,
    pub creator_source: Option<CreatorSource>,
}

impl RegistryConfig {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy,
            creator_source: None,
        }
    }

    pub fn with_creator_source(mut self, creator_source: CreatorSource) -> Self {
        self.creator_source = Some(creator_source);
        self
    }

    /// Creator source that applies when `self.policy` is the active policy.
    pub fn effective_creator_source(&self) -> CreatorSource {
        self.creator_source
            .unwrap_or_else(|| self.policy.default_creator_source())
    }
}

/// Authorship Registry
///
/// Each content hash moves from unregistered to registered exactly once.
/// The (clock read, insert) pair runs under a commit lock so that
/// `registered_at` follows the order in which registrations were accepted;
/// uniqueness itself comes from the store's insert-if-absent primitive.
pub struct AuthorshipRegistry {
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    policy: RwLock<AccessPolicy>,
    creator_source: CreatorSource,
    commit: Mutex<()>,
}

impl AuthorshipRegistry {
    /// Open the registry over `store`.
    ///
    /// A policy already persisted in the store (for example after an
    /// administrator transfer) takes precedence over `config.policy`.
    pub fn open(
        store: Arc<dyn RegistryStore>,
        clock: Arc<dyn Clock>,
        config: RegistryConfig,
    ) -> Result<Self> {
        let policy = match store.load_metadata(POLICY_KEY)? {
            Some(raw) => {
                let stored: AccessPolicy = serde_json::from_slice(&raw)?;
                if stored != config.policy {
                    warn!(
                        ?stored,
                        configured = ?config.policy,
                        "persisted access policy differs from configuration; keeping persisted policy"
                    );
                }
                stored
            }
            None => {
                store.store_metadata(POLICY_KEY, serde_json::to_vec(&config.policy)?)?;
                config.policy
            }
        };

        let creator_source = config
            .creator_source
            .unwrap_or_else(|| policy.default_creator_source());
        info!(?policy, %creator_source, "authorship registry ready");

        Ok(Self {
            store,
            clock,
            policy: RwLock::new(policy),
            creator_source,
            commit: Mutex::new(()),
        })
    }

    /// Register `hash` as authored by `creator`.
    ///
    /// Checks run in a fixed order: null creator, access policy, creator
    /// source, then uniqueness. A retried call for an already registered hash
    /// therefore always ends in `DuplicateHash` and never re-stamps the entry.
    pub fn register(
        &self,
        hash: HashKey,
        creator: Identity,
        caller: Identity,
    ) -> Result<Committed<RegistryEntry>> {
        if creator.is_zero() {
            return Err(RegistryError::InvalidCreator);
        }

        // Held until commit so an administrator transfer cannot interleave
        // between the access check and the insert.
        let policy = self.policy.read();
        if !policy.can_register(&caller) {
            debug!(%hash, %caller, "registration rejected by access policy");
            return Err(RegistryError::Unauthorized { caller });
        }
        if self.creator_source == CreatorSource::Caller && creator != caller {
            debug!(%hash, %caller, %creator, "caller may only register for itself");
            return Err(RegistryError::Unauthorized { caller });
        }

        let entry = {
            let _commit = self.commit.lock();
            let entry = RegistryEntry {
                creator,
                registered_at: self.clock.now(),
            };
            if let Some(existing) = self.store.insert_entry_if_absent(&hash, &entry)? {
                debug!(%hash, original_creator = %existing.creator, "duplicate registration");
                return Err(RegistryError::DuplicateHash { hash });
            }
            entry
        };
        drop(policy);

        debug!(%hash, %creator, registered_at = %entry.registered_at, "recipe registered");
        Ok(Committed::new(
            entry,
            ProvenanceEvent::RecipeRegistered {
                hash,
                creator,
                timestamp: entry.registered_at,
            },
        ))
    }

    pub fn lookup(&self, hash: &HashKey) -> Result<Option<RegistryEntry>> {
        Ok(self.store.get_entry(hash)?)
    }

    pub fn policy(&self) -> AccessPolicy {
        *self.policy.read()
    }

    pub fn administrator(&self) -> Option<Identity> {
        self.policy.read().administrator()
    }

    pub fn creator_source(&self) -> CreatorSource {
        self.creator_source
    }

    pub fn can_register(&self, caller: &Identity) -> bool {
        self.policy.read().can_register(caller)
    }

    /// Designate `new_admin` as the administrator. Only the current
    /// administrator may call this. Returns the previous administrator.
    pub fn transfer_administrator(
        &self,
        new_admin: Identity,
        caller: Identity,
    ) -> Result<Committed<Identity>> {
        let mut policy = self.policy.write();
        let mut next = *policy;
        let previous = next.transfer_administrator(new_admin, &caller)?;

        self.store
            .store_metadata(POLICY_KEY, serde_json::to_vec(&next)?)?;
        *policy = next;

        info!(%previous, new = %new_admin, "registry administrator transferred");
        Ok(Committed::new(
            previous,
            ProvenanceEvent::AdministratorTransferred {
                previous,
                new: new_admin,
            },
        ))
    }

    pub fn entry_count(&self) -> Result<u64> {
        Ok(self.store.entry_count()?)
    }
}
