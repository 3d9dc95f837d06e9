//! Access control for registry writes.

use proofpot_types::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unauthorized: {caller} is not the administrator")]
    Unauthorized { caller: Identity },

    #[error("Administrator address cannot be zero")]
    InvalidAdministrator,
}

/// Who may register content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Only the administrator may register.
    OwnerGated { administrator: Identity },
    /// Any non-null caller may register.
    Open,
}

impl AccessPolicy {
    pub fn owner_gated(administrator: Identity) -> Result<Self, PolicyError> {
        if administrator.is_zero() {
            return Err(PolicyError::InvalidAdministrator);
        }
        Ok(AccessPolicy::OwnerGated { administrator })
    }

    pub fn administrator(&self) -> Option<Identity> {
        match self {
            AccessPolicy::OwnerGated { administrator } => Some(*administrator),
            AccessPolicy::Open => None,
        }
    }

    pub fn can_register(&self, caller: &Identity) -> bool {
        match self {
            AccessPolicy::OwnerGated { administrator } => caller == administrator,
            AccessPolicy::Open => !caller.is_zero(),
        }
    }

    /// Hand the administrator role to `new_admin`.
    ///
    /// Only the current administrator may do this. In open mode there is no
    /// administrator, so every caller is rejected. Returns the previous
    /// administrator.
    pub fn transfer_administrator(
        &mut self,
        new_admin: Identity,
        caller: &Identity,
    ) -> Result<Identity, PolicyError> {
        let AccessPolicy::OwnerGated { administrator } = self else {
            return Err(PolicyError::Unauthorized { caller: *caller });
        };
        if *administrator != *caller {
            return Err(PolicyError::Unauthorized { caller: *caller });
        }
        if new_admin.is_zero() {
            return Err(PolicyError::InvalidAdministrator);
        }
        Ok(std::mem::replace(administrator, new_admin))
    }

    /// Creator source used when none is configured explicitly.
    pub fn default_creator_source(&self) -> CreatorSource {
        match self {
            AccessPolicy::OwnerGated { .. } => CreatorSource::Explicit,
            AccessPolicy::Open => CreatorSource::Caller,
        }
    }
}

/// Where the creator of a registration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorSource {
    /// The registrant names the creator (a backend registering on behalf of
    /// users).
    Explicit,
    /// The caller registers for itself; a `creator` different from the
    /// caller is rejected.
    Caller,
}

impl FromStr for CreatorSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explicit" => Ok(CreatorSource::Explicit),
            "caller" => Ok(CreatorSource::Caller),
            other => Err(format!("unknown creator source '{other}'")),
        }
    }
}

impl fmt::Display for CreatorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            CreatorSource::Explicit => "explicit",
            CreatorSource::Caller => "caller",
        };
        f.write_str(value)
    }
}
