//! Authorship registry endpoints.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::Json;
use proofpot_registry::{AccessPolicy, CreatorSource};
use proofpot_types::{HashKey, RegistryEntry};
use serde::{Deserialize, Serialize};

use crate::server::{parse_hash, parse_identity, ApiError, SharedState};

/// Request to register a content hash.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    /// Content hash (`0x` + 64 hex digits).
    pub hash: String,

    /// Address recorded as the author.
    pub creator: String,

    /// Address performing the registration.
    pub caller: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntryResponse {
    pub hash: String,
    pub creator: String,
    pub registered_at_us: u64,
}

impl RegistryEntryResponse {
    fn new(hash: &HashKey, entry: &RegistryEntry) -> Self {
        Self {
            hash: hash.to_hex(),
            creator: entry.creator.to_hex(),
            registered_at_us: entry.registered_at.as_micros(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    #[serde(flatten)]
    pub policy: AccessPolicy,
    pub creator_source: CreatorSource,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferAdministratorRequest {
    pub new_administrator: String,
    pub caller: String,
}

#[derive(Debug, Serialize)]
pub struct TransferAdministratorResponse {
    pub previous: String,
    pub administrator: String,
}

/// POST /registry
pub async fn handle_register(
    State(state): State<SharedState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegistryEntryResponse>), ApiError> {
    state.record_request();
    let hash = parse_hash(&request.hash)?;
    let creator = parse_identity(&request.creator, "creator")?;
    let caller = parse_identity(&request.caller, "caller")?;

    let entry = state.commit(|| state.registry.register(hash, creator, caller))?;

    Ok((
        StatusCode::CREATED,
        Json(RegistryEntryResponse::new(&hash, &entry)),
    ))
}

/// GET /registry/:hash
pub async fn handle_lookup(
    State(state): State<SharedState>,
    AxumPath(hash): AxumPath<String>,
) -> Result<Json<RegistryEntryResponse>, ApiError> {
    state.record_request();
    let hash = parse_hash(&hash)?;

    state
        .registry
        .lookup(&hash)?
        .map(|entry| Json(RegistryEntryResponse::new(&hash, &entry)))
        .ok_or_else(|| ApiError::not_found("not_registered", format!("{hash} is not registered")))
}

/// GET /registry/policy
pub async fn handle_get_policy(State(state): State<SharedState>) -> Json<PolicyResponse> {
    state.record_request();
    Json(PolicyResponse {
        policy: state.registry.policy(),
        creator_source: state.registry.creator_source(),
    })
}

/// POST /registry/administrator
pub async fn handle_transfer_administrator(
    State(state): State<SharedState>,
    Json(request): Json<TransferAdministratorRequest>,
) -> Result<Json<TransferAdministratorResponse>, ApiError> {
    state.record_request();
    let new_admin = parse_identity(&request.new_administrator, "new administrator")?;
    let caller = parse_identity(&request.caller, "caller")?;

    let previous = state.commit(|| state.registry.transfer_administrator(new_admin, caller))?;

    Ok(Json(TransferAdministratorResponse {
        previous: previous.to_hex(),
        administrator: new_admin.to_hex(),
    }))
}
