//! Ownership ledger and correlation endpoints.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::Json;
use proofpot_types::{Token, TokenId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::server::{parse_identity, ApiError, SharedState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MintRequest {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub creator: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub token_id: String,
    pub title: String,
    pub description: String,
    pub creator: String,
    pub owner: String,
    pub created_at_us: u64,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            token_id: token.token_id.to_string(),
            title: token.title,
            description: token.description,
            creator: token.creator.to_hex(),
            owner: token.owner.to_hex(),
            created_at_us: token.created_at.as_micros(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MintResponse {
    pub token: TokenResponse,
    pub tx_ref: String,
}

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    pub token_id: String,
    pub owner: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferRequest {
    pub to: String,
    pub caller: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub token_id: String,
    pub from: String,
    pub to: String,
    pub tx_ref: String,
}

#[derive(Debug, Serialize)]
pub struct OwnedTokensResponse {
    pub owner: String,
    pub tokens: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssociateRequest {
    pub content_id: String,
    pub token_id: String,
}

#[derive(Debug, Serialize)]
pub struct CorrelationResponse {
    pub content_id: String,
    pub token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

fn parse_token_id(value: &str) -> Result<TokenId, ApiError> {
    value
        .parse()
        .map_err(|err| ApiError::bad_request("invalid_token_id", format!("invalid token id: {err}")))
}

/// POST /tokens
pub async fn handle_mint(
    State(state): State<SharedState>,
    Json(request): Json<MintRequest>,
) -> Result<(StatusCode, Json<MintResponse>), ApiError> {
    state.record_request();
    let creator = parse_identity(&request.creator, "creator")?;

    state.ledger.check_mint(&request.title, creator)?;
    state.ledger.await_confirmation().await;
    let minted = state.commit(|| {
        state
            .ledger
            .commit_mint(&request.title, &request.description, creator)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(MintResponse {
            tx_ref: minted.tx_ref.to_hex(),
            token: minted.token.into(),
        }),
    ))
}

/// GET /tokens/:id
pub async fn handle_get_token(
    State(state): State<SharedState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<TokenResponse>, ApiError> {
    state.record_request();
    let token_id = parse_token_id(&id)?;

    state
        .ledger
        .details(&token_id)?
        .map(|token| Json(token.into()))
        .ok_or_else(|| ApiError::not_found("token_not_found", format!("Token not found: {token_id}")))
}

/// GET /tokens/:id/owner
pub async fn handle_get_owner(
    State(state): State<SharedState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<OwnerResponse>, ApiError> {
    state.record_request();
    let token_id = parse_token_id(&id)?;
    let owner = state.ledger.owner_of(&token_id)?;

    Ok(Json(OwnerResponse {
        token_id: token_id.to_string(),
        owner: owner.to_hex(),
    }))
}

/// POST /tokens/:id/transfer
pub async fn handle_transfer(
    State(state): State<SharedState>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    state.record_request();
    let token_id = parse_token_id(&id)?;
    let to = parse_identity(&request.to, "recipient")?;
    let caller = parse_identity(&request.caller, "caller")?;

    state.ledger.check_transfer(token_id, to, caller)?;
    state.ledger.await_confirmation().await;
    let tx_ref = state.commit(|| state.ledger.commit_transfer(token_id, to, caller))?;

    Ok(Json(TransferResponse {
        token_id: token_id.to_string(),
        from: caller.to_hex(),
        to: to.to_hex(),
        tx_ref: tx_ref.to_hex(),
    }))
}

/// GET /owners/:address/tokens
pub async fn handle_tokens_by_owner(
    State(state): State<SharedState>,
    AxumPath(address): AxumPath<String>,
) -> Result<Json<OwnedTokensResponse>, ApiError> {
    state.record_request();
    let owner = parse_identity(&address, "owner")?;
    let tokens: Vec<String> = state
        .ledger
        .tokens_owned_by(&owner)?
        .iter()
        .map(TokenId::to_string)
        .collect();

    Ok(Json(OwnedTokensResponse {
        owner: owner.to_hex(),
        total: tokens.len(),
        tokens,
    }))
}

/// POST /correlations
pub async fn handle_associate(
    State(state): State<SharedState>,
    Json(request): Json<AssociateRequest>,
) -> Result<Json<CorrelationResponse>, ApiError> {
    state.record_request();
    let content_id = request.content_id.trim();
    if content_id.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_content_id",
            "content id must not be empty",
        ));
    }
    let token_id = parse_token_id(&request.token_id)?;

    let replaced = state.correlations.associate(content_id, token_id);
    debug!(%content_id, %token_id, "content correlated with token");

    Ok(Json(CorrelationResponse {
        content_id: content_id.to_string(),
        token_id: token_id.to_string(),
        replaced: replaced.map(|id| id.to_string()),
    }))
}

/// GET /correlations/:content_id
pub async fn handle_get_correlation(
    State(state): State<SharedState>,
    AxumPath(content_id): AxumPath<String>,
) -> Result<Json<CorrelationResponse>, ApiError> {
    state.record_request();
    let content_id = content_id.trim();
    state
        .correlations
        .token_for(content_id)
        .map(|token_id| {
            Json(CorrelationResponse {
                content_id: content_id.to_string(),
                token_id: token_id.to_string(),
                replaced: None,
            })
        })
        .ok_or_else(|| {
            ApiError::not_found(
                "not_correlated",
                format!("no token associated with {content_id}"),
            )
        })
}
