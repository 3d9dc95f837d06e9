use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use proofpot_ledger::{CorrelationIndex, LedgerError, OwnershipLedger};
use proofpot_registry::{AuthorshipRegistry, RegistryError};
use proofpot_types::{Committed, HashKey, Identity};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::events::{EventBus, RecordedEvent};
use crate::registry::{
    handle_get_policy, handle_lookup, handle_register, handle_transfer_administrator,
};
use crate::tokens::{
    handle_associate, handle_get_correlation, handle_get_owner, handle_get_token, handle_mint,
    handle_tokens_by_owner, handle_transfer,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AuthorshipRegistry>,
    pub ledger: Arc<OwnershipLedger>,
    pub correlations: Arc<CorrelationIndex>,
    pub events: Arc<EventBus>,
    pub node_id: String,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
    commit_order: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        registry: Arc<AuthorshipRegistry>,
        ledger: Arc<OwnershipLedger>,
        correlations: Arc<CorrelationIndex>,
        events: Arc<EventBus>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            ledger,
            correlations,
            events,
            node_id: node_id.into(),
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
            commit_order: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run a mutation and publish its events under one ordering lock, so
    /// event sequence numbers follow commit order. `mutation` must not block
    /// on anything but storage.
    pub(crate) fn commit<T, E>(&self, mutation: impl FnOnce() -> Result<Committed<T>, E>) -> Result<T, E> {
        let _order = self.commit_order.lock();
        let (value, events) = mutation()?.into_parts();
        self.events.publish(events);
        Ok(value)
    }
}

pub(crate) type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    node_id: String,
    version: &'static str,
    uptime_secs: u64,
    registered_hashes: u64,
    minted_tokens: u64,
    correlations: usize,
    req_total: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, code: &'static str, message: S) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn bad_request<S: Into<String>>(code: &'static str, message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub(crate) fn not_found<S: Into<String>>(code: &'static str, message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub(crate) fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            code: self.code,
            message: self.message,
        });
        (self.status, payload).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::DuplicateHash { .. } => {
                Self::new(StatusCode::CONFLICT, "duplicate_hash", message)
            }
            RegistryError::Unauthorized { .. } => {
                Self::new(StatusCode::FORBIDDEN, "unauthorized", message)
            }
            RegistryError::InvalidCreator => Self::bad_request("invalid_creator", message),
            RegistryError::InvalidAdministrator => {
                Self::bad_request("invalid_administrator", message)
            }
            RegistryError::Storage(_) | RegistryError::PolicyEncoding(_) => {
                warn!("registry backend failure: {}", message);
                Self::internal(message)
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::TokenNotFound { .. } => Self::not_found("token_not_found", message),
            LedgerError::Unauthorized { .. } => {
                Self::new(StatusCode::FORBIDDEN, "unauthorized", message)
            }
            LedgerError::InvalidCreator => Self::bad_request("invalid_creator", message),
            LedgerError::InvalidRecipient => Self::bad_request("invalid_recipient", message),
            LedgerError::InvalidTitle => Self::bad_request("invalid_title", message),
            LedgerError::TokenIdExhausted { .. } | LedgerError::Storage(_) => {
                warn!("ledger backend failure: {}", message);
                Self::internal(message)
            }
        }
    }
}

pub(crate) fn parse_identity(value: &str, field: &str) -> Result<Identity, ApiError> {
    Identity::from_hex(value)
        .map_err(|err| ApiError::bad_request("invalid_address", format!("invalid {field}: {err}")))
}

pub(crate) fn parse_hash(value: &str) -> Result<HashKey, ApiError> {
    HashKey::from_hex(value)
        .map_err(|err| ApiError::bad_request("invalid_hash", format!("invalid content hash: {err}")))
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(Arc::new(state));
    let listener = bind_listener(addr).await?;
    info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/events", get(handle_recent_events))
        .route("/registry", post(handle_register))
        .route("/registry/policy", get(handle_get_policy))
        .route("/registry/administrator", post(handle_transfer_administrator))
        .route("/registry/:hash", get(handle_lookup))
        .route("/tokens", post(handle_mint))
        .route("/tokens/:id", get(handle_get_token))
        .route("/tokens/:id/owner", get(handle_get_owner))
        .route("/tokens/:id/transfer", post(handle_transfer))
        .route("/owners/:address/tokens", get(handle_tokens_by_owner))
        .route("/correlations", post(handle_associate))
        .route("/correlations/:content_id", get(handle_get_correlation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Result<Json<HealthResponse>, ApiError> {
    let req_total = state.record_request();
    Ok(Json(HealthResponse {
        status: "ok",
        node_id: state.node_id.clone(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_seconds(),
        registered_hashes: state.registry.entry_count()?,
        minted_tokens: state.ledger.token_count()?,
        correlations: state.correlations.len(),
        req_total,
    }))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    events: Vec<RecordedEvent>,
    total: usize,
}

async fn handle_recent_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    state.record_request();
    let limit = query.limit.unwrap_or_else(|| state.events.capacity());
    let events = state.events.recent(limit);
    Json(EventsResponse {
        total: events.len(),
        events,
    })
}
