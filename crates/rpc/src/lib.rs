//! HTTP JSON API for the provenance core.
//!
//! The core crates hand back events with every committed mutation; this
//! crate publishes them on an [`EventBus`] and exposes registry, ledger and
//! correlation operations over `axum`.

pub mod events;
pub mod registry;
pub mod server;
pub mod tokens;


pub use events::{EventBus, RecordedEvent};
pub use server::{build_router, start_server, ApiError, AppState};
