//! REST API implementation for the playback service
//!
//! The selection surface: clients browse the catalog, select a clip for
//! pronunciation playback, and observe the session over SSE. Control
//! only -- no audio bytes cross this interface.

pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use phrasebook_common::catalog::Catalog;

use crate::session::SessionHandle;
use crate::state::SharedState;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playback session control handle
    pub session: SessionHandle,
    /// Clip catalog
    pub catalog: Arc<Catalog>,
    /// Observable session state
    pub state: Arc<SharedState>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/catalog", get(handlers::get_catalog))
        .route("/playback/select/:clip_id", post(handlers::select_clip))
        .route("/playback/stop", post(handlers::stop_playback))
        .route("/playback/state", get(handlers::get_state))
        .route("/events", get(sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
