//! HTTP request handlers
//!
//! Implements the REST endpoints for catalog browsing and playback
//! control. Session failures map onto status codes: unknown clip is 404,
//! focus denial 409, resource creation failure 422.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::Error;
use crate::state::SessionSnapshot;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    categories: Vec<CategoryInfo>,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    name: String,
    clips: Vec<ClipInfo>,
}

#[derive(Debug, Serialize)]
pub struct ClipInfo {
    clip_id: Uuid,
    text: String,
    translation: String,
    has_image: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "phrasebook_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /catalog - Categories with their clip descriptors
pub async fn get_catalog(State(ctx): State<AppState>) -> Json<CatalogResponse> {
    let categories = ctx
        .catalog
        .categories()
        .iter()
        .map(|category| CategoryInfo {
            name: category.name().to_string(),
            clips: category
                .clips()
                .iter()
                .map(|clip| ClipInfo {
                    clip_id: clip.id(),
                    text: clip.text().to_string(),
                    translation: clip.translation().to_string(),
                    has_image: clip.has_image(),
                })
                .collect(),
        })
        .collect();

    Json(CatalogResponse { categories })
}

/// POST /playback/select/{clip_id} - Select a clip for playback
pub async fn select_clip(
    State(ctx): State<AppState>,
    Path(clip_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!(%clip_id, "Select request");

    match ctx.session.select(clip_id).await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "ok".to_string(),
        })),
        Err(e) => {
            let code = match &e {
                Error::ClipNotFound(_) => StatusCode::NOT_FOUND,
                Error::FocusDenied => StatusCode::CONFLICT,
                Error::ResourceCreation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!(%clip_id, error = %e, "Select failed");
            Err((
                code,
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            ))
        }
    }
}

/// POST /playback/stop - Tear down playback and focus
///
/// Idempotent: stopping an idle session is a successful no-op.
pub async fn stop_playback(
    State(ctx): State<AppState>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!("Stop request");

    match ctx.session.stop().await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "ok".to_string(),
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse {
                status: format!("error: {}", e),
            }),
        )),
    }
}

/// GET /playback/state - Current session snapshot
pub async fn get_state(State(ctx): State<AppState>) -> Json<SessionSnapshot> {
    Json(ctx.state.snapshot().await)
}
