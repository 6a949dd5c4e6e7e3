//! Server-Sent Events (SSE) broadcaster
//!
//! Streams real-time playback events to connected clients.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use phrasebook_common::events::PlayerEvent;

use crate::api::AppState;

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let rx = ctx.state.subscribe_events();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => {
                    let event_type = event_type_str(&event);
                    debug!("Broadcasting SSE event: {}", event_type);
                    Some(Ok(Event::default().event(event_type).data(json)))
                }
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // BroadcastStream error (lagged or closed)
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Extract the SSE event name from a PlayerEvent
fn event_type_str(event: &PlayerEvent) -> &'static str {
    match event {
        PlayerEvent::PlaybackStarted { .. } => "PlaybackStarted",
        PlayerEvent::PlaybackPaused { .. } => "PlaybackPaused",
        PlayerEvent::PlaybackResumed { .. } => "PlaybackResumed",
        PlayerEvent::PlaybackCompleted { .. } => "PlaybackCompleted",
        PlayerEvent::PlaybackStopped { .. } => "PlaybackStopped",
        PlayerEvent::FocusDenied { .. } => "FocusDenied",
        PlayerEvent::SessionStateChanged { .. } => "SessionStateChanged",
    }
}
