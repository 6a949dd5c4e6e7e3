//! Shared playback state
//!
//! Thread-safe observable state for the playback session: the API reads
//! snapshots from it, SSE clients subscribe to its event broadcast, and
//! only the session engine writes to it.

use phrasebook_common::events::{PlayerEvent, SessionStateName};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Point-in-time view of the session for API consumers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionStateName,
    pub clip_id: Option<Uuid>,
    pub position_ms: u64,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes; the position
/// marker is an atomic so the engine can update it from synchronous code.
pub struct SharedState {
    session: RwLock<(SessionStateName, Option<Uuid>)>,

    /// Retained position of the active clip, milliseconds. Meaningful
    /// while paused; zero otherwise.
    position_ms: AtomicU64,

    /// Event broadcaster for SSE clients
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            session: RwLock::new((SessionStateName::Idle, None)),
            position_ms: AtomicU64::new(0),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Record the session state and active clip
    pub async fn set_session(&self, state: SessionStateName, clip_id: Option<Uuid>) {
        *self.session.write().await = (state, clip_id);
    }

    /// Record the retained playback position
    pub fn set_position_ms(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::Relaxed);
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Relaxed)
    }

    /// Current snapshot for API consumers
    pub async fn snapshot(&self) -> SessionSnapshot {
        let (state, clip_id) = *self.session.read().await;
        SessionSnapshot {
            state,
            clip_id,
            position_ms: self.position_ms(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
