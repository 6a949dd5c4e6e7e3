//! Event types for the phrasebook event system
//!
//! `PlayerEvent` is the externally observable event stream, broadcast to
//! SSE clients by the playback service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playback session states as visible to API/SSE consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStateName {
    Idle,
    FocusRequested,
    Playing,
    Paused,
}

impl std::fmt::Display for SessionStateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStateName::Idle => write!(f, "idle"),
            SessionStateName::FocusRequested => write!(f, "focus-requested"),
            SessionStateName::Playing => write!(f, "playing"),
            SessionStateName::Paused => write!(f, "paused"),
        }
    }
}

/// Why an active clip stopped before (or instead of) reaching its end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// Permanent focus loss: another client took the output device for good
    FocusLost,
    /// A new selection replaced the clip
    Superseded,
    /// The hosting surface stopped (backgrounded, shut down)
    HostStopped,
}

/// Phrasebook event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A clip began playing
    PlaybackStarted {
        clip_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Playback paused by a transient focus loss, position retained
    PlaybackPaused {
        clip_id: Uuid,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Playback resumed from the retained position after focus returned
    PlaybackResumed {
        clip_id: Uuid,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A clip reached its natural end
    PlaybackCompleted {
        clip_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A clip was torn down before completing
    PlaybackStopped {
        clip_id: Uuid,
        reason: StopReason,
        timestamp: DateTime<Utc>,
    },

    /// The focus arbiter refused a selection; nothing was played
    FocusDenied {
        clip_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Session state changed
    SessionStateChanged {
        state: SessionStateName,
        timestamp: DateTime<Utc>,
    },
}
