//! # Phrasebook Player Library
//!
//! Pronunciation playback service for the phrasebook vocabulary app.
//!
//! **Purpose:** Own at most one decoded pronunciation clip at a time,
//! arbitrate for the shared audio output device through an audio-focus
//! arbiter, and expose an HTTP/SSE control surface for clip selection.
//!
//! **Architecture:** Single-task session engine fed by one command channel;
//! decode via symphonia, output via cpal.

pub mod api;
pub mod audio;
pub mod error;
pub mod session;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
