//! Decode/output resource abstraction
//!
//! The session owns at most one [`PlaybackResource`] at a time, created
//! through an injected [`AudioBackend`]. The production backend decodes
//! with symphonia and plays through cpal; tests substitute recording
//! fakes.

use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::session::engine::SessionMsg;

/// End-of-clip notifier handed to the backend with each resource.
///
/// Firing consumes the hook, so a resource cannot signal completion
/// twice. Messages carry the generation of the request that created the
/// resource; the session drops completions from a superseded generation.
#[derive(Debug)]
pub struct CompletionHook {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionMsg>,
}

impl CompletionHook {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionMsg>) -> Self {
        Self { generation, tx }
    }

    /// Signal that the clip reached its natural end.
    pub fn fire(self) {
        let _ = self.tx.send(SessionMsg::Completed {
            generation: self.generation,
        });
    }
}

/// A live decode/output resource bound to one clip.
pub trait PlaybackResource: Send + Sync {
    /// Begin or resume playback from the current position.
    fn start(&mut self) -> Result<()>;

    /// Halt playback, retaining the current position.
    fn pause(&mut self) -> Result<()>;

    /// Move the playback position.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Current playback position.
    fn position(&self) -> Duration;

    /// Destroy the resource, cutting output immediately. Consuming
    /// `self` makes a double release unrepresentable.
    fn release(self: Box<Self>);
}

/// Factory for playback resources.
pub trait AudioBackend: Send + Sync {
    /// Create a resource for the referenced audio, ready to `start()`.
    ///
    /// On failure nothing half-initialized may remain; the hook is
    /// simply dropped and never fires.
    fn create(&self, audio: &Path, completion: CompletionHook)
        -> Result<Box<dyn PlaybackResource>>;
}
