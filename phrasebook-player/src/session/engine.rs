//! Playback session engine
//!
//! One spawned task owns the whole session: the resource slot, the machine
//! state, and the generation counter. Everything that can mutate the
//! session -- selections, host stop, focus callbacks, completion -- arrives
//! as a [`SessionMsg`] on a single channel, so a teardown can never
//! interleave with a new selection.
//!
//! Callbacks are stamped with the generation of the request that created
//! them; the engine drops anything stamped with a superseded generation,
//! which is what makes a late grant for an already-replaced clip harmless.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use phrasebook_common::catalog::Catalog;
use phrasebook_common::events::{PlayerEvent, StopReason};

use crate::error::{Error, Result};
use crate::session::focus::{FocusArbiter, FocusChange, FocusListener, FocusResponse};
use crate::session::machine::{self, Action, SessionEvent, SessionState};
use crate::session::resource::{AudioBackend, CompletionHook, PlaybackResource};
use crate::state::SharedState;

/// Messages serialized onto the session task
#[derive(Debug)]
pub enum SessionMsg {
    /// User selected a clip for playback
    Select {
        clip_id: Uuid,
        reply: oneshot::Sender<Result<()>>,
    },
    /// The hosting surface stopped; tear everything down
    HostStopped { reply: oneshot::Sender<()> },
    /// Deferred grant/deny decision from the focus arbiter
    FocusDecision { generation: u64, granted: bool },
    /// Focus-change notification from the focus arbiter
    Focus {
        generation: u64,
        change: FocusChange,
    },
    /// The resource reached end-of-clip naturally
    Completed { generation: u64 },
    /// Tear down and exit the session task
    Shutdown,
}

/// Cloneable control handle for the session task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMsg>,
}

impl SessionHandle {
    /// Select a clip for playback, superseding whatever is active.
    ///
    /// Does not block on playback itself: the reply reports the outcome
    /// of focus arbitration and resource creation (or acceptance, when
    /// the arbiter defers its decision).
    pub async fn select(&self, clip_id: Uuid) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::Select { clip_id, reply })
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)?
    }

    /// Tear down playback and focus. Safe to call at any time, in any
    /// state, any number of times.
    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::HostStopped { reply })
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Tear down and end the session task.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionMsg::Shutdown);
    }
}

/// Playback session: owns zero-or-one decode/output resource, requests
/// and releases audio focus, and reacts to completion and interruption
/// events.
pub struct PlaybackSession {
    catalog: Arc<Catalog>,
    arbiter: Arc<dyn FocusArbiter>,
    backend: Arc<dyn AudioBackend>,
    shared: Arc<SharedState>,

    rx: mpsc::UnboundedReceiver<SessionMsg>,
    tx: mpsc::UnboundedSender<SessionMsg>,

    state: SessionState,
    resource: Option<Box<dyn PlaybackResource>>,

    /// Bumped on every teardown; callbacks stamped with an older value
    /// are stale and dropped.
    generation: u64,

    /// True from the moment a focus request is issued until the next
    /// teardown or denial, so focus is abandoned at most once per grant.
    focus_requested: bool,
}

impl PlaybackSession {
    /// Spawn the session task and return its control handle.
    pub fn spawn(
        catalog: Arc<Catalog>,
        arbiter: Arc<dyn FocusArbiter>,
        backend: Arc<dyn AudioBackend>,
        shared: Arc<SharedState>,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle { tx: tx.clone() };

        let session = Self {
            catalog,
            arbiter,
            backend,
            shared,
            rx,
            tx,
            state: SessionState::Idle,
            resource: None,
            generation: 0,
            focus_requested: false,
        };

        tokio::spawn(session.run());
        handle
    }

    async fn run(mut self) {
        info!("Playback session started");
        while let Some(msg) = self.rx.recv().await {
            let shutdown = matches!(&msg, SessionMsg::Shutdown);
            self.handle(msg).await;
            self.check_invariants();
            if shutdown {
                break;
            }
        }
        info!("Playback session stopped");
    }

    async fn handle(&mut self, msg: SessionMsg) {
        let prev = self.state;

        // Replies go out only after the shared snapshot is current, so a
        // caller that awaited `select` or `stop` observes the new state.
        match msg {
            SessionMsg::Select { clip_id, reply } => {
                let result = self.select(clip_id).await;
                self.sync_shared(prev).await;
                let _ = reply.send(result);
            }
            SessionMsg::HostStopped { reply } => {
                self.dispatch(SessionEvent::HostStopped).await.ok();
                self.sync_shared(prev).await;
                let _ = reply.send(());
            }
            SessionMsg::Shutdown => {
                self.dispatch(SessionEvent::HostStopped).await.ok();
                self.sync_shared(prev).await;
            }
            SessionMsg::FocusDecision { generation, granted } => {
                if generation != self.generation {
                    debug!(generation, "Dropping stale focus decision");
                } else {
                    self.focus_decision(granted).await;
                }
                self.sync_shared(prev).await;
            }
            SessionMsg::Focus { generation, change } => {
                if generation != self.generation {
                    debug!(generation, ?change, "Dropping stale focus change");
                } else if let Err(e) = self.dispatch(SessionEvent::Focus(change)).await {
                    warn!(?change, error = %e, "Focus change handling failed");
                }
                self.sync_shared(prev).await;
            }
            SessionMsg::Completed { generation } => {
                if generation != self.generation {
                    debug!(generation, "Dropping stale completion");
                } else {
                    self.dispatch(SessionEvent::Completed).await.ok();
                }
                self.sync_shared(prev).await;
            }
        }
    }

    /// Handle a selection: supersede the active clip, validate the id,
    /// then run the machine.
    async fn select(&mut self, clip_id: Uuid) -> Result<()> {
        // A new selection tears down whatever exists before anything
        // else, even when the id turns out to be unknown.
        if let Some(active) = self.state.clip_id() {
            if self.state.owns_resource() {
                self.shared.broadcast_event(PlayerEvent::PlaybackStopped {
                    clip_id: active,
                    reason: StopReason::Superseded,
                    timestamp: Utc::now(),
                });
            }
        }
        self.release_all();
        self.state = SessionState::Idle;

        if self.catalog.clip(clip_id).is_err() {
            debug!(%clip_id, "Selection for unknown clip");
            return Err(Error::ClipNotFound(clip_id));
        }

        self.dispatch(SessionEvent::Select { clip_id }).await
    }

    /// Apply one event to the machine and carry out its action.
    async fn dispatch(&mut self, event: SessionEvent) -> Result<()> {
        let transition = machine::apply(self.state, event);
        if transition.next != self.state {
            debug!(from = ?self.state, to = ?transition.next, ?event, "Session transition");
        }
        let prev = self.state;
        self.state = transition.next;

        match transition.action {
            Action::None => Ok(()),
            Action::Teardown => {
                self.release_all();
                self.announce_teardown(prev, event);
                Ok(())
            }
            Action::TeardownThenRequestFocus { clip_id } => {
                self.release_all();
                self.request_focus(clip_id).await
            }
            Action::StartResource { clip_id } => self.start_resource(clip_id).await,
            Action::PauseResource => {
                self.pause_resource();
                Ok(())
            }
            Action::ResumeResource => {
                self.resume_resource();
                Ok(())
            }
        }
    }

    /// Issue the transient-exclusive focus request for a clip.
    async fn request_focus(&mut self, clip_id: Uuid) -> Result<()> {
        self.focus_requested = true;
        let listener = FocusListener::new(self.generation, self.tx.clone());

        match self.arbiter.request_focus(listener) {
            FocusResponse::Granted => {
                let transition = machine::apply(self.state, SessionEvent::FocusGranted);
                self.state = transition.next;
                match transition.action {
                    Action::StartResource { clip_id } => self.start_resource(clip_id).await,
                    _ => Ok(()),
                }
            }
            FocusResponse::Denied => {
                info!(%clip_id, "Audio focus denied");
                self.state = machine::apply(self.state, SessionEvent::FocusDenied).next;
                // A denied request leaves no registration behind, so
                // there is nothing to abandon later.
                self.focus_requested = false;
                self.shared.broadcast_event(PlayerEvent::FocusDenied {
                    clip_id,
                    timestamp: Utc::now(),
                });
                Err(Error::FocusDenied)
            }
            FocusResponse::Pending => {
                debug!(%clip_id, "Focus decision deferred");
                Ok(())
            }
        }
    }

    /// Handle a deferred grant/deny decision from the arbiter.
    async fn focus_decision(&mut self, granted: bool) {
        if granted {
            if let Err(e) = self.dispatch(SessionEvent::FocusGranted).await {
                warn!(error = %e, "Deferred focus grant could not start playback");
            }
        } else {
            let clip_id = self.state.clip_id();
            self.state = machine::apply(self.state, SessionEvent::FocusDenied).next;
            self.focus_requested = false;
            if let Some(clip_id) = clip_id {
                info!(%clip_id, "Audio focus denied (deferred)");
                self.shared.broadcast_event(PlayerEvent::FocusDenied {
                    clip_id,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Create and start the decode/output resource for a clip.
    async fn start_resource(&mut self, clip_id: Uuid) -> Result<()> {
        let audio = match self.catalog.clip(clip_id) {
            Ok(clip) => clip.audio().to_path_buf(),
            Err(e) => {
                // The id was validated at selection time; losing it here
                // means the catalog changed under us, which it never does.
                error!(%clip_id, "Clip vanished from catalog");
                self.release_all();
                self.state = SessionState::Idle;
                return Err(e.into());
            }
        };

        let hook = CompletionHook::new(self.generation, self.tx.clone());
        let created = self.backend.create(&audio, hook).and_then(|mut resource| {
            resource.start()?;
            Ok(resource)
        });

        match created {
            Ok(resource) => {
                self.resource = Some(resource);
                self.shared.set_position_ms(0);
                info!(%clip_id, "Playback started");
                self.shared.broadcast_event(PlayerEvent::PlaybackStarted {
                    clip_id,
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(%clip_id, error = %e, "Resource creation failed");
                self.release_all();
                self.state = SessionState::Idle;
                Err(Error::ResourceCreation(e.to_string()))
            }
        }
    }

    /// Pause the resource in place, retaining its position.
    fn pause_resource(&mut self) {
        let Some(resource) = self.resource.as_mut() else {
            return;
        };
        if let Err(e) = resource.pause() {
            warn!(error = %e, "Pause failed");
        }
        let position_ms = resource.position().as_millis() as u64;
        self.shared.set_position_ms(position_ms);
        if let Some(clip_id) = self.state.clip_id() {
            info!(%clip_id, position_ms, "Playback paused by transient focus loss");
            self.shared.broadcast_event(PlayerEvent::PlaybackPaused {
                clip_id,
                position_ms,
                timestamp: Utc::now(),
            });
        }
    }

    /// Resume the resource from its retained position.
    fn resume_resource(&mut self) {
        let Some(resource) = self.resource.as_mut() else {
            return;
        };
        if let Err(e) = resource.start() {
            warn!(error = %e, "Resume failed");
        }
        let position_ms = resource.position().as_millis() as u64;
        if let Some(clip_id) = self.state.clip_id() {
            info!(%clip_id, position_ms, "Playback resumed");
            self.shared.broadcast_event(PlayerEvent::PlaybackResumed {
                clip_id,
                position_ms,
                timestamp: Utc::now(),
            });
        }
    }

    /// The single exit gate for resource and focus ownership.
    ///
    /// Every path out of {FocusRequested, Playing, Paused} funnels
    /// through here: natural completion, permanent focus loss, host
    /// stop, a superseding selection, and resource-creation failure.
    fn release_all(&mut self) {
        if let Some(resource) = self.resource.take() {
            resource.release();
        }
        if self.focus_requested {
            self.arbiter.abandon_focus();
            self.focus_requested = false;
        }
        self.generation = self.generation.wrapping_add(1);
        self.shared.set_position_ms(0);
    }

    /// Broadcast the domain event matching a teardown cause.
    fn announce_teardown(&self, prev: SessionState, event: SessionEvent) {
        let Some(clip_id) = prev.clip_id() else {
            return;
        };
        let timestamp = Utc::now();
        match event {
            SessionEvent::Completed => {
                info!(%clip_id, "Playback completed");
                self.shared
                    .broadcast_event(PlayerEvent::PlaybackCompleted { clip_id, timestamp });
            }
            SessionEvent::Focus(FocusChange::PermanentLoss) => {
                info!(%clip_id, "Audio focus lost permanently");
                self.shared.broadcast_event(PlayerEvent::PlaybackStopped {
                    clip_id,
                    reason: StopReason::FocusLost,
                    timestamp,
                });
            }
            SessionEvent::HostStopped => {
                info!(%clip_id, "Host stopped, playback released");
                self.shared.broadcast_event(PlayerEvent::PlaybackStopped {
                    clip_id,
                    reason: StopReason::HostStopped,
                    timestamp,
                });
            }
            _ => {}
        }
    }

    /// Publish the state snapshot when it changed.
    async fn sync_shared(&self, prev: SessionState) {
        if prev == self.state {
            return;
        }
        self.shared
            .set_session(self.state.name(), self.state.clip_id())
            .await;
        self.shared.broadcast_event(PlayerEvent::SessionStateChanged {
            state: self.state.name(),
            timestamp: Utc::now(),
        });
    }

    /// The state enum and the resource slot must agree at all times.
    fn check_invariants(&self) {
        let consistent = self.state.owns_resource() == self.resource.is_some();
        if !consistent {
            error!(state = ?self.state, slot_occupied = self.resource.is_some(),
                "Session state and resource slot disagree");
        }
        debug_assert!(consistent, "state/resource slot mismatch: {:?}", self.state);
    }
}
