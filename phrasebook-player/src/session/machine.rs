//! Playback session state machine
//!
//! One pure transition function over a tagged event union. The engine owns
//! the side effects; this module only decides what the next state is and
//! which effect the engine must carry out. Keeping it free of channels and
//! audio types makes the whole transition table unit-testable on its own.

use phrasebook_common::events::SessionStateName;
use uuid::Uuid;

use crate::session::focus::FocusChange;

/// Playback session states
///
/// `Idle` holds no resource and no focus registration; `Playing` and
/// `Paused` are the only states that own a live decode/output resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    FocusRequested { clip_id: Uuid },
    Playing { clip_id: Uuid },
    Paused { clip_id: Uuid },
}

impl SessionState {
    /// Clip the session is currently working with, if any.
    pub fn clip_id(&self) -> Option<Uuid> {
        match self {
            SessionState::Idle => None,
            SessionState::FocusRequested { clip_id }
            | SessionState::Playing { clip_id }
            | SessionState::Paused { clip_id } => Some(*clip_id),
        }
    }

    /// True iff this state owns a live decode/output resource.
    pub fn owns_resource(&self) -> bool {
        matches!(
            self,
            SessionState::Playing { .. } | SessionState::Paused { .. }
        )
    }

    pub fn name(&self) -> SessionStateName {
        match self {
            SessionState::Idle => SessionStateName::Idle,
            SessionState::FocusRequested { .. } => SessionStateName::FocusRequested,
            SessionState::Playing { .. } => SessionStateName::Playing,
            SessionState::Paused { .. } => SessionStateName::Paused,
        }
    }
}

/// Everything that can happen to a session, as one tagged union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user selected a clip (already validated against the catalog).
    Select { clip_id: Uuid },
    /// The arbiter granted the outstanding focus request.
    FocusGranted,
    /// The arbiter refused the outstanding focus request.
    FocusDenied,
    /// A focus-change notification arrived after a grant.
    Focus(FocusChange),
    /// The resource reached end-of-clip naturally.
    Completed,
    /// The hosting surface stopped.
    HostStopped,
}

/// Side effect the engine must carry out for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Release the resource (if any) and abandon focus.
    Teardown,
    /// Teardown, then issue a new transient-exclusive focus request.
    TeardownThenRequestFocus { clip_id: Uuid },
    /// Create the decode/output resource for the clip and start it.
    StartResource { clip_id: Uuid },
    /// Halt the resource in place, retaining its position.
    PauseResource,
    /// Resume the resource from its retained position.
    ResumeResource,
}

/// Result of applying one event to one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub action: Action,
}

/// The single transition function.
///
/// Unlisted state/event pairs hold the current state with no effect: a
/// late grant after a reselection, a focus change after teardown, or a
/// duplicate completion all fall through here and die quietly.
pub fn apply(state: SessionState, event: SessionEvent) -> Transition {
    use SessionState::{FocusRequested, Idle, Paused, Playing};

    match (state, event) {
        // A new selection always supersedes whatever exists.
        (_, SessionEvent::Select { clip_id }) => Transition {
            next: FocusRequested { clip_id },
            action: Action::TeardownThenRequestFocus { clip_id },
        },

        (FocusRequested { clip_id }, SessionEvent::FocusGranted) => Transition {
            next: Playing { clip_id },
            action: Action::StartResource { clip_id },
        },

        // Denial is reported, not fatal: no resource was ever created.
        (FocusRequested { .. }, SessionEvent::FocusDenied) => Transition {
            next: Idle,
            action: Action::None,
        },

        // Short clips: transient loss pauses in place instead of ducking.
        (Playing { clip_id }, SessionEvent::Focus(FocusChange::TransientLoss)) => Transition {
            next: Paused { clip_id },
            action: Action::PauseResource,
        },

        (Paused { clip_id }, SessionEvent::Focus(FocusChange::Regained)) => Transition {
            next: Playing { clip_id },
            action: Action::ResumeResource,
        },

        // Permanent loss is the strongest interruption: full teardown,
        // whatever was pending.
        (
            FocusRequested { .. } | Playing { .. } | Paused { .. },
            SessionEvent::Focus(FocusChange::PermanentLoss),
        ) => Transition {
            next: Idle,
            action: Action::Teardown,
        },

        // Natural end of clip converges on the same state as permanent loss.
        (Playing { .. } | Paused { .. }, SessionEvent::Completed) => Transition {
            next: Idle,
            action: Action::Teardown,
        },

        // Host stop from Idle stays a no-op so repeated stops have no
        // observable second effect.
        (Idle, SessionEvent::HostStopped) => Transition {
            next: Idle,
            action: Action::None,
        },

        (_, SessionEvent::HostStopped) => Transition {
            next: Idle,
            action: Action::Teardown,
        },

        // Stale or late notifications.
        (state, _) => Transition {
            next: state,
            action: Action::None,
        },
    }
}
