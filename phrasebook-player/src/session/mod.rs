//! Playback session: state machine, focus arbitration, resource ownership

pub mod engine;
pub mod focus;
pub mod machine;
pub mod resource;

pub use engine::{PlaybackSession, SessionHandle, SessionMsg};
pub use focus::{FocusArbiter, FocusChange, FocusListener, FocusResponse, SoloFocusArbiter};
pub use machine::{Action, SessionEvent, SessionState, Transition};
pub use resource::{AudioBackend, CompletionHook, PlaybackResource};
