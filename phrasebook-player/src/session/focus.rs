//! Audio focus arbitration
//!
//! The focus arbiter is an injected capability: the session asks it for
//! transient-exclusive use of the audio output device and receives later
//! focus-change notifications through the listener it registered. Tests
//! supply a scripted arbiter; production uses [`SoloFocusArbiter`].

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::session::engine::SessionMsg;

/// Focus-change notifications delivered after a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    /// Another client needs the device briefly; expect it back.
    /// Covers the duck-allowed case too: clips are too short to duck.
    TransientLoss,
    /// A transient loss ended; playback may resume.
    Regained,
    /// The device is gone for good; release everything.
    PermanentLoss,
}

/// Immediate answer to a focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusResponse {
    Granted,
    Denied,
    /// Decision arrives later through the listener.
    Pending,
}

/// Callback channel a session registers with each focus request.
///
/// Every message is stamped with the generation of the request that
/// created the listener, so the session can drop callbacks from a
/// superseded request no matter how late they arrive.
#[derive(Debug, Clone)]
pub struct FocusListener {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionMsg>,
}

impl FocusListener {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionMsg>) -> Self {
        Self { generation, tx }
    }

    /// Deliver a deferred grant/deny decision.
    pub fn decision(&self, granted: bool) {
        let _ = self.tx.send(SessionMsg::FocusDecision {
            generation: self.generation,
            granted,
        });
    }

    /// Deliver a focus-change notification.
    pub fn change(&self, change: FocusChange) {
        let _ = self.tx.send(SessionMsg::Focus {
            generation: self.generation,
            change,
        });
    }
}

/// The service mediating which single client may emit sound.
pub trait FocusArbiter: Send + Sync {
    /// Request transient-exclusive focus, registering `listener` for the
    /// decision (if deferred) and for later focus-change notifications.
    fn request_focus(&self, listener: FocusListener) -> FocusResponse;

    /// Release focus and unregister the listener. Safe to call when no
    /// focus is currently held.
    fn abandon_focus(&self);
}

/// In-process arbiter for hosts without a system focus service.
///
/// Grants to the most recent requester, synchronously, revoking the
/// previous holder with `PermanentLoss` first.
#[derive(Debug, Default)]
pub struct SoloFocusArbiter {
    holder: Mutex<Option<FocusListener>>,
}

impl SoloFocusArbiter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FocusArbiter for SoloFocusArbiter {
    fn request_focus(&self, listener: FocusListener) -> FocusResponse {
        let mut holder = self.holder.lock().unwrap();
        if let Some(previous) = holder.take() {
            debug!("Revoking focus from previous holder");
            previous.change(FocusChange::PermanentLoss);
        }
        *holder = Some(listener);
        FocusResponse::Granted
    }

    fn abandon_focus(&self) {
        self.holder.lock().unwrap().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener(generation: u64) -> (FocusListener, mpsc::UnboundedReceiver<SessionMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FocusListener::new(generation, tx), rx)
    }

    #[test]
    fn test_solo_arbiter_grants() {
        let arbiter = SoloFocusArbiter::new();
        let (l, _rx) = listener(0);
        assert_eq!(arbiter.request_focus(l), FocusResponse::Granted);
    }

    #[test]
    fn test_solo_arbiter_revokes_previous_holder() {
        let arbiter = SoloFocusArbiter::new();
        let (first, mut first_rx) = listener(0);
        let (second, _second_rx) = listener(1);

        arbiter.request_focus(first);
        arbiter.request_focus(second);

        match first_rx.try_recv() {
            Ok(SessionMsg::Focus {
                generation,
                change: FocusChange::PermanentLoss,
            }) => assert_eq!(generation, 0),
            other => panic!("expected permanent loss, got {:?}", other),
        }
    }

    #[test]
    fn test_solo_arbiter_abandon_is_idempotent() {
        let arbiter = SoloFocusArbiter::new();
        let (l, mut rx) = listener(0);

        arbiter.request_focus(l);
        arbiter.abandon_focus();
        arbiter.abandon_focus();

        // Abandoning never notifies the (former) holder
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_listener_stamps_generation() {
        let (l, mut rx) = listener(7);
        l.decision(true);
        l.change(FocusChange::TransientLoss);

        match rx.try_recv() {
            Ok(SessionMsg::FocusDecision {
                generation,
                granted,
            }) => {
                assert_eq!(generation, 7);
                assert!(granted);
            }
            other => panic!("expected decision, got {:?}", other),
        }
        match rx.try_recv() {
            Ok(SessionMsg::Focus { generation, .. }) => assert_eq!(generation, 7),
            other => panic!("expected focus change, got {:?}", other),
        }
    }
}
