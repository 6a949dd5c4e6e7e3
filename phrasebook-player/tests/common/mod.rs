//! Shared test doubles: a scripted focus arbiter and a recording audio
//! backend, so tests can grant/deny/revoke focus on command and observe
//! every resource the session ever creates.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use phrasebook_common::events::PlayerEvent;
use phrasebook_player::error::{Error, Result};
use phrasebook_player::session::{
    AudioBackend, CompletionHook, FocusArbiter, FocusChange, FocusListener, FocusResponse,
    PlaybackResource,
};

/// Focus arbiter driven by a scripted list of responses.
///
/// Responses are consumed per request; when the script runs out, further
/// requests are granted. Every registered listener is retained so tests
/// can deliver focus changes or late decisions to any of them.
pub struct ScriptedArbiter {
    responses: Mutex<VecDeque<FocusResponse>>,
    listeners: Mutex<Vec<FocusListener>>,
    pub requests: AtomicUsize,
    pub abandons: AtomicUsize,
}

impl ScriptedArbiter {
    pub fn granting() -> Arc<Self> {
        Self::with_responses(vec![])
    }

    pub fn with_responses(responses: Vec<FocusResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            listeners: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
            abandons: AtomicUsize::new(0),
        })
    }

    /// Listener registered by the n-th focus request (0-based).
    pub fn listener(&self, n: usize) -> FocusListener {
        self.listeners.lock().unwrap()[n].clone()
    }

    /// Deliver a focus change through the most recent listener.
    pub fn change(&self, change: FocusChange) {
        self.listeners
            .lock()
            .unwrap()
            .last()
            .expect("no focus request was made")
            .change(change);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn abandon_count(&self) -> usize {
        self.abandons.load(Ordering::SeqCst)
    }
}

impl FocusArbiter for ScriptedArbiter {
    fn request_focus(&self, listener: FocusListener) -> FocusResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FocusResponse::Granted);
        self.listeners.lock().unwrap().push(listener);
        response
    }

    fn abandon_focus(&self) {
        self.abandons.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counters shared between the backend and its resources.
#[derive(Default)]
pub struct BackendCounters {
    pub created: AtomicUsize,
    pub released: AtomicUsize,
    pub live: AtomicIsize,
    pub max_live: AtomicIsize,
}

/// Observable state of one created resource.
pub struct ResourceProbe {
    pub audio: PathBuf,
    started: AtomicBool,
    paused: AtomicBool,
    released: AtomicBool,
    position: Mutex<Duration>,
    completion: Mutex<Option<CompletionHook>>,
}

impl ResourceProbe {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn position(&self) -> Duration {
        *self.position.lock().unwrap()
    }

    /// Simulate playback progress up to `position`.
    pub fn set_position(&self, position: Duration) {
        *self.position.lock().unwrap() = position;
    }

    /// Simulate the clip reaching its natural end.
    pub fn complete(&self) {
        self.completion
            .lock()
            .unwrap()
            .take()
            .expect("completion already fired")
            .fire();
    }
}

/// Audio backend recording every resource it creates.
pub struct RecordingBackend {
    pub counters: Arc<BackendCounters>,
    pub fail_next: AtomicBool,
    probes: Mutex<Vec<Arc<ResourceProbe>>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            counters: Arc::new(BackendCounters::default()),
            fail_next: AtomicBool::new(false),
            probes: Mutex::new(Vec::new()),
        })
    }

    pub fn probe(&self, n: usize) -> Arc<ResourceProbe> {
        Arc::clone(&self.probes.lock().unwrap()[n])
    }

    pub fn last_probe(&self) -> Arc<ResourceProbe> {
        Arc::clone(self.probes.lock().unwrap().last().expect("no resource was created"))
    }

    pub fn created_count(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> isize {
        self.counters.max_live.load(Ordering::SeqCst)
    }
}

struct RecordedResource {
    probe: Arc<ResourceProbe>,
    counters: Arc<BackendCounters>,
}

impl PlaybackResource for RecordedResource {
    fn start(&mut self) -> Result<()> {
        self.probe.started.store(true, Ordering::SeqCst);
        self.probe.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.probe.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        *self.probe.position.lock().unwrap() = position;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.probe.position()
    }

    fn release(self: Box<Self>) {
        self.probe.released.store(true, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AudioBackend for RecordingBackend {
    fn create(
        &self,
        audio: &Path,
        completion: CompletionHook,
    ) -> Result<Box<dyn PlaybackResource>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Decode("scripted create failure".to_string()));
        }

        let probe = Arc::new(ResourceProbe {
            audio: audio.to_path_buf(),
            started: AtomicBool::new(false),
            paused: AtomicBool::new(true),
            released: AtomicBool::new(false),
            position: Mutex::new(Duration::ZERO),
            completion: Mutex::new(Some(completion)),
        });
        self.probes.lock().unwrap().push(Arc::clone(&probe));

        self.counters.created.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(RecordedResource {
            probe,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Await the first broadcast event matching `pred`, with a timeout.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<PlayerEvent>,
    mut pred: F,
) -> PlayerEvent
where
    F: FnMut(&PlayerEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
