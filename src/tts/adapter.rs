//! Speech engine adapter
//!
//! Wraps a [`SpeechBackend`] with the engine contract the controller relies
//! on: idempotent initialization with a single request in flight, ready
//! tracking across shutdowns, and one event stream that survives re-opens.

use super::{EngineEventSender, EngineEvents, SpeechBackend, VoiceParams};
use crate::error::{SpeakError, SpeakResult, Teardown};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

type PendingInit = Shared<BoxFuture<'static, bool>>;

pub struct SpeechEngineAdapter {
    backend: Arc<dyn SpeechBackend>,
    events: EngineEventSender,
    ready: Arc<AtomicBool>,
    /// Outstanding initialization, tagged with a generation so a finished
    /// caller never clears a newer attempt
    pending: Mutex<Option<(u64, PendingInit)>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for SpeechEngineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechEngineAdapter")
            .field("backend", &self.backend.name())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl SpeechEngineAdapter {
    /// Wrap a backend, returning the adapter and its lifecycle event stream
    pub fn new(backend: Arc<dyn SpeechBackend>) -> (Self, EngineEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let adapter = Self {
            backend,
            events,
            ready: Arc::new(AtomicBool::new(false)),
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
        };
        (adapter, rx)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Bring the engine up, resolving to whether it is ready.
    ///
    /// Returns immediately when already initialized. Concurrent callers
    /// share one in-flight attempt and all observe its outcome.
    pub async fn initialize(&self) -> bool {
        if self.is_ready() {
            return true;
        }

        let (generation, attempt) = {
            let mut pending = self.pending.lock().await;
            match pending.as_ref() {
                Some((generation, attempt)) => (*generation, attempt.clone()),
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let attempt = self.start_attempt();
                    *pending = Some((generation, attempt.clone()));
                    (generation, attempt)
                }
            }
        };

        let ready = attempt.await;

        let mut pending = self.pending.lock().await;
        if matches!(pending.as_ref(), Some((g, _)) if *g == generation) {
            *pending = None;
        }
        ready
    }

    fn start_attempt(&self) -> PendingInit {
        let backend = self.backend.clone();
        let events = self.events.clone();
        let ready = self.ready.clone();

        async move {
            match backend.open(events).await {
                Ok(()) => {
                    info!("🔊 Speech engine '{}' ready", backend.name());
                    ready.store(true, Ordering::SeqCst);
                    true
                }
                Err(e) => {
                    warn!("⚠️ Speech engine '{}' failed to initialize: {}", backend.name(), e);
                    ready.store(false, Ordering::SeqCst);
                    false
                }
            }
        }
        .boxed()
        .shared()
    }

    pub async fn configure(&self, params: &VoiceParams) -> SpeakResult<()> {
        self.require_ready()?;
        self.backend.configure(params).await
    }

    pub async fn speak(&self, text: &str, utterance_id: &str) -> SpeakResult<()> {
        self.require_ready()?;
        debug!("Submitting utterance '{}' to '{}'", utterance_id, self.backend.name());
        self.backend.speak(text, utterance_id).await
    }

    pub fn is_speaking(&self) -> bool {
        self.is_ready() && self.backend.is_speaking()
    }

    pub async fn stop(&self) -> SpeakResult<()> {
        if !self.is_ready() {
            return Ok(());
        }
        self.backend.stop().await
    }

    /// Release engine resources. `initialize` must run again before reuse.
    pub async fn shutdown(&self) -> SpeakResult<Teardown> {
        self.ready.store(false, Ordering::SeqCst);
        self.backend.close().await
    }

    fn require_ready(&self) -> SpeakResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SpeakError::EngineUnavailable(format!(
                "engine '{}' is not initialized",
                self.backend.name()
            )))
        }
    }
}
