//! Speech Session
//!
//! Runs one [`SpeechController`] on its own task. Control requests and
//! engine lifecycle events are both delivered to that task, so controller
//! state is only ever touched from one place.

use crate::config::Config;
use crate::controller::SpeechController;
use crate::error::{SpeakError, SpeakResult};
use crate::status::StatusSink;
use crate::tts::{EngineEvents, SpeechBackend, SpeechEngineAdapter};
use crate::utterance::Utterance;
use crate::volume::VolumeProbe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Requests accepted by a running session
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    Speak { utterance: Utterance, callback: String },
    Pause { callback: String },
    Resume { callback: String },
    Stop { callback: String },
    Shutdown,
}

/// Cloneable, non-blocking handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: mpsc::UnboundedSender<ControlRequest>,
}

impl SessionHandle {
    /// Handle whose requests are read by the caller rather than a session task
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<ControlRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { requests: tx }, rx)
    }

    pub fn send(&self, request: ControlRequest) -> SpeakResult<()> {
        self.requests
            .send(request)
            .map_err(|_| SpeakError::SessionClosed)
    }

    pub fn speak(&self, utterance: Utterance, callback: impl Into<String>) -> SpeakResult<()> {
        self.send(ControlRequest::Speak {
            utterance,
            callback: callback.into(),
        })
    }

    pub fn pause(&self, callback: impl Into<String>) -> SpeakResult<()> {
        self.send(ControlRequest::Pause {
            callback: callback.into(),
        })
    }

    pub fn resume(&self, callback: impl Into<String>) -> SpeakResult<()> {
        self.send(ControlRequest::Resume {
            callback: callback.into(),
        })
    }

    pub fn stop(&self, callback: impl Into<String>) -> SpeakResult<()> {
        self.send(ControlRequest::Stop {
            callback: callback.into(),
        })
    }

    /// Ask the session to release the engine and exit
    pub fn shutdown(&self) -> SpeakResult<()> {
        self.send(ControlRequest::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

pub struct SpeechSession;

impl SpeechSession {
    /// Wire a backend, volume probe and status sink into a running session
    pub fn start(
        config: &Config,
        backend: Arc<dyn SpeechBackend>,
        volume: Arc<dyn VolumeProbe>,
        sink: Arc<dyn StatusSink>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (engine, events) = SpeechEngineAdapter::new(backend);
        let controller = SpeechController::new(engine, volume, sink, config.language.clone());
        Self::spawn(controller, events)
    }

    /// Run an already-built controller on its own task
    pub fn spawn(controller: SpeechController, events: EngineEvents) -> (SessionHandle, JoinHandle<()>) {
        let (handle, requests) = SessionHandle::detached();
        let task = tokio::spawn(Self::run(controller, requests, events));
        (handle, task)
    }

    async fn run(
        mut controller: SpeechController,
        mut requests: mpsc::UnboundedReceiver<ControlRequest>,
        mut events: EngineEvents,
    ) {
        info!("🎙️ Speech session started");

        loop {
            tokio::select! {
                // Engine events first: a start already signalled must be
                // reported before a later pause or stop is applied.
                biased;

                Some(event) = events.recv() => {
                    controller.handle_engine_event(event).await;
                }
                request = requests.recv() => {
                    match request {
                        Some(ControlRequest::Shutdown) | None => break,
                        Some(request) => Self::apply(&mut controller, request).await,
                    }
                }
            }
        }

        controller.shutdown().await;
        info!("🔇 Speech session stopped");
    }

    async fn apply(controller: &mut SpeechController, request: ControlRequest) {
        debug!("Applying {:?}", request);
        match request {
            ControlRequest::Speak {
                utterance,
                callback,
            } => controller.speak(utterance, &callback).await,
            ControlRequest::Pause { callback } => controller.pause(&callback).await,
            ControlRequest::Resume { callback } => controller.resume(&callback).await,
            ControlRequest::Stop { callback } => controller.stop(&callback).await,
            ControlRequest::Shutdown => controller.shutdown().await,
        }
    }
}
