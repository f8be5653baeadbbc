//! TTS (Text-to-Speech) Module
//!
//! A [`SpeechBackend`] is the raw platform capability; the
//! [`SpeechEngineAdapter`] wraps one with ready tracking, shared
//! initialization and the lifecycle event stream.

use crate::config::Config;
use crate::error::{SpeakResult, Teardown};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod adapter;
pub mod simulated;
pub mod system;

pub use adapter::SpeechEngineAdapter;

/// Lifecycle signal for the utterance currently playing on a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Started(String),
    Done(String),
    Failed(String),
}

impl EngineEvent {
    pub fn utterance_id(&self) -> &str {
        match self {
            EngineEvent::Started(id) | EngineEvent::Done(id) | EngineEvent::Failed(id) => id,
        }
    }
}

pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

/// Synthesis parameters applied before the next `speak`
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
    pub language: String,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            language: "ko".to_string(),
        }
    }
}

/// Trait for speech synthesis backends
///
/// Backends emit exactly one `Started` and then one of `Done`/`Failed` per
/// playback attempt. A caller-initiated `stop` must not produce an event.
#[async_trait]
pub trait SpeechBackend: Send + Sync + std::fmt::Debug {
    /// Acquire engine resources; lifecycle events go to `events`
    async fn open(&self, events: EngineEventSender) -> SpeakResult<()>;

    async fn configure(&self, params: &VoiceParams) -> SpeakResult<()>;

    /// Submit text, discarding anything queued or playing
    async fn speak(&self, text: &str, utterance_id: &str) -> SpeakResult<()>;

    fn is_speaking(&self) -> bool;

    /// Halt playback; safe when idle
    async fn stop(&self) -> SpeakResult<()>;

    /// Release engine resources; `open` must be called again before reuse
    async fn close(&self) -> SpeakResult<Teardown>;

    /// Get the backend name
    fn name(&self) -> &str;
}

/// Factory to create the configured backend
pub fn create_backend(config: &Config) -> Arc<dyn SpeechBackend> {
    info!("🛠️ Creating speech backend: {}", config.engine);
    let backend: Arc<dyn SpeechBackend> = match config.engine.as_str() {
        "system" => Arc::new(system::SystemBackend::new()),
        "simulated" => Arc::new(simulated::SimulatedBackend::new(
            config.simulated_chars_per_second,
        )),
        other => {
            warn!("  - Unknown engine '{}', falling back to System", other);
            Arc::new(system::SystemBackend::new())
        }
    };
    info!("✅ Speech backend '{}' created", backend.name());
    backend
}
