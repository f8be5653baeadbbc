//! Speech Controller
//!
//! Owns the single in-flight utterance and arbitrates start, pause, resume
//! and stop requests against engine and volume state. Every outcome leaves
//! as a [`StatusEvent`] through the injected [`StatusSink`].
//!
//! The controller is not shared: all methods take `&mut self`, and engine
//! lifecycle events are fed back in through [`SpeechController::handle_engine_event`]
//! by whoever owns it (see [`crate::session`]).

use crate::error::Teardown;
use crate::status::{StatusEvent, StatusKind, StatusSink};
use crate::tts::{EngineEvent, SpeechEngineAdapter, VoiceParams};
use crate::utterance::{ActiveUtterance, Utterance};
use crate::volume::VolumeProbe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Coarse playback phase derived from [`ControllerState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Speaking,
    Paused,
}

/// Controller state; `paused` implies `current` is set
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ControllerState {
    pub engine_ready: bool,
    pub paused: bool,
    /// Set by an accepted resume, consumed by the next engine start
    pub resuming: bool,
    pub current: Option<ActiveUtterance>,
}

impl ControllerState {
    pub fn phase(&self) -> Phase {
        match (&self.current, self.paused) {
            (Some(_), true) => Phase::Paused,
            (Some(_), false) => Phase::Speaking,
            (None, _) => Phase::Idle,
        }
    }

    fn reset(&mut self) {
        self.engine_ready = false;
        self.paused = false;
        self.resuming = false;
        self.current = None;
    }
}

pub struct SpeechController {
    engine: SpeechEngineAdapter,
    volume: Arc<dyn VolumeProbe>,
    sink: Arc<dyn StatusSink>,
    language: String,
    state: ControllerState,
}

impl SpeechController {
    pub fn new(
        engine: SpeechEngineAdapter,
        volume: Arc<dyn VolumeProbe>,
        sink: Arc<dyn StatusSink>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            volume,
            sink,
            language: language.into(),
            state: ControllerState::default(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Request playback of `utterance`, reporting to `callback`
    pub async fn speak(&mut self, utterance: Utterance, callback: &str) {
        self.admit(utterance, callback, false).await;
    }

    /// Suspend the current utterance. Ignored unless the engine is speaking
    /// and playback is not already paused.
    pub async fn pause(&mut self, callback: &str) {
        if self.state.paused || !self.engine.is_speaking() {
            debug!("Pause ignored: nothing audible");
            return;
        }
        let Some(id) = self.state.current.as_ref().map(|a| a.id().to_string()) else {
            debug!("Pause ignored: no current utterance");
            return;
        };

        self.state.paused = true;
        if let Err(e) = self.engine.stop().await {
            warn!("⚠️ Engine stop on pause failed: {}", e);
        }
        info!("⏸️ Paused '{}'", id);
        self.emit(&id, callback, StatusKind::Pause);
    }

    /// Resume a paused utterance by re-submitting it through admission
    pub async fn resume(&mut self, callback: &str) {
        if !self.state.paused {
            debug!("Resume ignored: not paused");
            return;
        }
        let Some(active) = self.state.current.clone() else {
            warn!("⚠️ Paused without a current utterance; clearing");
            self.state.paused = false;
            return;
        };

        self.state.paused = false;
        self.state.resuming = true;
        info!("▶️ Resuming '{}'", active.id());
        self.admit(active.utterance, callback, true).await;
    }

    /// Terminate the current utterance. Ignored when there is none.
    pub async fn stop(&mut self, callback: &str) {
        let Some(active) = self.state.current.take() else {
            debug!("Stop ignored: no current utterance");
            return;
        };

        self.emit(active.id(), callback, StatusKind::Stop);
        self.state.paused = false;
        self.state.resuming = false;
        if let Err(e) = self.engine.stop().await {
            warn!("⚠️ Engine stop failed: {}", e);
        }
        info!("🛑 Stopped '{}'", active.id());
    }

    /// Release the engine and return to idle
    pub async fn shutdown(&mut self) {
        self.release().await;
    }

    /// Translate an engine lifecycle signal into a status
    pub async fn handle_engine_event(&mut self, event: EngineEvent) {
        let Some(active) = self.state.current.as_ref() else {
            debug!("Dropping {:?}: no current utterance", event);
            return;
        };
        if active.id() != event.utterance_id() {
            debug!("Dropping stale {:?} (current '{}')", event, active.id());
            return;
        }
        if self.state.paused {
            debug!("Dropping {:?} while paused", event);
            return;
        }
        let callback = active.callback.clone();

        match event {
            EngineEvent::Started(id) => {
                let status = if self.state.resuming {
                    self.state.resuming = false;
                    StatusKind::Resume
                } else {
                    StatusKind::Start
                };
                self.emit(&id, &callback, status);
            }
            EngineEvent::Done(id) => {
                info!("✅ Finished '{}'", id);
                self.finish(&id, &callback, StatusKind::Done).await;
            }
            EngineEvent::Failed(id) => {
                error!("❌ Playback of '{}' failed", id);
                self.finish(&id, &callback, StatusKind::Error).await;
            }
        }
    }

    async fn admit(&mut self, utterance: Utterance, callback: &str, resumed: bool) {
        self.state.engine_ready = self.engine.initialize().await;

        if self.engine.is_speaking() || self.state.paused {
            self.reject(&utterance, callback, StatusKind::Playing, resumed);
            return;
        }

        match self.volume.current_volume().await {
            Ok(0) => {
                self.reject(&utterance, callback, StatusKind::Muted, resumed);
                return;
            }
            Ok(_) => {}
            Err(e) => warn!("⚠️ Volume unknown, assuming audible: {}", e),
        }

        if !self.state.engine_ready {
            self.reject(&utterance, callback, StatusKind::Error, resumed);
            return;
        }

        let params = VoiceParams {
            rate: utterance.rate,
            pitch: utterance.pitch,
            language: self.language.clone(),
        };
        if let Err(e) = self.engine.configure(&params).await {
            error!("❌ Engine configure failed: {}", e);
            self.emit(&utterance.id, callback, StatusKind::Error);
            self.release().await;
            return;
        }

        let id = utterance.id.clone();
        let text = utterance.text.clone();
        self.state.current = Some(ActiveUtterance {
            utterance,
            callback: callback.to_string(),
        });

        if let Err(e) = self.engine.speak(&text, &id).await {
            error!("❌ Engine rejected '{}': {}", id, e);
            self.emit(&id, callback, StatusKind::Error);
            self.release().await;
            return;
        }
        info!("🗣️ Speaking '{}' via {}", id, self.engine.backend_name());
    }

    /// Report a refused admission. A refused resume keeps the utterance
    /// paused, except for ERROR which ends it.
    fn reject(&mut self, utterance: &Utterance, callback: &str, status: StatusKind, resumed: bool) {
        debug!("Rejecting '{}' with {}", utterance.id, status);
        self.emit(&utterance.id, callback, status);

        if !resumed {
            return;
        }
        self.state.resuming = false;
        if status == StatusKind::Error {
            warn!("⚠️ Resume of '{}' failed; discarding it", utterance.id);
            self.state.current = None;
        } else {
            warn!("⚠️ Resume of '{}' refused with {}; still paused", utterance.id, status);
            self.state.paused = true;
        }
    }

    async fn finish(&mut self, id: &str, callback: &str, status: StatusKind) {
        self.state.paused = false;
        self.state.resuming = false;
        self.emit(id, callback, status);
        self.release().await;
    }

    async fn release(&mut self) {
        self.state.reset();
        match self.engine.shutdown().await {
            Ok(Teardown::Released) => debug!("Speech engine released"),
            Ok(Teardown::AlreadyReleased) => debug!("Speech engine already released"),
            Err(e) => warn!("⚠️ Speech engine teardown failed: {}", e),
        }
    }

    fn emit(&self, utterance_id: &str, callback: &str, status: StatusKind) {
        debug!("Status {} for '{}' -> {}", status, utterance_id, callback);
        self.sink.deliver(StatusEvent::new(utterance_id, callback, status));
    }
}
