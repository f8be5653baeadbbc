//! Simulated TTS backend
//!
//! Produces real lifecycle events on a timer without touching audio
//! hardware. Useful for dry runs of the bridge.

use super::{EngineEvent, EngineEventSender, SpeechBackend, VoiceParams};
use crate::error::{SpeakError, SpeakResult, Teardown};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Longest simulated utterance; tiny rates would otherwise overflow `Duration`
const MAX_PLAYBACK: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
pub struct SimulatedBackend {
    chars_per_second: f32,
    events: Mutex<Option<EngineEventSender>>,
    params: Mutex<VoiceParams>,
    generation: Arc<AtomicU64>,
    speaking: Arc<AtomicBool>,
}

impl SimulatedBackend {
    pub fn new(chars_per_second: f32) -> Self {
        Self {
            chars_per_second: if chars_per_second > 0.0 {
                chars_per_second
            } else {
                15.0
            },
            events: Mutex::new(None),
            params: Mutex::new(VoiceParams::default()),
            generation: Arc::new(AtomicU64::new(0)),
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    /// How long `text` plays at `rate`
    pub fn duration_for(&self, text: &str, rate: f32) -> Duration {
        let rate = if rate > 0.0 { rate } else { 1.0 };
        let chars = text.chars().count() as f32;
        Duration::try_from_secs_f32(chars / (self.chars_per_second * rate))
            .unwrap_or(MAX_PLAYBACK)
            .min(MAX_PLAYBACK)
    }
}

#[async_trait]
impl SpeechBackend for SimulatedBackend {
    async fn open(&self, events: EngineEventSender) -> SpeakResult<()> {
        *self.events.lock()? = Some(events);
        Ok(())
    }

    async fn configure(&self, params: &VoiceParams) -> SpeakResult<()> {
        *self.params.lock()? = params.clone();
        Ok(())
    }

    async fn speak(&self, text: &str, utterance_id: &str) -> SpeakResult<()> {
        let events = self.events.lock()?.clone().ok_or_else(|| {
            SpeakError::EngineUnavailable("simulated backend is not open".to_string())
        })?;
        let rate = self.params.lock()?.rate;
        let duration = self.duration_for(text, rate);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.speaking.store(true, Ordering::SeqCst);

        let id = utterance_id.to_string();
        debug!("Simulating '{}' for {:?}", id, duration);
        let _ = events.send(EngineEvent::Started(id.clone()));

        let current = self.generation.clone();
        let speaking = self.speaking.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            speaking.store(false, Ordering::SeqCst);
            let _ = events.send(EngineEvent::Done(id));
        });
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn stop(&self) -> SpeakResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> SpeakResult<Teardown> {
        self.stop().await?;
        match self.events.lock()?.take() {
            Some(_) => Ok(Teardown::Released),
            None => Ok(Teardown::AlreadyReleased),
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
