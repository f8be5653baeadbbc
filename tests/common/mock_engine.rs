//! Mock Speech Backend for Testing
//!
//! Records every call and lets the test decide when playback finishes.

use async_trait::async_trait;
use speakbridge::error::{SpeakError, SpeakResult, Teardown};
use speakbridge::tts::{EngineEvent, EngineEventSender, SpeechBackend, VoiceParams};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Backend that reports `Started` on speak; `finish`/`fail` end playback
#[derive(Debug, Default)]
pub struct MockBackend {
    /// (utterance id, text) for every accepted speak
    pub spoken: Mutex<Vec<(String, String)>>,
    pub configured: Mutex<Vec<VoiceParams>>,
    pub opens: AtomicUsize,
    pub stops: AtomicUsize,
    /// Simulate initialization failure
    pub fail_open: AtomicBool,
    /// Simulate teardown failure
    pub fail_close: AtomicBool,
    speaking: AtomicBool,
    events: Mutex<Option<EngineEventSender>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken_ids(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Natural completion of the playing utterance
    pub fn finish(&self, id: &str) {
        self.end(EngineEvent::Done(id.to_string()));
    }

    /// Playback failure of the playing utterance
    pub fn fail(&self, id: &str) {
        self.end(EngineEvent::Failed(id.to_string()));
    }

    fn end(&self, event: EngineEvent) {
        self.speaking.store(false, Ordering::SeqCst);
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.send(event).unwrap();
        }
    }
}

#[async_trait]
impl SpeechBackend for MockBackend {
    async fn open(&self, events: EngineEventSender) -> SpeakResult<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(SpeakError::EngineUnavailable("Mock engine failure".into()));
        }
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn configure(&self, params: &VoiceParams) -> SpeakResult<()> {
        self.configured.lock().unwrap().push(params.clone());
        Ok(())
    }

    async fn speak(&self, text: &str, utterance_id: &str) -> SpeakResult<()> {
        self.spoken
            .lock()
            .unwrap()
            .push((utterance_id.to_string(), text.to_string()));
        self.speaking.store(true, Ordering::SeqCst);
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events
                .send(EngineEvent::Started(utterance_id.to_string()))
                .unwrap();
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn stop(&self) -> SpeakResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> SpeakResult<Teardown> {
        self.speaking.store(false, Ordering::SeqCst);
        let held = self.events.lock().unwrap().take().is_some();
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(SpeakError::Teardown("Mock teardown failure".into()));
        }
        Ok(if held {
            Teardown::Released
        } else {
            Teardown::AlreadyReleased
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
