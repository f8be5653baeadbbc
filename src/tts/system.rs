//! System TTS backend driving `spd-say` or `espeak-ng`
//!
//! Each utterance is one child process. Natural exit reports `Done` or
//! `Failed`; a stop kills the child and reports nothing.

use super::{EngineEvent, EngineEventSender, SpeechBackend, VoiceParams};
use crate::error::{SpeakError, SpeakResult, Teardown};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Synthesis programs tried in order at `open`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    SpdSay,
    EspeakNg,
}

impl Program {
    pub const CANDIDATES: [Program; 2] = [Program::SpdSay, Program::EspeakNg];

    pub fn binary(self) -> &'static str {
        match self {
            Program::SpdSay => "spd-say",
            Program::EspeakNg => "espeak-ng",
        }
    }

    /// Command-line arguments for speaking `text` with `params`
    pub fn args(self, params: &VoiceParams, text: &str) -> Vec<String> {
        // A leading dash would be parsed as an option
        let text = if text.starts_with('-') {
            format!(" {}", text)
        } else {
            text.to_string()
        };

        match self {
            Program::SpdSay => {
                let rate = ((params.rate - 1.0) * 100.0).round().clamp(-100.0, 100.0) as i32;
                let pitch = ((params.pitch - 1.0) * 100.0).round().clamp(-100.0, 100.0) as i32;
                vec![
                    "-w".to_string(),
                    "-r".to_string(),
                    rate.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                    "-l".to_string(),
                    params.language.clone(),
                    text,
                ]
            }
            Program::EspeakNg => {
                let wpm = (175.0 * params.rate).round().clamp(80.0, 450.0) as u32;
                let pitch = (50.0 * params.pitch).round().clamp(0.0, 99.0) as u32;
                vec![
                    "-s".to_string(),
                    wpm.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                    "-v".to_string(),
                    params.language.clone(),
                    text,
                ]
            }
        }
    }
}

#[derive(Debug, Default)]
struct Playback {
    program: Option<Program>,
    events: Option<EngineEventSender>,
    params: VoiceParams,
    kill: Option<oneshot::Sender<()>>,
}

#[derive(Debug)]
pub struct SystemBackend {
    state: Mutex<Playback>,
    /// Bumped on every speak and stop; watchers of older children stay silent
    generation: Arc<AtomicU64>,
    speaking: Arc<AtomicBool>,
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Playback::default()),
            generation: Arc::new(AtomicU64::new(0)),
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn detect_program() -> Option<Program> {
        for program in Program::CANDIDATES {
            let probe = Command::new(program.binary())
                .arg("--version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if probe.is_ok() {
                return Some(program);
            }
            debug!("{} not available", program.binary());
        }
        None
    }

    fn halt(&self, state: &mut Playback) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
        if let Some(kill) = state.kill.take() {
            let _ = kill.send(());
        }
    }
}

#[async_trait]
impl SpeechBackend for SystemBackend {
    async fn open(&self, events: EngineEventSender) -> SpeakResult<()> {
        let program = Self::detect_program().await.ok_or_else(|| {
            SpeakError::EngineUnavailable(
                "No system TTS command found (tried spd-say, espeak-ng)".to_string(),
            )
        })?;
        info!("🔊 System TTS using {}", program.binary());

        let mut state = self.state.lock()?;
        state.program = Some(program);
        state.events = Some(events);
        Ok(())
    }

    async fn configure(&self, params: &VoiceParams) -> SpeakResult<()> {
        self.state.lock()?.params = params.clone();
        Ok(())
    }

    async fn speak(&self, text: &str, utterance_id: &str) -> SpeakResult<()> {
        let mut state = self.state.lock()?;
        let (program, events) = match (state.program, state.events.clone()) {
            (Some(program), Some(events)) => (program, events),
            _ => {
                return Err(SpeakError::EngineUnavailable(
                    "system backend is not open".to_string(),
                ))
            }
        };

        // Flush whatever is playing
        self.halt(&mut state);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        debug!("System speaking via {}: {}", program.binary(), text);
        let mut child = Command::new(program.binary())
            .args(program.args(&state.params, text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SpeakError::Engine(format!("Failed to spawn {}: {}", program.binary(), e))
            })?;

        let (kill_tx, kill_rx) = oneshot::channel();
        state.kill = Some(kill_tx);
        self.speaking.store(true, Ordering::SeqCst);
        drop(state);

        let id = utterance_id.to_string();
        let _ = events.send(EngineEvent::Started(id.clone()));

        let current = self.generation.clone();
        let speaking = self.speaking.clone();
        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = kill_rx => None,
            };

            let Some(status) = exited else {
                if let Err(e) = child.kill().await {
                    debug!("Kill of {} failed: {}", program.binary(), e);
                }
                return;
            };

            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            speaking.store(false, Ordering::SeqCst);
            let event = match status {
                Ok(status) if status.success() => EngineEvent::Done(id),
                Ok(status) => {
                    warn!("⚠️ {} exited with {}", program.binary(), status);
                    EngineEvent::Failed(id)
                }
                Err(e) => {
                    warn!("⚠️ Failed waiting on {}: {}", program.binary(), e);
                    EngineEvent::Failed(id)
                }
            };
            let _ = events.send(event);
        });

        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    async fn stop(&self) -> SpeakResult<()> {
        let mut state = self.state.lock()?;
        self.halt(&mut state);
        Ok(())
    }

    async fn close(&self) -> SpeakResult<Teardown> {
        let mut state = self.state.lock()?;
        self.halt(&mut state);
        state.events = None;
        match state.program.take() {
            Some(_) => Ok(Teardown::Released),
            None => Ok(Teardown::AlreadyReleased),
        }
    }

    fn name(&self) -> &str {
        "system"
    }
}
