//! Bridge Dispatcher
//!
//! Entry point for messages posted by the embedded surface. Validates
//! them, routes control actions to the speech session and, depending on
//! policy, reports malformed messages back to the caller.

use super::messages::{parse_message, Inbound, MalformedMessage, SpeakAction, SpeakRequest};
use super::script::{ScriptSink, Surface};
use crate::config::{Config, MalformedPolicy};
use crate::session::{ControlRequest, SessionHandle, SpeechSession};
use crate::status::{StatusEvent, StatusKind, StatusSink};
use crate::tts::SpeechBackend;
use crate::volume::VolumeProbe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the session
    Routed,
    /// Outside this protocol; nothing reported
    Ignored,
    /// Invalid and dropped after logging
    Dropped,
    /// Invalid and reported to the caller as ERROR
    Reported,
    /// Valid, but the session is no longer running
    Undeliverable,
}

pub struct BridgeDispatcher {
    session: SessionHandle,
    sink: Arc<dyn StatusSink>,
    policy: MalformedPolicy,
}

impl BridgeDispatcher {
    pub fn new(session: SessionHandle, sink: Arc<dyn StatusSink>, policy: MalformedPolicy) -> Self {
        Self {
            session,
            sink,
            policy,
        }
    }

    /// Start a speech session reporting to `surface`, with a dispatcher in front
    pub fn start<S: Surface + 'static>(
        config: &Config,
        backend: Arc<dyn SpeechBackend>,
        volume: Arc<dyn VolumeProbe>,
        surface: S,
    ) -> (Self, JoinHandle<()>) {
        let sink: Arc<dyn StatusSink> = Arc::new(ScriptSink::new(surface));
        let (session, task) = SpeechSession::start(config, backend, volume, sink.clone());
        (Self::new(session, sink, config.malformed_policy), task)
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Handle one message posted by the surface. Never blocks.
    pub fn post_message(&self, message: &str) -> Dispatch {
        match parse_message(message) {
            Ok(Inbound::Request(request)) => self.route(request),
            Ok(Inbound::Ignored(reason)) => {
                debug!("Ignoring {}", reason);
                Dispatch::Ignored
            }
            Err(malformed) => self.reject(malformed),
        }
    }

    fn route(&self, request: SpeakRequest) -> Dispatch {
        debug!("📨 {} -> {}", request.action.name(), request.callback);
        let SpeakRequest { callback, action } = request;
        let control = match action {
            SpeakAction::Start(utterance) => ControlRequest::Speak {
                utterance,
                callback,
            },
            SpeakAction::Pause => ControlRequest::Pause { callback },
            SpeakAction::Stop => ControlRequest::Stop { callback },
            SpeakAction::Resume => ControlRequest::Resume { callback },
        };

        match self.session.send(control) {
            Ok(()) => Dispatch::Routed,
            Err(e) => {
                error!("❌ Bridge request not delivered: {}", e);
                Dispatch::Undeliverable
            }
        }
    }

    fn reject(&self, malformed: MalformedMessage) -> Dispatch {
        warn!("⚠️ Malformed bridge message: {}", malformed);
        match self.policy {
            MalformedPolicy::Ignore => Dispatch::Dropped,
            MalformedPolicy::Report => {
                let callback = malformed.callback.unwrap_or_default();
                let speak_id = malformed.speak_id.unwrap_or_default();
                self.sink.deliver(StatusEvent::new(speak_id, callback, StatusKind::Error));
                Dispatch::Reported
            }
        }
    }
}
