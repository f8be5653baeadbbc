//! Bridge Message Types
//!
//! Inbound JSON envelopes posted by the embedded surface:
//!
//! ```json
//! { "request": "postSpeak", "callback": "onSpeak", "action": "start",
//!   "parameter": { "speakId": "a", "speakText": "hello", "speechRate": 1.0, "pitch": 1.0 } }
//! ```

use crate::utterance::Utterance;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// The only request kind this protocol handles
pub const SPEAK_REQUEST: &str = "postSpeak";

/// Control actions, closed over the four the protocol defines
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakAction {
    Start(Utterance),
    Pause,
    Stop,
    Resume,
}

impl SpeakAction {
    pub fn name(&self) -> &'static str {
        match self {
            SpeakAction::Start(_) => "start",
            SpeakAction::Pause => "pause",
            SpeakAction::Stop => "stop",
            SpeakAction::Resume => "resume",
        }
    }
}

/// A validated control request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    pub callback: String,
    pub action: SpeakAction,
}

/// Result of reading a well-formed message
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request(SpeakRequest),
    /// Outside this protocol's scope; the reason is for logging only
    Ignored(String),
}

/// A message that failed validation, with whatever routing context could
/// still be recovered from it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub struct MalformedMessage {
    pub reason: String,
    pub callback: Option<String>,
    pub speak_id: Option<String>,
}

impl MalformedMessage {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            callback: None,
            speak_id: None,
        }
    }

    fn with_callback(mut self, callback: &str) -> Self {
        self.callback = Some(callback.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParameter {
    speak_id: String,
    speak_text: String,
    speech_rate: f64,
    pitch: f64,
}

/// Parse and validate one inbound message
pub fn parse_message(raw: &str) -> Result<Inbound, MalformedMessage> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| MalformedMessage::new(format!("invalid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| MalformedMessage::new("message is not a JSON object"))?;

    let callback = match object.get("callback") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Err(MalformedMessage::new("'callback' is not a string")),
    };

    let request = string_field(object, "request").map_err(|e| e.with_callback(&callback))?;
    if request != SPEAK_REQUEST {
        return Ok(Inbound::Ignored(format!("request '{}'", request)));
    }

    let action = string_field(object, "action").map_err(|e| e.with_callback(&callback))?;
    let action = match action.as_str() {
        "start" => SpeakAction::Start(
            parse_start(object.get("parameter")).map_err(|e| e.with_callback(&callback))?,
        ),
        "pause" => SpeakAction::Pause,
        "stop" => SpeakAction::Stop,
        "resume" => SpeakAction::Resume,
        other => return Ok(Inbound::Ignored(format!("action '{}'", other))),
    };

    Ok(Inbound::Request(SpeakRequest { callback, action }))
}

fn string_field(object: &Map<String, Value>, key: &str) -> Result<String, MalformedMessage> {
    match object.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(MalformedMessage::new(format!("'{}' is not a string", key))),
        None => Err(MalformedMessage::new(format!("missing '{}'", key))),
    }
}

fn parse_start(parameter: Option<&Value>) -> Result<Utterance, MalformedMessage> {
    let parameter = parameter
        .filter(|p| p.is_object())
        .ok_or_else(|| MalformedMessage::new("start requires a 'parameter' object"))?;
    let speak_id = parameter
        .get("speakId")
        .and_then(Value::as_str)
        .map(str::to_string);

    let invalid = |reason: String| MalformedMessage {
        reason,
        callback: None,
        speak_id: speak_id.clone(),
    };

    let start = StartParameter::deserialize(parameter)
        .map_err(|e| invalid(format!("invalid start parameter: {}", e)))?;

    if start.speak_text.is_empty() {
        return Err(invalid("'speakText' is empty".to_string()));
    }
    let rate = positive_multiplier("speechRate", start.speech_rate).map_err(&invalid)?;
    let pitch = positive_multiplier("pitch", start.pitch).map_err(&invalid)?;

    Ok(Utterance::new(start.speak_id, start.speak_text)
        .with_rate(rate)
        .with_pitch(pitch))
}

/// Narrow to f32 and require a finite value above zero after narrowing
fn positive_multiplier(name: &str, value: f64) -> Result<f32, String> {
    let narrowed = value as f32;
    if narrowed.is_finite() && narrowed > 0.0 {
        Ok(narrowed)
    } else {
        Err(format!("'{}' must be a positive multiplier, got {}", name, value))
    }
}
