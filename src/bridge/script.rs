//! Outbound script encoding
//!
//! Each status becomes an inline script invoking the caller's named
//! callback, e.g. `(function(){onSpeak('{\"speakId\":\"a\",\"speakStatus\":1}');})();`

use crate::error::{SpeakError, SpeakResult};
use crate::status::{StatusEvent, StatusSink};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The embedding surface that executes scripts.
///
/// Implementations marshal onto whatever context the surface requires and
/// must not block the caller.
pub trait Surface: Send + Sync {
    fn evaluate_script(&self, script: String) -> SpeakResult<()>;
}

/// Forwards scripts to the task that owns the surface
impl Surface for mpsc::UnboundedSender<String> {
    fn evaluate_script(&self, script: String) -> SpeakResult<()> {
        self.send(script)
            .map_err(|_| SpeakError::Surface("surface task is gone".to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload<'a> {
    speak_id: &'a str,
    speak_status: i32,
}

/// Dotted JavaScript identifier path such as `app.speech.onStatus`
pub fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

/// Escape `raw` for use inside a single-quoted JavaScript string literal
pub fn escape_single_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// JSON payload for one status
pub fn encode_payload(event: &StatusEvent) -> SpeakResult<String> {
    let payload = StatusPayload {
        speak_id: &event.utterance_id,
        speak_status: event.status.code(),
    };
    Ok(serde_json::to_string(&payload)?)
}

/// Script delivering `event` to its callback; `None` when there is no callback
pub fn encode_script(event: &StatusEvent) -> SpeakResult<Option<String>> {
    if event.callback.is_empty() {
        return Ok(None);
    }
    if !is_valid_callback(&event.callback) {
        return Err(SpeakError::Surface(format!(
            "refusing to invoke callback '{}'",
            event.callback
        )));
    }

    let payload = escape_single_quoted(&encode_payload(event)?);
    Ok(Some(format!(
        "(function(){{{}('{}');}})();",
        event.callback, payload
    )))
}

/// Status sink that turns every status into a script on a [`Surface`]
pub struct ScriptSink<S> {
    surface: S,
}

impl<S: Surface> ScriptSink<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }
}

impl<S: Surface> StatusSink for ScriptSink<S> {
    fn deliver(&self, event: StatusEvent) {
        match encode_script(&event) {
            Ok(Some(script)) => {
                debug!("📤 {}", script);
                if let Err(e) = self.surface.evaluate_script(script) {
                    warn!("⚠️ Status {} for '{}' not delivered: {}", event.status, event.utterance_id, e);
                }
            }
            Ok(None) => debug!(
                "No callback for status {} of '{}'",
                event.status, event.utterance_id
            ),
            Err(e) => warn!("⚠️ Status {} for '{}' dropped: {}", event.status, event.utterance_id, e),
        }
    }
}
