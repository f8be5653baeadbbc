//! Status vocabulary reported back to the caller
//!
//! Every outcome of a control request, and every engine lifecycle signal,
//! is normalized into a [`StatusKind`] and delivered through a [`StatusSink`].

use std::fmt;
use tokio::sync::mpsc;
use tracing::warn;

/// Normalized playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Utterance began audibly
    Start,
    /// Playback suspended, utterance retained
    Pause,
    /// A paused utterance began audibly again
    Resume,
    /// Caller explicitly terminated the utterance
    Stop,
    /// Utterance completed naturally
    Done,
    /// Rejected: something is already active
    Playing,
    /// Rejected: output volume is zero
    Muted,
    /// Engine unavailable or playback failure
    Error,
}

impl StatusKind {
    /// Wire code sent to the surface
    pub fn code(self) -> i32 {
        match self {
            StatusKind::Start => 1,
            StatusKind::Pause => 2,
            StatusKind::Resume => 3,
            StatusKind::Stop => 4,
            StatusKind::Done => 5,
            StatusKind::Playing => -100,
            StatusKind::Muted => -200,
            StatusKind::Error => -999,
        }
    }

    /// Decode a wire code; anything unmapped is an error
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => StatusKind::Start,
            2 => StatusKind::Pause,
            3 => StatusKind::Resume,
            4 => StatusKind::Stop,
            5 => StatusKind::Done,
            -100 => StatusKind::Playing,
            -200 => StatusKind::Muted,
            _ => StatusKind::Error,
        }
    }

    pub fn all() -> [StatusKind; 8] {
        [
            StatusKind::Start,
            StatusKind::Pause,
            StatusKind::Resume,
            StatusKind::Stop,
            StatusKind::Done,
            StatusKind::Playing,
            StatusKind::Muted,
            StatusKind::Error,
        ]
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Start => "START",
            StatusKind::Pause => "PAUSE",
            StatusKind::Resume => "RESUME",
            StatusKind::Stop => "STOP",
            StatusKind::Done => "DONE",
            StatusKind::Playing => "PLAYING",
            StatusKind::Muted => "MUTED",
            StatusKind::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A status destined for one callback on the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub utterance_id: String,
    pub callback: String,
    pub status: StatusKind,
}

impl StatusEvent {
    pub fn new(utterance_id: impl Into<String>, callback: impl Into<String>, status: StatusKind) -> Self {
        Self {
            utterance_id: utterance_id.into(),
            callback: callback.into(),
            status,
        }
    }
}

/// Receiver of normalized status events, injected into the controller
pub trait StatusSink: Send + Sync {
    fn deliver(&self, event: StatusEvent);
}

impl StatusSink for mpsc::UnboundedSender<StatusEvent> {
    fn deliver(&self, event: StatusEvent) {
        if self.send(event).is_err() {
            warn!("Status receiver dropped");
        }
    }
}
