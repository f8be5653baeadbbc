//! Utterance types
//!
//! An utterance is one discrete unit of text submitted for synthesis.

/// A request to speak a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Caller-supplied identifier, echoed in every status for this utterance
    pub id: String,
    /// Text to synthesize
    pub text: String,
    /// Speech rate multiplier (1.0 is normal)
    pub rate: f32,
    /// Pitch multiplier (1.0 is normal)
    pub pitch: f32,
}

impl Utterance {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            rate: 1.0,
            pitch: 1.0,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}

/// The in-flight utterance together with the callback its lifecycle
/// statuses are reported to
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUtterance {
    pub utterance: Utterance,
    pub callback: String,
}

impl ActiveUtterance {
    pub fn id(&self) -> &str {
        &self.utterance.id
    }
}
