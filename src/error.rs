//! SpeakBridge Error Types
//!
//! Centralized error handling for the controller, engines and bridge.

use thiserror::Error;

/// Central error type for SpeakBridge
#[derive(Error, Debug)]
pub enum SpeakError {
    #[error("Speech engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Speech engine error: {0}")]
    Engine(String),

    #[error("Volume query failed: {0}")]
    Volume(String),

    #[error("Surface delivery failed: {0}")]
    Surface(String),

    #[error("Engine teardown failed: {0}")]
    Teardown(String),

    #[error("Speech session closed")]
    SessionClosed,

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for SpeakBridge operations
pub type SpeakResult<T> = Result<T, SpeakError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for SpeakError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        SpeakError::Lock(err.to_string())
    }
}

/// Successful outcomes of releasing engine resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Resources were held and have been released
    Released,
    /// Nothing was held; the engine was already torn down
    AlreadyReleased,
}
