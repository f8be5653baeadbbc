//! SpeakBridge Library
//!
//! Speech playback controller for embedded web surfaces: a JSON control
//! protocol in, status callbacks out, and one platform speech engine in
//! between.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod status;
pub mod tts;
pub mod utterance;
pub mod volume;
