//! Bridge Module
//!
//! Message boundary between the embedded web surface and the speech
//! session. Protocol: one JSON object per inbound message, one inline
//! script per outbound status.

pub mod dispatcher;
pub mod messages;
pub mod script;

pub use dispatcher::{BridgeDispatcher, Dispatch};
pub use messages::*;
pub use script::{ScriptSink, Surface};
