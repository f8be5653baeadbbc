#![allow(dead_code)]

pub mod mock_engine;

use mock_engine::MockBackend;
use speakbridge::bridge::BridgeDispatcher;
use speakbridge::config::{Config, MalformedPolicy};
use speakbridge::status::StatusKind;
use speakbridge::volume::FixedVolume;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Dispatcher wired to a mock engine, a fixed volume and a capturing surface
pub struct TestBridge {
    pub dispatcher: BridgeDispatcher,
    pub backend: Arc<MockBackend>,
    pub volume: Arc<FixedVolume>,
    pub session: JoinHandle<()>,
    scripts: mpsc::UnboundedReceiver<String>,
}

impl TestBridge {
    pub fn new() -> Self {
        Self::with_policy(MalformedPolicy::Ignore)
    }

    pub fn with_policy(policy: MalformedPolicy) -> Self {
        let config = Config {
            malformed_policy: policy,
            ..Config::default()
        };
        let backend = Arc::new(MockBackend::new());
        let volume = Arc::new(FixedVolume::new(100));
        let (surface, scripts) = mpsc::unbounded_channel();
        let (dispatcher, session) =
            BridgeDispatcher::start(&config, backend.clone(), volume.clone(), surface);

        Self {
            dispatcher,
            backend,
            volume,
            session,
            scripts,
        }
    }

    pub fn post(&self, message: &str) {
        self.dispatcher.post_message(message);
    }

    pub fn start(&self, id: &str, text: &str) {
        self.post(&start_message("cb", id, text));
    }

    pub fn control(&self, action: &str) {
        self.post(&format!(
            r#"{{"request":"postSpeak","callback":"cb","action":"{}"}}"#,
            action
        ));
    }

    /// Next script executed on the surface
    pub async fn next_script(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(2), self.scripts.recv())
            .await
            .expect("Timed out waiting for a surface script")
            .expect("Surface channel closed")
    }

    /// Next status, decoded from the script
    pub async fn next_status(&mut self) -> (String, StatusKind) {
        let script = self.next_script().await;
        decode_script(&script)
    }

    /// Assert nothing reaches the surface for a short while
    pub async fn expect_silence(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(200), self.scripts.recv()).await;
        assert!(next.is_err(), "Unexpected surface script: {:?}", next);
    }
}

pub fn start_message(callback: &str, id: &str, text: &str) -> String {
    serde_json::json!({
        "request": "postSpeak",
        "callback": callback,
        "action": "start",
        "parameter": {
            "speakId": id,
            "speakText": text,
            "speechRate": 1.0,
            "pitch": 1.0
        }
    })
    .to_string()
}

/// Recover `(speakId, status)` from `(function(){cb('{...}');})();`
pub fn decode_script(script: &str) -> (String, StatusKind) {
    let open = script.find("('").expect("script has an argument") + 2;
    let close = script.rfind("');").expect("script closes its argument");
    let payload = script[open..close]
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\\\", "\\");
    let value: serde_json::Value = serde_json::from_str(&payload).expect("payload is JSON");
    let id = value["speakId"].as_str().expect("speakId").to_string();
    let code = value["speakStatus"].as_i64().expect("speakStatus") as i32;
    (id, StatusKind::from_code(code))
}
