use std::sync::atomic::Ordering;
use std::sync::Arc;

mod common;
use common::{decode_script, start_message, TestBridge};
use speakbridge::bridge::{BridgeDispatcher, Dispatch};
use speakbridge::config::{Config, MalformedPolicy};
use speakbridge::status::StatusKind;
use speakbridge::tts::simulated::SimulatedBackend;
use speakbridge::volume::FixedVolume;
use tokio::sync::mpsc;

fn s(id: &str, status: StatusKind) -> (String, StatusKind) {
    (id.to_string(), status)
}

#[tokio::test]
async fn test_start_then_done() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));

    bridge.backend.finish("a");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Done));

    let configured = bridge.backend.configured.lock().unwrap().clone();
    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0].rate, 1.0);
    assert_eq!(configured[0].language, "ko");
}

#[tokio::test]
async fn test_script_shape() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    assert_eq!(
        bridge.next_script().await,
        r#"(function(){cb('{\"speakId\":\"a\",\"speakStatus\":1}');})();"#
    );
}

#[tokio::test]
async fn test_second_start_while_speaking_is_playing() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));

    bridge.start("b", "world");
    assert_eq!(bridge.next_status().await, s("b", StatusKind::Playing));
    assert_eq!(bridge.backend.spoken_ids(), vec!["a".to_string()]);

    // "a" continues unaffected
    bridge.backend.finish("a");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Done));
}

#[tokio::test]
async fn test_muted_start_never_speaks() {
    let mut bridge = TestBridge::new();
    bridge.volume.set(0);
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Muted));
    assert!(bridge.backend.spoken_ids().is_empty());
}

#[tokio::test]
async fn test_pause_resume() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    bridge.control("pause");
    bridge.control("resume");

    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Pause));
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Resume));
    assert_eq!(
        bridge.backend.spoken_ids(),
        vec!["a".to_string(), "a".to_string()]
    );

    bridge.backend.finish("a");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Done));
}

#[tokio::test]
async fn test_resume_while_muted_stays_paused() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    bridge.control("pause");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Pause));

    bridge.volume.set(0);
    bridge.control("resume");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Muted));

    bridge.control("stop");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Stop));
}

#[tokio::test]
async fn test_stop_while_idle_is_silent() {
    let mut bridge = TestBridge::new();
    bridge.control("stop");
    bridge.control("pause");
    bridge.control("resume");
    bridge.expect_silence().await;
}

#[tokio::test]
async fn test_stop_then_late_done_is_dropped() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));

    bridge.control("stop");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Stop));

    bridge.backend.finish("a");
    bridge.expect_silence().await;
}

#[tokio::test]
async fn test_error_is_terminal() {
    let mut bridge = TestBridge::new();
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));

    bridge.backend.fail("a");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Error));

    bridge.control("stop");
    bridge.control("pause");
    bridge.expect_silence().await;

    // Engine comes back for the next utterance
    bridge.start("b", "again");
    assert_eq!(bridge.next_status().await, s("b", StatusKind::Start));
    assert_eq!(bridge.backend.opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_teardown_failure_is_not_fatal() {
    let mut bridge = TestBridge::new();
    bridge.backend.fail_close.store(true, Ordering::SeqCst);
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Start));

    bridge.backend.finish("a");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Done));

    bridge.backend.fail_close.store(false, Ordering::SeqCst);
    bridge.start("b", "again");
    assert_eq!(bridge.next_status().await, s("b", StatusKind::Start));
}

#[tokio::test]
async fn test_engine_unavailable_reports_error() {
    let mut bridge = TestBridge::new();
    bridge.backend.fail_open.store(true, Ordering::SeqCst);
    bridge.start("a", "hello");
    assert_eq!(bridge.next_status().await, s("a", StatusKind::Error));
    assert!(bridge.backend.spoken_ids().is_empty());
}

#[tokio::test]
async fn test_missing_action_produces_nothing() {
    let mut bridge = TestBridge::new();
    bridge.post(r#"{"request":"postSpeak","callback":"cb"}"#);
    bridge.post("not json at all");
    bridge.post(r#"{"request":"postSpeak","callback":"cb","action":"start"}"#);
    bridge.expect_silence().await;
    assert!(bridge.backend.spoken_ids().is_empty());
}

#[tokio::test]
async fn test_malformed_reported_when_configured() {
    let mut bridge = TestBridge::with_policy(MalformedPolicy::Report);
    bridge.post(r#"{"request":"postSpeak","callback":"cb"}"#);
    assert_eq!(bridge.next_status().await, s("", StatusKind::Error));
}

#[tokio::test]
async fn test_lifecycle_statuses_use_start_callback() {
    let mut bridge = TestBridge::new();
    bridge.post(&start_message("onSpeak", "a", "hello"));
    let script = bridge.next_script().await;
    assert!(script.starts_with("(function(){onSpeak('"), "{}", script);

    bridge.control("pause");
    let script = bridge.next_script().await;
    assert!(script.starts_with("(function(){cb('"), "{}", script);
}

#[tokio::test]
async fn test_shutdown_releases_engine() {
    let bridge = TestBridge::new();
    bridge.dispatcher.session().shutdown().unwrap();
    bridge.session.await.unwrap();
    assert!(bridge.dispatcher.session().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_near_zero_rate_keeps_session_alive() {
    let (surface, mut scripts) = mpsc::unbounded_channel();
    let (dispatcher, session) = BridgeDispatcher::start(
        &Config::default(),
        Arc::new(SimulatedBackend::new(15.0)),
        Arc::new(FixedVolume::new(100)),
        surface,
    );

    let slow = r#"{"request":"postSpeak","callback":"cb","action":"start",
        "parameter":{"speakId":"slow","speakText":"hello","speechRate":1e-20,"pitch":1.0}}"#;
    assert_eq!(dispatcher.post_message(slow), Dispatch::Routed);
    let script = scripts.recv().await.expect("script");
    assert_eq!(decode_script(&script), s("slow", StatusKind::Start));

    assert_eq!(
        dispatcher.post_message(r#"{"request":"postSpeak","callback":"cb","action":"stop"}"#),
        Dispatch::Routed
    );
    let script = scripts.recv().await.expect("script");
    assert_eq!(decode_script(&script), s("slow", StatusKind::Stop));

    assert_eq!(dispatcher.post_message(&start_message("cb", "next", "hi")), Dispatch::Routed);
    let script = scripts.recv().await.expect("script");
    assert_eq!(decode_script(&script), s("next", StatusKind::Start));

    dispatcher.session().shutdown().unwrap();
    session.await.unwrap();
}
