//! Room actor behavior against the instrumented simulation engine.

#![cfg(feature = "sim-engine")]

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use videoroom_bridge_core::engine::sim::SimEngine;
use videoroom_bridge_core::engine::{
    ConnectOptions, ConnectedRoom, EngineError, RemoteParticipantControl,
    RemoteParticipantHandle, RoomObserver, StatsObserver, StatsReport, VideoEngine,
};
use videoroom_bridge_core::{CallbackGuard, RoomDelegate};

fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    f()
}

fn options() -> ConnectOptions {
    ConnectOptions {
        token: "tk".into(),
        room_name: "standup".into(),
        enable_automatic_subscription: true,
        ..Default::default()
    }
}

/// Flat event recorder used as the room listener in these tests.
#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn contains(&self, event: &str) -> bool {
        self.events.lock().iter().any(|e| e == event)
    }
}

/// Room observer that forwards every callback through a lifetime guard
/// into an [`EventLog`], the way the JNI layer forwards into Java.
struct GuardedRoomObserver {
    guard: Arc<CallbackGuard<Arc<EventLog>>>,
}

impl GuardedRoomObserver {
    fn new(log: Arc<EventLog>) -> Self {
        Self { guard: CallbackGuard::new("room", log) }
    }
}

impl RoomObserver for GuardedRoomObserver {
    fn on_connected(&self, room: ConnectedRoom) {
        self.guard.dispatch(|l| l.push(format!("connected:{}", room.sid)));
    }

    fn on_connect_failure(&self, error: EngineError) {
        self.guard.dispatch(|l| l.push(format!("connect_failure:{}", error.code)));
    }

    fn on_reconnecting(&self, _error: EngineError) {
        self.guard.dispatch(|l| l.push("reconnecting"));
    }

    fn on_reconnected(&self) {
        self.guard.dispatch(|l| l.push("reconnected"));
    }

    fn on_disconnected(&self, _error: Option<EngineError>) {
        self.guard.dispatch(|l| l.push("disconnected"));
    }

    fn on_participant_connected(&self, participant: RemoteParticipantHandle) {
        self.guard
            .dispatch(|l| l.push(format!("participant_connected:{}", participant.info.identity)));
    }

    fn on_participant_disconnected(&self, participant_sid: &str) {
        self.guard.dispatch(|l| l.push(format!("participant_disconnected:{participant_sid}")));
    }

    fn on_recording_started(&self) {
        self.guard.dispatch(|l| l.push("recording_started"));
    }

    fn on_recording_stopped(&self) {
        self.guard.dispatch(|l| l.push("recording_stopped"));
    }

    fn on_dominant_speaker_changed(&self, _participant_sid: Option<&str>) {
        self.guard.dispatch(|l| l.push("dominant_speaker"));
    }
}

struct RecordingStatsObserver {
    log: Arc<EventLog>,
}

impl StatsObserver for RecordingStatsObserver {
    fn on_stats(&self, report: StatsReport) {
        self.log.push(format!("stats:{}", report.peer_connection_id));
    }
}

struct Fixture {
    engine: Arc<SimEngine>,
    log: Arc<EventLog>,
    observer: Arc<GuardedRoomObserver>,
    delegate: RoomDelegate,
}

fn fixture() -> Fixture {
    let engine = SimEngine::new();
    let log = Arc::new(EventLog::default());
    let observer = Arc::new(GuardedRoomObserver::new(Arc::clone(&log)));
    let stats = Arc::new(RecordingStatsObserver { log: Arc::clone(&log) });
    let delegate = RoomDelegate::new(
        Arc::clone(&engine) as Arc<dyn VideoEngine>,
        options(),
        Arc::clone(&observer) as _,
        stats as _,
    );
    Fixture { engine, log, observer, delegate }
}

#[test]
fn commands_reach_the_engine_in_post_order() {
    let f = fixture();
    let engine_log = f.engine.log();

    // Post back-to-back from the same thread; the worker must run the
    // connect attempt before the disconnect, every time.
    f.delegate.connect();
    f.delegate.disconnect();

    assert!(wait_until(Duration::from_secs(2), || engine_log.position("disconnect").is_some()));
    assert!(engine_log.position("connect").unwrap() < engine_log.position("disconnect").unwrap());

    f.delegate.release();
    f.delegate.wait_released();
}

#[test]
fn release_event_stays_unsignaled_until_teardown_runs() {
    let f = fixture();
    f.engine.set_connect_delay(Duration::from_millis(150));

    let started = Instant::now();
    f.delegate.connect();
    f.delegate.release();

    // The worker is still inside the slow connect command; the release
    // command cannot have run yet.
    assert!(!f.delegate.is_released());

    f.delegate.wait_released();
    assert!(f.delegate.is_released());
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[test]
fn commands_after_release_are_silently_dropped() {
    let f = fixture();
    f.delegate.connect();
    f.delegate.release();
    f.delegate.wait_released();

    let calls_before = f.engine.log().calls();
    f.delegate.disconnect();
    f.delegate.get_stats();
    // Give a would-be stray command time to surface.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(f.engine.log().calls(), calls_before);
}

#[test]
fn dropping_an_unreleased_delegate_is_fatal() {
    let f = fixture();
    f.delegate.connect();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || drop(f.delegate)));
    assert!(result.is_err());
}

#[test]
fn connect_failure_surfaces_through_the_observer() {
    let engine = SimEngine::new();
    engine.set_fail_connect(true);
    let log = Arc::new(EventLog::default());
    let observer = Arc::new(GuardedRoomObserver::new(Arc::clone(&log)));
    let stats = Arc::new(RecordingStatsObserver { log: Arc::clone(&log) });
    let delegate = RoomDelegate::new(
        Arc::clone(&engine) as Arc<dyn VideoEngine>,
        options(),
        observer as _,
        stats as _,
    );

    delegate.connect();
    assert!(wait_until(Duration::from_secs(2), || log.contains("connect_failure:53104")));

    delegate.release();
    delegate.wait_released();
}

#[test]
fn stats_request_reaches_the_stats_observer() {
    let f = fixture();
    f.delegate.connect();
    assert!(wait_until(Duration::from_secs(2), || {
        f.log.events().iter().any(|e| e.starts_with("connected:"))
    }));

    f.delegate.get_stats();
    assert!(wait_until(Duration::from_secs(2), || {
        f.log.events().iter().any(|e| e.starts_with("stats:PC-"))
    }));

    f.delegate.release();
    f.delegate.wait_released();
}

#[test]
fn recording_query_is_synchronous_and_tracks_the_engine() {
    let f = fixture();
    f.delegate.connect();
    assert!(wait_until(Duration::from_secs(2), || f.delegate.room().is_some()));

    assert!(!f.delegate.is_recording());
    f.engine.last_room().unwrap().set_recording(true);
    assert!(f.delegate.is_recording());

    f.delegate.release();
    f.delegate.wait_released();
}

#[test]
fn deleted_observer_drops_scripted_room_events() {
    let f = fixture();
    f.delegate.connect();
    assert!(wait_until(Duration::from_secs(2), || {
        f.log.events().iter().any(|e| e.starts_with("connected:"))
    }));

    // Host-side teardown begins: the guard is deleted while the engine
    // keeps firing.
    f.observer.guard.set_deleted();
    let room = f.engine.last_room().unwrap();
    room.set_recording(true);
    room.add_remote("alice");

    std::thread::sleep(Duration::from_millis(50));
    assert!(!f.log.contains("recording_started"));
    assert!(!f.log.contains("participant_connected:alice"));

    f.delegate.release();
    f.delegate.wait_released();
}

#[test]
fn scripted_participant_events_arrive_while_live() {
    let f = fixture();
    f.delegate.connect();
    assert!(wait_until(Duration::from_secs(2), || f.engine.last_room().is_some()));
    // The connected callback races the scripting below; wait for it.
    assert!(wait_until(Duration::from_secs(2), || {
        f.log.events().iter().any(|e| e.starts_with("connected:"))
    }));

    let room = f.engine.last_room().unwrap();
    let alice = room.add_remote("alice");
    room.remove_remote(&alice.info().sid);

    assert!(f.log.contains("participant_connected:alice"));
    assert!(wait_until(Duration::from_secs(2), || {
        f.log.events().iter().any(|e| e.starts_with("participant_disconnected:"))
    }));

    f.delegate.release();
    f.delegate.wait_released();
}
