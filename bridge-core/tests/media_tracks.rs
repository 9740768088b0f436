//! Track, sink and participant event flow against the simulation engine.

#![cfg(feature = "sim-engine")]

use std::sync::Arc;

use parking_lot::Mutex;

use videoroom_bridge_core::engine::sim::{SimEngine, SimRoom};
use videoroom_bridge_core::engine::{
    AudioSample, AudioSinkObserver, CaptureFormat, CapturerObserver, ConnectOptions,
    ConnectedRoom, DataTrackObserver, EngineError, LocalAudioTrackControl,
    LocalParticipantControl, LocalParticipantObserver, LocalVideoTrackControl,
    ParticipantObserver, RemoteDataTrackControl, RemoteParticipantControl,
    RemoteParticipantHandle, RemoteTrackHandle, RoomObserver, TrackKind, TrackPublicationInfo,
    VideoEngine,
};
use videoroom_bridge_core::CallbackGuard;

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
}

/// Room observer that ignores everything; these tests drive participant
/// and track events directly.
struct NoopRoomObserver;

impl RoomObserver for NoopRoomObserver {
    fn on_connected(&self, _room: ConnectedRoom) {}
    fn on_connect_failure(&self, _error: EngineError) {}
    fn on_reconnecting(&self, _error: EngineError) {}
    fn on_reconnected(&self) {}
    fn on_disconnected(&self, _error: Option<EngineError>) {}
    fn on_participant_connected(&self, _participant: RemoteParticipantHandle) {}
    fn on_participant_disconnected(&self, _participant_sid: &str) {}
    fn on_recording_started(&self) {}
    fn on_recording_stopped(&self) {}
    fn on_dominant_speaker_changed(&self, _participant_sid: Option<&str>) {}
}

fn connect(engine: &Arc<SimEngine>) -> Arc<SimRoom> {
    let options = ConnectOptions {
        token: "tk".into(),
        room_name: "standup".into(),
        ..Default::default()
    };
    engine.connect(options, Arc::new(NoopRoomObserver));
    engine.last_room().expect("connect registers a room")
}

struct GuardedSink {
    guard: Arc<CallbackGuard<Arc<EventLog>>>,
}

impl AudioSinkObserver for GuardedSink {
    fn on_sample(&self, sample: AudioSample) {
        self.guard.dispatch(|l| {
            l.push(format!(
                "sample:{}x{}@{}",
                sample.pcm.len(),
                sample.channels,
                sample.sample_rate
            ))
        });
    }
}

struct GuardedCapturer {
    guard: Arc<CallbackGuard<Arc<EventLog>>>,
}

impl CapturerObserver for GuardedCapturer {
    fn on_start_capture(&self, format: CaptureFormat) {
        self.guard.dispatch(|l| l.push(format!("start:{}x{}", format.width, format.height)));
    }

    fn on_stop_capture(&self) {
        self.guard.dispatch(|l| l.push("stop"));
    }
}

struct RecordingParticipantObserver {
    log: Arc<EventLog>,
}

impl ParticipantObserver for RecordingParticipantObserver {
    fn on_track_published(&self, publication: TrackPublicationInfo) {
        self.log.push(format!("published:{}:{}", publication.kind.as_str(), publication.name));
    }

    fn on_track_unpublished(&self, publication: TrackPublicationInfo) {
        self.log.push(format!("unpublished:{}", publication.sid));
    }

    fn on_track_subscribed(&self, track: RemoteTrackHandle) {
        self.log.push(format!("subscribed:{}", track.info.sid));
    }

    fn on_track_subscription_failed(&self, publication: TrackPublicationInfo, error: EngineError) {
        self.log.push(format!("subscription_failed:{}:{}", publication.sid, error.code));
    }

    fn on_track_unsubscribed(&self, track_sid: &str, _kind: TrackKind) {
        self.log.push(format!("unsubscribed:{track_sid}"));
    }

    fn on_track_enabled(&self, publication_sid: &str, _kind: TrackKind) {
        self.log.push(format!("enabled:{publication_sid}"));
    }

    fn on_track_disabled(&self, publication_sid: &str, _kind: TrackKind) {
        self.log.push(format!("disabled:{publication_sid}"));
    }
}

struct RecordingLocalObserver {
    log: Arc<EventLog>,
}

impl LocalParticipantObserver for RecordingLocalObserver {
    fn on_track_published(&self, publication: TrackPublicationInfo) {
        self.log.push(format!("published:{}:{}", publication.kind.as_str(), publication.name));
    }

    fn on_track_publication_failed(&self, track_name: &str, _kind: TrackKind, error: EngineError) {
        self.log.push(format!("publication_failed:{track_name}:{}", error.code));
    }

    fn on_track_unpublished(&self, publication: TrackPublicationInfo) {
        self.log.push(format!("unpublished:{}", publication.name));
    }
}

struct RecordingDataObserver {
    log: Arc<EventLog>,
}

impl DataTrackObserver for RecordingDataObserver {
    fn on_string_message(&self, message: &str) {
        self.log.push(format!("string:{message}"));
    }

    fn on_buffer_message(&self, message: &[u8]) {
        self.log.push(format!("buffer:{}", message.len()));
    }
}

#[test]
fn audio_sink_receives_samples_until_removed() {
    let engine = SimEngine::new();
    let track = engine.create_audio_track("mic", true);
    let sim_track = engine.last_audio_track().expect("track registered");

    let log = Arc::new(EventLog::default());
    let guard = CallbackGuard::new("sink", Arc::clone(&log));
    let sink_id = track.add_sink(Arc::new(GuardedSink { guard: Arc::clone(&guard) }));
    assert_eq!(sim_track.sink_count(), 1);

    let sample = AudioSample { pcm: vec![0i16; 480], sample_rate: 48_000, channels: 1 };
    sim_track.feed(sample.clone());
    assert_eq!(log.events(), vec!["sample:480x1@48000"]);

    // Engine detach first, then guard deletion; later buffers go nowhere.
    track.remove_sink(sink_id);
    guard.set_deleted();
    sim_track.feed(sample);
    assert_eq!(log.events().len(), 1);
}

#[test]
fn capturer_sees_start_on_create_and_stop_on_release() {
    let engine = SimEngine::new();
    let log = Arc::new(EventLog::default());
    let guard = CallbackGuard::new("capturer", Arc::clone(&log));

    let format = CaptureFormat { width: 640, height: 480, framerate: 30 };
    let track = engine.create_video_track(
        "camera",
        true,
        Arc::new(GuardedCapturer { guard: Arc::clone(&guard) }),
        format,
    );
    assert_eq!(log.events(), vec!["start:640x480"]);

    track.stop();
    guard.set_deleted();
    assert_eq!(log.events(), vec!["start:640x480", "stop"]);
}

#[test]
fn local_publish_success_and_failure_reach_the_observer() {
    let engine = SimEngine::new();
    let room = connect(&engine);
    let log = Arc::new(EventLog::default());

    let local = room.local();
    local.set_observer(Arc::new(RecordingLocalObserver { log: Arc::clone(&log) }));

    let mic = engine.create_audio_track("mic", true);
    local.publish_audio_track(mic);
    assert_eq!(local.published_count(), 1);

    local.set_fail_next_publish(true);
    let chat = engine.create_data_track("chat", true);
    local.publish_data_track(chat);
    assert_eq!(local.published_count(), 1);

    local.unpublish_track("mic", TrackKind::Audio);
    assert_eq!(local.published_count(), 0);

    assert_eq!(
        log.events(),
        vec!["published:audio:mic", "publication_failed:chat:53400", "unpublished:mic"]
    );
}

#[test]
fn remote_track_lifecycle_reaches_the_observer() {
    let engine = SimEngine::new();
    let room = connect(&engine);
    let log = Arc::new(EventLog::default());

    let alice = room.add_remote("alice");
    alice.set_observer(Arc::new(RecordingParticipantObserver { log: Arc::clone(&log) }));

    let publication = alice.publish(TrackKind::Data, "chat");
    let data = alice.subscribe(&publication).expect("data track control");

    let data_log = Arc::new(EventLog::default());
    data.set_observer(Arc::new(RecordingDataObserver { log: Arc::clone(&data_log) }));
    data.deliver_string("hello");
    data.deliver_bytes(&[1, 2, 3]);
    assert_eq!(data_log.events(), vec!["string:hello", "buffer:3"]);

    alice.set_track_enabled(&publication.sid, TrackKind::Data, false);
    alice.unsubscribe(&publication.sid, TrackKind::Data);
    alice.unpublish(&publication);

    assert_eq!(
        log.events(),
        vec![
            "published:data:chat".to_string(),
            format!("subscribed:{}", publication.sid),
            format!("disabled:{}", publication.sid),
            format!("unsubscribed:{}", publication.sid),
            format!("unpublished:{}", publication.sid),
        ]
    );
}

#[test]
fn subscription_failure_carries_the_engine_error() {
    let engine = SimEngine::new();
    let room = connect(&engine);
    let log = Arc::new(EventLog::default());

    let bob = room.add_remote("bob");
    bob.set_observer(Arc::new(RecordingParticipantObserver { log: Arc::clone(&log) }));

    let publication = bob.publish(TrackKind::Video, "screen");
    bob.fail_subscription(&publication, EngineError::new(53616, "media negotiation failed"));

    let events = log.events();
    assert_eq!(events[1], format!("subscription_failed:{}:53616", publication.sid));
}

#[test]
fn reconnect_cycle_and_dominant_speaker_reach_a_guarded_observer() {
    struct GuardedRoomObserver {
        guard: Arc<CallbackGuard<Arc<EventLog>>>,
    }

    impl RoomObserver for GuardedRoomObserver {
        fn on_connected(&self, _room: ConnectedRoom) {
            self.guard.dispatch(|l| l.push("connected"));
        }
        fn on_connect_failure(&self, _error: EngineError) {}
        fn on_reconnecting(&self, error: EngineError) {
            self.guard.dispatch(|l| l.push(format!("reconnecting:{}", error.code)));
        }
        fn on_reconnected(&self) {
            self.guard.dispatch(|l| l.push("reconnected"));
        }
        fn on_disconnected(&self, _error: Option<EngineError>) {}
        fn on_participant_connected(&self, _participant: RemoteParticipantHandle) {}
        fn on_participant_disconnected(&self, _participant_sid: &str) {}
        fn on_recording_started(&self) {}
        fn on_recording_stopped(&self) {}
        fn on_dominant_speaker_changed(&self, participant_sid: Option<&str>) {
            let event = format!("dominant:{}", participant_sid.unwrap_or("none"));
            self.guard.dispatch(move |l| l.push(event));
        }
    }

    let engine = SimEngine::new();
    let log = Arc::new(EventLog::default());
    let guard = CallbackGuard::new("room", Arc::clone(&log));
    let options = ConnectOptions {
        token: "tk".into(),
        room_name: "standup".into(),
        ..Default::default()
    };
    engine.connect(options, Arc::new(GuardedRoomObserver { guard }));
    let room = engine.last_room().expect("room registered");

    room.fire_reconnecting(EngineError::new(53001, "signaling connection interrupted"));
    room.fire_reconnected();
    room.fire_dominant_speaker(Some("PA9"));
    room.fire_dominant_speaker(None);

    let events = log.events();
    let tail: Vec<_> = events.iter().filter(|e| !e.starts_with("connected")).collect();
    assert_eq!(
        tail,
        vec!["reconnecting:53001", "reconnected", "dominant:PA9", "dominant:none"]
    );
}
