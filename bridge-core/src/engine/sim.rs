//! Simulation engine.
//!
//! Implements the engine control traits with an instrumented fake: every
//! control call is appended to a shared [`CallLog`], observer callbacks are
//! delivered the way the vendor engine delivers them (from threads the
//! bridge does not own), and tests can inject delays, force connect
//! failures, and script room/participant events.
//!
//! The simulation models the engine's *threading and callback shape* only;
//! no media flows anywhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::debug;

use super::{
    AudioSample, AudioSinkObserver, CaptureFormat, CapturerObserver, ConnectOptions,
    ConnectedRoom, DataTrackObserver, EngineError, LocalAudioTrackControl, LocalDataTrackControl,
    LocalParticipantControl, LocalParticipantHandle, LocalParticipantObserver, LocalTrackControl,
    LocalVideoTrackControl, NetworkChangeEvent, ParticipantInfo, ParticipantObserver,
    RemoteDataTrackControl, RemoteParticipantControl, RemoteParticipantHandle, RemoteTrackHandle,
    RemoteTrackStats, RoomControl, RoomObserver, RoomState, StatsObserver, StatsReport,
    TrackKind, TrackPublicationInfo, VideoEngine,
};

static NEXT_SID: AtomicU64 = AtomicU64::new(1);

fn next_sid(prefix: &str) -> String {
    format!("{}{}", prefix, NEXT_SID.fetch_add(1, Ordering::Relaxed))
}

/// Ordered record of every control call the engine received.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Position of `call` in the log, if present.
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }
}

/// Instrumented engine entry point.
pub struct SimEngine {
    log: Arc<CallLog>,
    connect_delay: Mutex<Duration>,
    fail_connect: AtomicBool,
    rooms: Mutex<Vec<Arc<SimRoom>>>,
    audio_tracks: Mutex<Vec<Arc<SimLocalAudioTrack>>>,
}

impl SimEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(CallLog::default()),
            connect_delay: Mutex::new(Duration::ZERO),
            fail_connect: AtomicBool::new(false),
            rooms: Mutex::new(Vec::new()),
            audio_tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }

    /// Make `connect` block the calling thread for `delay` before
    /// returning, simulating a slow native call on the actor thread.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    /// Make the next connection attempt fail asynchronously.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn last_room(&self) -> Option<Arc<SimRoom>> {
        self.rooms.lock().last().cloned()
    }

    /// Concrete handle to the most recent audio track, for feeding PCM
    /// from tests.
    pub fn last_audio_track(&self) -> Option<Arc<SimLocalAudioTrack>> {
        self.audio_tracks.lock().last().cloned()
    }
}

impl VideoEngine for SimEngine {
    fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn RoomObserver>,
    ) -> Arc<dyn RoomControl> {
        self.log.push("connect");
        let delay = *self.connect_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let room = Arc::new(SimRoom {
            log: Arc::clone(&self.log),
            sid: next_sid("RM"),
            room_name: options.room_name.clone(),
            state: Mutex::new(RoomState::Connecting),
            recording: AtomicBool::new(false),
            observer: Mutex::new(Some(Arc::clone(&observer))),
            local: Arc::new(SimLocalParticipant::new(Arc::clone(&self.log))),
            remotes: Mutex::new(Vec::new()),
        });
        self.rooms.lock().push(Arc::clone(&room));

        let fail = self.fail_connect.load(Ordering::SeqCst);
        let async_room = Arc::clone(&room);
        // Connect results arrive on an engine-owned thread, as they do from
        // the vendor engine's signaling thread.
        std::thread::spawn(move || {
            if fail {
                *async_room.state.lock() = RoomState::Disconnected;
                async_room.with_observer(|o| {
                    o.on_connect_failure(EngineError::new(53104, "unable to connect to room"))
                });
            } else {
                *async_room.state.lock() = RoomState::Connected;
                let snapshot = async_room.snapshot();
                async_room.with_observer(|o| o.on_connected(snapshot));
            }
        });

        room
    }

    fn create_audio_track(&self, name: &str, enabled: bool) -> Arc<dyn LocalAudioTrackControl> {
        self.log.push(format!("create_audio_track:{name}"));
        let track = Arc::new(SimLocalAudioTrack {
            log: Arc::clone(&self.log),
            name: name.to_string(),
            enabled: AtomicBool::new(enabled),
            sinks: Mutex::new(HashMap::new()),
            next_sink: AtomicU64::new(1),
        });
        self.audio_tracks.lock().push(Arc::clone(&track));
        track
    }

    fn create_video_track(
        &self,
        name: &str,
        enabled: bool,
        capturer: Arc<dyn CapturerObserver>,
        format: CaptureFormat,
    ) -> Arc<dyn LocalVideoTrackControl> {
        self.log.push(format!("create_video_track:{name}"));
        if enabled {
            capturer.on_start_capture(format);
        }
        Arc::new(SimLocalVideoTrack {
            log: Arc::clone(&self.log),
            name: name.to_string(),
            enabled: AtomicBool::new(enabled),
            capturer,
        })
    }

    fn create_data_track(&self, name: &str, ordered: bool) -> Arc<dyn LocalDataTrackControl> {
        self.log.push(format!("create_data_track:{name}:ordered={ordered}"));
        Arc::new(SimLocalDataTrack {
            log: Arc::clone(&self.log),
            name: name.to_string(),
            enabled: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }
}

/// Instrumented room control with event-scripting helpers.
pub struct SimRoom {
    log: Arc<CallLog>,
    sid: String,
    room_name: String,
    state: Mutex<RoomState>,
    recording: AtomicBool,
    observer: Mutex<Option<Arc<dyn RoomObserver>>>,
    local: Arc<SimLocalParticipant>,
    remotes: Mutex<Vec<Arc<SimRemoteParticipant>>>,
}

impl SimRoom {
    fn with_observer(&self, f: impl FnOnce(&Arc<dyn RoomObserver>)) {
        if let Some(observer) = self.observer.lock().clone() {
            f(&observer);
        }
    }

    fn snapshot(&self) -> ConnectedRoom {
        ConnectedRoom {
            sid: self.sid.clone(),
            local: LocalParticipantHandle {
                info: self.local.info(),
                control: self.local.clone() as Arc<dyn LocalParticipantControl>,
            },
            remotes: self
                .remotes
                .lock()
                .iter()
                .map(|p| p.handle())
                .collect(),
        }
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn local(&self) -> Arc<SimLocalParticipant> {
        Arc::clone(&self.local)
    }

    /// Script a participant joining the room.
    pub fn add_remote(&self, identity: &str) -> Arc<SimRemoteParticipant> {
        let participant = Arc::new(SimRemoteParticipant {
            info: ParticipantInfo { sid: next_sid("PA"), identity: identity.to_string() },
            observer: Mutex::new(None),
        });
        self.remotes.lock().push(Arc::clone(&participant));
        let handle = participant.handle();
        self.with_observer(|o| o.on_participant_connected(handle));
        participant
    }

    /// Script a participant leaving the room.
    pub fn remove_remote(&self, sid: &str) {
        self.remotes.lock().retain(|p| p.info.sid != sid);
        self.with_observer(|o| o.on_participant_disconnected(sid));
    }

    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::SeqCst);
        self.with_observer(|o| {
            if recording {
                o.on_recording_started();
            } else {
                o.on_recording_stopped();
            }
        });
    }

    pub fn fire_dominant_speaker(&self, participant_sid: Option<&str>) {
        self.with_observer(|o| o.on_dominant_speaker_changed(participant_sid));
    }

    pub fn fire_reconnecting(&self, error: EngineError) {
        *self.state.lock() = RoomState::Reconnecting;
        self.with_observer(|o| o.on_reconnecting(error));
    }

    pub fn fire_reconnected(&self) {
        *self.state.lock() = RoomState::Connected;
        self.with_observer(|o| o.on_reconnected());
    }
}

impl RoomControl for SimRoom {
    fn sid(&self) -> String {
        self.sid.clone()
    }

    fn state(&self) -> RoomState {
        *self.state.lock()
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.log.push("disconnect");
        *self.state.lock() = RoomState::Disconnected;
        self.with_observer(|o| o.on_disconnected(None));
        *self.observer.lock() = None;
    }

    fn get_stats(&self, observer: Arc<dyn StatsObserver>) {
        self.log.push("get_stats");
        let report = StatsReport {
            peer_connection_id: format!("PC-{}", self.sid),
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            remote_audio_track_stats: vec![RemoteTrackStats {
                track_sid: "MT0".into(),
                codec: "opus".into(),
                packets_lost: 0,
                bytes_received: 0,
                packets_received: 0,
                jitter_ms: 0.0,
            }],
            ..Default::default()
        };
        // Stats are computed off-thread in the vendor engine.
        std::thread::spawn(move || observer.on_stats(report));
    }

    fn network_change(&self, event: NetworkChangeEvent) {
        self.log.push(format!("network_change:{event:?}"));
    }
}

/// Instrumented remote participant with track-event scripting helpers.
pub struct SimRemoteParticipant {
    info: ParticipantInfo,
    observer: Mutex<Option<Arc<dyn ParticipantObserver>>>,
}

impl SimRemoteParticipant {
    pub fn handle(self: &Arc<Self>) -> RemoteParticipantHandle {
        RemoteParticipantHandle {
            info: self.info.clone(),
            control: Arc::clone(self) as Arc<dyn RemoteParticipantControl>,
        }
    }

    fn with_observer(&self, f: impl FnOnce(&Arc<dyn ParticipantObserver>)) {
        if let Some(observer) = self.observer.lock().clone() {
            f(&observer);
        }
    }

    /// Script a track publication; returns the descriptor for follow-up
    /// subscribe/unpublish scripting.
    pub fn publish(&self, kind: TrackKind, name: &str) -> TrackPublicationInfo {
        let publication = TrackPublicationInfo {
            sid: next_sid("MT"),
            name: name.to_string(),
            kind,
            enabled: true,
        };
        self.with_observer(|o| o.on_track_published(publication.clone()));
        publication
    }

    /// Script a successful subscription. For data tracks the returned
    /// control lets the test deliver messages.
    pub fn subscribe(&self, publication: &TrackPublicationInfo) -> Option<Arc<SimRemoteDataTrack>> {
        let data = if publication.kind == TrackKind::Data {
            Some(Arc::new(SimRemoteDataTrack {
                info: publication.clone(),
                observer: Mutex::new(None),
            }))
        } else {
            None
        };
        let handle = RemoteTrackHandle {
            info: publication.clone(),
            data: data.clone().map(|d| d as Arc<dyn RemoteDataTrackControl>),
        };
        self.with_observer(|o| o.on_track_subscribed(handle));
        data
    }

    pub fn fail_subscription(&self, publication: &TrackPublicationInfo, error: EngineError) {
        self.with_observer(|o| o.on_track_subscription_failed(publication.clone(), error));
    }

    pub fn unsubscribe(&self, track_sid: &str, kind: TrackKind) {
        self.with_observer(|o| o.on_track_unsubscribed(track_sid, kind));
    }

    pub fn unpublish(&self, publication: &TrackPublicationInfo) {
        self.with_observer(|o| o.on_track_unpublished(publication.clone()));
    }

    pub fn set_track_enabled(&self, publication_sid: &str, kind: TrackKind, enabled: bool) {
        self.with_observer(|o| {
            if enabled {
                o.on_track_enabled(publication_sid, kind);
            } else {
                o.on_track_disabled(publication_sid, kind);
            }
        });
    }
}

impl RemoteParticipantControl for SimRemoteParticipant {
    fn info(&self) -> ParticipantInfo {
        self.info.clone()
    }

    fn set_observer(&self, observer: Arc<dyn ParticipantObserver>) {
        *self.observer.lock() = Some(observer);
    }

    fn clear_observer(&self) {
        *self.observer.lock() = None;
    }
}

/// Instrumented local participant.
pub struct SimLocalParticipant {
    log: Arc<CallLog>,
    info: ParticipantInfo,
    observer: Mutex<Option<Arc<dyn LocalParticipantObserver>>>,
    published: Mutex<HashMap<(String, TrackKind), TrackPublicationInfo>>,
    fail_next_publish: AtomicBool,
}

impl SimLocalParticipant {
    fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            info: ParticipantInfo { sid: next_sid("PA"), identity: "local".to_string() },
            observer: Mutex::new(None),
            published: Mutex::new(HashMap::new()),
            fail_next_publish: AtomicBool::new(false),
        }
    }

    pub fn set_fail_next_publish(&self, fail: bool) {
        self.fail_next_publish.store(fail, Ordering::SeqCst);
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().len()
    }

    fn with_observer(&self, f: impl FnOnce(&Arc<dyn LocalParticipantObserver>)) {
        if let Some(observer) = self.observer.lock().clone() {
            f(&observer);
        }
    }

    fn publish(&self, name: String, kind: TrackKind) {
        self.log.push(format!("publish_{}:{}", kind.as_str(), name));
        if self.fail_next_publish.swap(false, Ordering::SeqCst) {
            self.with_observer(|o| {
                o.on_track_publication_failed(
                    &name,
                    kind,
                    EngineError::new(53400, "track publication failed"),
                )
            });
            return;
        }
        let publication = TrackPublicationInfo {
            sid: next_sid("MT"),
            name: name.clone(),
            kind,
            enabled: true,
        };
        self.published.lock().insert((name, kind), publication.clone());
        self.with_observer(|o| o.on_track_published(publication));
    }
}

impl LocalParticipantControl for SimLocalParticipant {
    fn info(&self) -> ParticipantInfo {
        self.info.clone()
    }

    fn set_observer(&self, observer: Arc<dyn LocalParticipantObserver>) {
        *self.observer.lock() = Some(observer);
    }

    fn clear_observer(&self) {
        *self.observer.lock() = None;
    }

    fn publish_audio_track(&self, track: Arc<dyn LocalAudioTrackControl>) {
        self.publish(track.name(), TrackKind::Audio);
    }

    fn publish_video_track(&self, track: Arc<dyn LocalVideoTrackControl>) {
        self.publish(track.name(), TrackKind::Video);
    }

    fn publish_data_track(&self, track: Arc<dyn LocalDataTrackControl>) {
        self.publish(track.name(), TrackKind::Data);
    }

    fn unpublish_track(&self, name: &str, kind: TrackKind) {
        self.log.push(format!("unpublish_{}:{}", kind.as_str(), name));
        match self.published.lock().remove(&(name.to_string(), kind)) {
            Some(publication) => self.with_observer(|o| o.on_track_unpublished(publication)),
            None => debug!(name, "unpublish for a track that was never published"),
        }
    }
}

pub struct SimLocalAudioTrack {
    log: Arc<CallLog>,
    name: String,
    enabled: AtomicBool,
    sinks: Mutex<HashMap<u64, Arc<dyn AudioSinkObserver>>>,
    next_sink: AtomicU64,
}

impl SimLocalAudioTrack {
    /// Fan one PCM buffer out to every attached sink.
    pub fn feed(&self, sample: AudioSample) {
        for sink in self.sinks.lock().values() {
            sink.on_sample(sample.clone());
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }
}

impl LocalTrackControl for SimLocalAudioTrack {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.log.push(format!("audio_enable:{}:{enabled}", self.name));
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl LocalAudioTrackControl for SimLocalAudioTrack {
    fn add_sink(&self, sink: Arc<dyn AudioSinkObserver>) -> u64 {
        let id = self.next_sink.fetch_add(1, Ordering::Relaxed);
        self.sinks.lock().insert(id, sink);
        id
    }

    fn remove_sink(&self, sink_id: u64) {
        self.sinks.lock().remove(&sink_id);
    }
}

pub struct SimLocalVideoTrack {
    log: Arc<CallLog>,
    name: String,
    enabled: AtomicBool,
    capturer: Arc<dyn CapturerObserver>,
}

impl LocalTrackControl for SimLocalVideoTrack {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.log.push(format!("video_enable:{}:{enabled}", self.name));
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl LocalVideoTrackControl for SimLocalVideoTrack {
    fn stop(&self) {
        self.log.push(format!("video_stop:{}", self.name));
        self.capturer.on_stop_capture();
    }
}

pub struct SimLocalDataTrack {
    log: Arc<CallLog>,
    name: String,
    enabled: AtomicBool,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl SimLocalDataTrack {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

impl LocalTrackControl for SimLocalDataTrack {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Data
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl LocalDataTrackControl for SimLocalDataTrack {
    fn send_string(&self, message: &str) {
        self.log.push(format!("send_string:{}", self.name));
        self.sent.lock().push(message.as_bytes().to_vec());
    }

    fn send_bytes(&self, message: &[u8]) {
        self.log.push(format!("send_bytes:{}", self.name));
        self.sent.lock().push(message.to_vec());
    }
}

pub struct SimRemoteDataTrack {
    info: TrackPublicationInfo,
    observer: Mutex<Option<Arc<dyn DataTrackObserver>>>,
}

impl SimRemoteDataTrack {
    pub fn deliver_string(&self, message: &str) {
        if let Some(observer) = self.observer.lock().clone() {
            observer.on_string_message(message);
        }
    }

    pub fn deliver_bytes(&self, message: &[u8]) {
        if let Some(observer) = self.observer.lock().clone() {
            observer.on_buffer_message(message);
        }
    }
}

impl RemoteDataTrackControl for SimRemoteDataTrack {
    fn info(&self) -> TrackPublicationInfo {
        self.info.clone()
    }

    fn set_observer(&self, observer: Arc<dyn DataTrackObserver>) {
        *self.observer.lock() = Some(observer);
    }

    fn clear_observer(&self) {
        *self.observer.lock() = None;
    }
}
