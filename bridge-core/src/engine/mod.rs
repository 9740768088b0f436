//! Boundary to the externally-linked video engine.
//!
//! Everything behind these traits -- signaling, ICE, codecs, the media
//! pipeline -- is the vendor engine's problem. The bridge only posts
//! operations in and receives observer callbacks out, on threads the
//! engine owns. The `sim` module provides the in-tree implementation used
//! by tests and by builds where the vendor engine is not linked.

pub mod options;
pub mod stats;

#[cfg(any(test, feature = "sim-engine"))]
pub mod sim;

use std::sync::Arc;

pub use options::{ConnectOptions, IceServer};
pub use stats::{LocalTrackStats, RemoteTrackStats, StatsReport};

/// Track media kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
    Data,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
            TrackKind::Data => "data",
        }
    }
}

/// Room connection state as reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

impl RoomState {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomState::Connecting => "CONNECTING",
            RoomState::Connected => "CONNECTED",
            RoomState::Reconnecting => "RECONNECTING",
            RoomState::Disconnected => "DISCONNECTED",
        }
    }
}

/// Engine-reported failure, forwarded verbatim to the host.
///
/// These are ordinary domain outcomes (connect failures, subscription
/// failures), not errors of the bridge layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine error {}: {}", self.code, self.message)
    }
}

/// Host-reported change in the device's network attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkChangeEvent {
    ConnectionChanged,
    ConnectionLost,
}

/// Identity of a participant in a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub sid: String,
    pub identity: String,
}

/// Descriptor of a track announced to a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackPublicationInfo {
    pub sid: String,
    pub name: String,
    pub kind: TrackKind,
    pub enabled: bool,
}

/// Video capture parameters handed to the host capturer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

/// One PCM buffer delivered to an attached audio sink.
#[derive(Clone, Debug)]
pub struct AudioSample {
    pub pcm: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u8,
}

/// Snapshot handed to [`RoomObserver::on_connected`].
#[derive(Clone)]
pub struct ConnectedRoom {
    pub sid: String,
    pub local: LocalParticipantHandle,
    pub remotes: Vec<RemoteParticipantHandle>,
}

/// A remote participant as handed out by the engine: identity plus the
/// control surface the bridge keeps for the participant's lifetime.
#[derive(Clone)]
pub struct RemoteParticipantHandle {
    pub info: ParticipantInfo,
    pub control: Arc<dyn RemoteParticipantControl>,
}

/// The connected local participant.
#[derive(Clone)]
pub struct LocalParticipantHandle {
    pub info: ParticipantInfo,
    pub control: Arc<dyn LocalParticipantControl>,
}

/// A subscribed remote track. `data` is present only for data tracks,
/// which carry their own message-observer surface.
#[derive(Clone)]
pub struct RemoteTrackHandle {
    pub info: TrackPublicationInfo,
    pub data: Option<Arc<dyn RemoteDataTrackControl>>,
}

// ---------------------------------------------------------------------------
// Observer traits: implemented by the bridge, invoked by the engine on
// engine-owned threads. Every implementation in this repository dispatches
// through a `CallbackGuard`.
// ---------------------------------------------------------------------------

pub trait RoomObserver: Send + Sync {
    fn on_connected(&self, room: ConnectedRoom);
    fn on_connect_failure(&self, error: EngineError);
    fn on_reconnecting(&self, error: EngineError);
    fn on_reconnected(&self);
    fn on_disconnected(&self, error: Option<EngineError>);
    fn on_participant_connected(&self, participant: RemoteParticipantHandle);
    fn on_participant_disconnected(&self, participant_sid: &str);
    fn on_recording_started(&self);
    fn on_recording_stopped(&self);
    fn on_dominant_speaker_changed(&self, participant_sid: Option<&str>);
}

pub trait ParticipantObserver: Send + Sync {
    fn on_track_published(&self, publication: TrackPublicationInfo);
    fn on_track_unpublished(&self, publication: TrackPublicationInfo);
    fn on_track_subscribed(&self, track: RemoteTrackHandle);
    fn on_track_subscription_failed(&self, publication: TrackPublicationInfo, error: EngineError);
    fn on_track_unsubscribed(&self, track_sid: &str, kind: TrackKind);
    fn on_track_enabled(&self, publication_sid: &str, kind: TrackKind);
    fn on_track_disabled(&self, publication_sid: &str, kind: TrackKind);
}

pub trait LocalParticipantObserver: Send + Sync {
    fn on_track_published(&self, publication: TrackPublicationInfo);
    fn on_track_publication_failed(&self, track_name: &str, kind: TrackKind, error: EngineError);
    fn on_track_unpublished(&self, publication: TrackPublicationInfo);
}

pub trait DataTrackObserver: Send + Sync {
    fn on_string_message(&self, message: &str);
    fn on_buffer_message(&self, message: &[u8]);
}

pub trait StatsObserver: Send + Sync {
    fn on_stats(&self, report: StatsReport);
}

pub trait AudioSinkObserver: Send + Sync {
    fn on_sample(&self, sample: AudioSample);
}

/// Capture control flowing *toward* the host: the engine decides when the
/// host capturer starts and stops feeding frames.
pub trait CapturerObserver: Send + Sync {
    fn on_start_capture(&self, format: CaptureFormat);
    fn on_stop_capture(&self);
}

// ---------------------------------------------------------------------------
// Control traits: implemented by the engine, invoked by the bridge.
// ---------------------------------------------------------------------------

/// Entry point into the engine.
pub trait VideoEngine: Send + Sync {
    /// Begin connecting. The returned control handle is live immediately;
    /// success or failure arrives later through `observer`.
    fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn RoomObserver>,
    ) -> Arc<dyn RoomControl>;

    fn create_audio_track(&self, name: &str, enabled: bool) -> Arc<dyn LocalAudioTrackControl>;

    fn create_video_track(
        &self,
        name: &str,
        enabled: bool,
        capturer: Arc<dyn CapturerObserver>,
        format: CaptureFormat,
    ) -> Arc<dyn LocalVideoTrackControl>;

    fn create_data_track(&self, name: &str, ordered: bool) -> Arc<dyn LocalDataTrackControl>;
}

/// The engine-side room object. Only the room actor thread calls the
/// mutating operations; `is_recording` is the one synchronous query.
pub trait RoomControl: Send + Sync {
    fn sid(&self) -> String;
    fn state(&self) -> RoomState;
    fn is_recording(&self) -> bool;
    fn disconnect(&self);
    fn get_stats(&self, observer: Arc<dyn StatsObserver>);
    fn network_change(&self, event: NetworkChangeEvent);
}

pub trait RemoteParticipantControl: Send + Sync {
    fn info(&self) -> ParticipantInfo;
    fn set_observer(&self, observer: Arc<dyn ParticipantObserver>);
    fn clear_observer(&self);
}

pub trait LocalParticipantControl: Send + Sync {
    fn info(&self) -> ParticipantInfo;
    fn set_observer(&self, observer: Arc<dyn LocalParticipantObserver>);
    fn clear_observer(&self);
    fn publish_audio_track(&self, track: Arc<dyn LocalAudioTrackControl>);
    fn publish_video_track(&self, track: Arc<dyn LocalVideoTrackControl>);
    fn publish_data_track(&self, track: Arc<dyn LocalDataTrackControl>);
    fn unpublish_track(&self, name: &str, kind: TrackKind);
}

pub trait LocalTrackControl: Send + Sync {
    fn name(&self) -> String;
    fn kind(&self) -> TrackKind;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

pub trait LocalAudioTrackControl: LocalTrackControl {
    /// Attach a sink; the returned id names it for removal.
    fn add_sink(&self, sink: Arc<dyn AudioSinkObserver>) -> u64;
    fn remove_sink(&self, sink_id: u64);
}

pub trait LocalVideoTrackControl: LocalTrackControl {
    /// Stop the host capturer. Called on the track's release path.
    fn stop(&self);
}

pub trait LocalDataTrackControl: LocalTrackControl {
    fn send_string(&self, message: &str);
    fn send_bytes(&self, message: &[u8]);
}

pub trait RemoteDataTrackControl: Send + Sync {
    fn info(&self) -> TrackPublicationInfo;
    fn set_observer(&self, observer: Arc<dyn DataTrackObserver>);
    fn clear_observer(&self);
}
