//! Native contexts owned by Java peers, and the per-kind handle
//! registries they live in.
//!
//! Every `nativeCreate`-style entry point allocates one context, inserts
//! it into its kind's registry and hands the resulting handle to Java.
//! The matching `nativeRelease` detaches it exactly once; a second
//! release, or any use after it, resolves to a registry miss and is
//! fatal.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use videoroom_bridge_core::engine::{
    LocalAudioTrackControl, LocalDataTrackControl, LocalParticipantControl,
    LocalVideoTrackControl, RemoteDataTrackControl, RemoteParticipantControl, VideoEngine,
};
use videoroom_bridge_core::{CallbackGuard, HandleRegistry, RoomDelegate};

use crate::observer::audio_sink::JavaAudioSink;
use crate::observer::capturer::JavaCapturer;
use crate::observer::data_track::JavaDataTrackListener;
use crate::observer::local_participant::JavaLocalParticipantListener;
use crate::observer::participant::JavaParticipantListener;
use crate::observer::room::JavaRoomListener;
use crate::observer::stats::JavaStatsQueue;

/// One connected (or connecting) room: the actor owning the engine room,
/// plus the guards for its two observers.
pub struct RoomContext {
    pub delegate: RoomDelegate,
    pub room_guard: Arc<CallbackGuard<JavaRoomListener>>,
    pub stats_guard: Arc<CallbackGuard<JavaStatsQueue>>,
}

/// Engine factory handle backing `com.videoroom.sdk.MediaFactory`.
pub struct MediaFactoryContext {
    pub engine: Arc<dyn VideoEngine>,
}

pub struct AudioTrackContext {
    pub track: Arc<dyn LocalAudioTrackControl>,
}

pub struct VideoTrackContext {
    pub track: Arc<dyn LocalVideoTrackControl>,
    pub capturer_guard: Arc<CallbackGuard<JavaCapturer>>,
}

pub struct LocalDataTrackContext {
    pub track: Arc<dyn LocalDataTrackControl>,
}

/// Attached audio sink: the guard for the Java sink plus what is needed
/// to detach it from the engine track on release.
pub struct AudioSinkContext {
    pub track: Arc<dyn LocalAudioTrackControl>,
    pub sink_id: u64,
    pub guard: Arc<CallbackGuard<JavaAudioSink>>,
}

/// The observer guard is attached after the Java peer exists (the peer's
/// constructor needs the handle, the listener needs the peer), hence the
/// `OnceLock` second phase.
pub struct LocalParticipantContext {
    pub control: Arc<dyn LocalParticipantControl>,
    pub observer: OnceLock<Arc<CallbackGuard<JavaLocalParticipantListener>>>,
}

pub struct RemoteParticipantContext {
    pub control: Arc<dyn RemoteParticipantControl>,
    pub observer: OnceLock<Arc<CallbackGuard<JavaParticipantListener>>>,
}

/// Remote data track; the listener arrives later (and may be replaced)
/// through `nativeSetListener`.
pub struct RemoteDataTrackContext {
    pub control: Arc<dyn RemoteDataTrackControl>,
    pub observer: Mutex<Option<Arc<CallbackGuard<JavaDataTrackListener>>>>,
}

macro_rules! registry {
    ($fn_name:ident, $ctx:ty, $label:literal) => {
        pub fn $fn_name() -> &'static HandleRegistry<$ctx> {
            static REGISTRY: OnceLock<HandleRegistry<$ctx>> = OnceLock::new();
            REGISTRY.get_or_init(|| HandleRegistry::new($label))
        }
    };
}

registry!(rooms, RoomContext, "room");
registry!(media_factories, MediaFactoryContext, "media_factory");
registry!(audio_tracks, AudioTrackContext, "local_audio_track");
registry!(video_tracks, VideoTrackContext, "local_video_track");
registry!(local_data_tracks, LocalDataTrackContext, "local_data_track");
registry!(audio_sinks, AudioSinkContext, "audio_sink");
registry!(local_participants, LocalParticipantContext, "local_participant");
registry!(remote_participants, RemoteParticipantContext, "remote_participant");
registry!(remote_data_tracks, RemoteDataTrackContext, "remote_data_track");
