//! Remote participant observer adapter.
//!
//! Track events arrive here per participant. Publication and track peers
//! are constructed once, retained in the participant's child maps, and
//! resolved from them for every later event naming the same child.

use std::sync::Arc;

use jni::objects::{GlobalRef, JValue};
use jni::JNIEnv;
use parking_lot::Mutex;

use videoroom_bridge_core::engine::{
    EngineError, ParticipantObserver, RemoteParticipantHandle, RemoteTrackHandle, TrackKind,
    TrackPublicationInfo,
};
use videoroom_bridge_core::{CallbackGuard, ChildRefMap};

use crate::context::{self, RemoteDataTrackContext, RemoteParticipantContext};
use crate::error::Result;
use crate::jni_util::{self, with_env};
use crate::observer::{call_listener, peers, Method};

static ON_AUDIO_TRACK_PUBLISHED: Method = Method {
    name: "onAudioTrackPublished",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_VIDEO_TRACK_PUBLISHED: Method = Method {
    name: "onVideoTrackPublished",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_DATA_TRACK_PUBLISHED: Method = Method {
    name: "onDataTrackPublished",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_AUDIO_TRACK_UNPUBLISHED: Method = Method {
    name: "onAudioTrackUnpublished",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_VIDEO_TRACK_UNPUBLISHED: Method = Method {
    name: "onVideoTrackUnpublished",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_DATA_TRACK_UNPUBLISHED: Method = Method {
    name: "onDataTrackUnpublished",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_AUDIO_TRACK_SUBSCRIBED: Method = Method {
    name: "onAudioTrackSubscribed",
    sig: "(Lcom/videoroom/sdk/RemoteAudioTrack;)V",
};
static ON_VIDEO_TRACK_SUBSCRIBED: Method = Method {
    name: "onVideoTrackSubscribed",
    sig: "(Lcom/videoroom/sdk/RemoteVideoTrack;)V",
};
static ON_DATA_TRACK_SUBSCRIBED: Method = Method {
    name: "onDataTrackSubscribed",
    sig: "(Lcom/videoroom/sdk/RemoteDataTrack;)V",
};
static ON_AUDIO_TRACK_SUBSCRIPTION_FAILED: Method = Method {
    name: "onAudioTrackSubscriptionFailed",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_VIDEO_TRACK_SUBSCRIPTION_FAILED: Method = Method {
    name: "onVideoTrackSubscriptionFailed",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_DATA_TRACK_SUBSCRIPTION_FAILED: Method = Method {
    name: "onDataTrackSubscriptionFailed",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_AUDIO_TRACK_UNSUBSCRIBED: Method = Method {
    name: "onAudioTrackUnsubscribed",
    sig: "(Lcom/videoroom/sdk/RemoteAudioTrack;)V",
};
static ON_VIDEO_TRACK_UNSUBSCRIBED: Method = Method {
    name: "onVideoTrackUnsubscribed",
    sig: "(Lcom/videoroom/sdk/RemoteVideoTrack;)V",
};
static ON_DATA_TRACK_UNSUBSCRIBED: Method = Method {
    name: "onDataTrackUnsubscribed",
    sig: "(Lcom/videoroom/sdk/RemoteDataTrack;)V",
};
static ON_AUDIO_TRACK_ENABLED: Method = Method {
    name: "onAudioTrackEnabled",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_VIDEO_TRACK_ENABLED: Method = Method {
    name: "onVideoTrackEnabled",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_DATA_TRACK_ENABLED: Method = Method {
    name: "onDataTrackEnabled",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_AUDIO_TRACK_DISABLED: Method = Method {
    name: "onAudioTrackDisabled",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_VIDEO_TRACK_DISABLED: Method = Method {
    name: "onVideoTrackDisabled",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};
static ON_DATA_TRACK_DISABLED: Method = Method {
    name: "onDataTrackDisabled",
    sig: "(Lcom/videoroom/sdk/RemoteTrackPublication;)V",
};

pub(crate) static METHODS: &[&Method] = &[
    &ON_AUDIO_TRACK_PUBLISHED,
    &ON_VIDEO_TRACK_PUBLISHED,
    &ON_DATA_TRACK_PUBLISHED,
    &ON_AUDIO_TRACK_UNPUBLISHED,
    &ON_VIDEO_TRACK_UNPUBLISHED,
    &ON_DATA_TRACK_UNPUBLISHED,
    &ON_AUDIO_TRACK_SUBSCRIBED,
    &ON_VIDEO_TRACK_SUBSCRIBED,
    &ON_DATA_TRACK_SUBSCRIBED,
    &ON_AUDIO_TRACK_SUBSCRIPTION_FAILED,
    &ON_VIDEO_TRACK_SUBSCRIPTION_FAILED,
    &ON_DATA_TRACK_SUBSCRIPTION_FAILED,
    &ON_AUDIO_TRACK_UNSUBSCRIBED,
    &ON_VIDEO_TRACK_UNSUBSCRIBED,
    &ON_DATA_TRACK_UNSUBSCRIBED,
    &ON_AUDIO_TRACK_ENABLED,
    &ON_VIDEO_TRACK_ENABLED,
    &ON_DATA_TRACK_ENABLED,
    &ON_AUDIO_TRACK_DISABLED,
    &ON_VIDEO_TRACK_DISABLED,
    &ON_DATA_TRACK_DISABLED,
];

fn published_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_PUBLISHED,
        TrackKind::Video => &ON_VIDEO_TRACK_PUBLISHED,
        TrackKind::Data => &ON_DATA_TRACK_PUBLISHED,
    }
}

fn unpublished_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_UNPUBLISHED,
        TrackKind::Video => &ON_VIDEO_TRACK_UNPUBLISHED,
        TrackKind::Data => &ON_DATA_TRACK_UNPUBLISHED,
    }
}

fn subscribed_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_SUBSCRIBED,
        TrackKind::Video => &ON_VIDEO_TRACK_SUBSCRIBED,
        TrackKind::Data => &ON_DATA_TRACK_SUBSCRIBED,
    }
}

fn subscription_failed_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_SUBSCRIPTION_FAILED,
        TrackKind::Video => &ON_VIDEO_TRACK_SUBSCRIPTION_FAILED,
        TrackKind::Data => &ON_DATA_TRACK_SUBSCRIPTION_FAILED,
    }
}

fn unsubscribed_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_UNSUBSCRIBED,
        TrackKind::Video => &ON_VIDEO_TRACK_UNSUBSCRIBED,
        TrackKind::Data => &ON_DATA_TRACK_UNSUBSCRIBED,
    }
}

fn enabled_method(kind: TrackKind, enabled: bool) -> &'static Method {
    match (kind, enabled) {
        (TrackKind::Audio, true) => &ON_AUDIO_TRACK_ENABLED,
        (TrackKind::Video, true) => &ON_VIDEO_TRACK_ENABLED,
        (TrackKind::Data, true) => &ON_DATA_TRACK_ENABLED,
        (TrackKind::Audio, false) => &ON_AUDIO_TRACK_DISABLED,
        (TrackKind::Video, false) => &ON_VIDEO_TRACK_DISABLED,
        (TrackKind::Data, false) => &ON_DATA_TRACK_DISABLED,
    }
}

/// Create the native context, Java peer and guarded observer for a remote
/// participant the engine just announced.
///
/// The peer's constructor takes the context handle and the listener needs
/// the peer, so this runs in two phases: context first, observer guard
/// second.
pub(crate) fn register_remote_participant<'local>(
    env: &mut JNIEnv<'local>,
    remote: &RemoteParticipantHandle,
) -> Result<jni::objects::JObject<'local>> {
    let ctx = Arc::new(RemoteParticipantContext {
        control: Arc::clone(&remote.control),
        observer: std::sync::OnceLock::new(),
    });
    let handle = context::remote_participants().insert(Arc::clone(&ctx));

    let jparticipant = peers::remote_participant(env, handle.to_jni(), &remote.info)?;
    let listener = JavaParticipantListener::new(env, &jparticipant)?;
    let guard = CallbackGuard::new("participant", listener);
    let _ = ctx.observer.set(Arc::clone(&guard));

    remote.control.set_observer(Arc::new(GuardedParticipantObserver::new(guard)));
    Ok(jparticipant)
}

/// Global references and dispatch for one remote participant's Java peer.
pub struct JavaParticipantListener {
    jparticipant: GlobalRef,
    publications: ChildRefMap<String, GlobalRef>,
    tracks: ChildRefMap<String, GlobalRef>,
}

impl Drop for JavaParticipantListener {
    /// Teardown sweep: tracks and publications the engine never removed
    /// are still released here.
    fn drop(&mut self) {
        drop(self.tracks.drain());
        drop(self.publications.drain());
    }
}

impl JavaParticipantListener {
    pub fn new(env: &mut JNIEnv, jparticipant: &jni::objects::JObject) -> Result<Self> {
        Ok(Self {
            jparticipant: env.new_global_ref(jparticipant)?,
            publications: ChildRefMap::new("participant.publications"),
            tracks: ChildRefMap::new("participant.tracks"),
        })
    }

    fn track_published(&self, env: &mut JNIEnv, publication: &TrackPublicationInfo) -> Result<()> {
        let jpublication = peers::remote_track_publication(env, publication)?;
        self.publications.insert(publication.sid.clone(), env.new_global_ref(&jpublication)?);
        call_listener(
            env,
            self.jparticipant.as_obj(),
            published_method(publication.kind),
            &[JValue::Object(&jpublication)],
        )
    }

    fn track_unpublished(
        &self,
        env: &mut JNIEnv,
        publication: &TrackPublicationInfo,
    ) -> Result<()> {
        let jpublication = self.publications.take(&publication.sid);
        call_listener(
            env,
            self.jparticipant.as_obj(),
            unpublished_method(publication.kind),
            &[JValue::Object(jpublication.as_obj())],
        )?;
        drop(jpublication);
        Ok(())
    }

    fn track_subscribed(&self, env: &mut JNIEnv, track: &RemoteTrackHandle) -> Result<()> {
        let jtrack = match track.info.kind {
            TrackKind::Data => {
                let control = match &track.data {
                    Some(control) => Arc::clone(control),
                    None => jni_util::fatal("data track subscription without a data control"),
                };
                let ctx = Arc::new(RemoteDataTrackContext {
                    control,
                    observer: Mutex::new(None),
                });
                let handle = context::remote_data_tracks().insert(ctx);
                peers::remote_data_track(env, handle.to_jni(), &track.info)?
            }
            _ => peers::remote_media_track(env, &track.info)?,
        };
        self.tracks.insert(track.info.sid.clone(), env.new_global_ref(&jtrack)?);
        call_listener(
            env,
            self.jparticipant.as_obj(),
            subscribed_method(track.info.kind),
            &[JValue::Object(&jtrack)],
        )
    }

    fn track_subscription_failed(
        &self,
        env: &mut JNIEnv,
        publication: &TrackPublicationInfo,
        error: &EngineError,
    ) -> Result<()> {
        let jpublication = match self.publications.peek(&publication.sid) {
            Some(peer) => peer,
            None => jni_util::fatal(&format!(
                "subscription failure for unannounced publication {}",
                publication.sid
            )),
        };
        let jerror = peers::video_exception(env, error)?;
        call_listener(
            env,
            self.jparticipant.as_obj(),
            subscription_failed_method(publication.kind),
            &[JValue::Object(jpublication.as_obj()), JValue::Object(&jerror)],
        )
    }

    fn track_unsubscribed(&self, env: &mut JNIEnv, track_sid: &str, kind: TrackKind) -> Result<()> {
        let jtrack = self.tracks.take(&track_sid.to_string());
        call_listener(
            env,
            self.jparticipant.as_obj(),
            unsubscribed_method(kind),
            &[JValue::Object(jtrack.as_obj())],
        )?;
        drop(jtrack);
        Ok(())
    }

    fn track_enabled(
        &self,
        env: &mut JNIEnv,
        publication_sid: &str,
        kind: TrackKind,
        enabled: bool,
    ) -> Result<()> {
        let jpublication = match self.publications.peek(&publication_sid.to_string()) {
            Some(peer) => peer,
            None => jni_util::fatal(&format!(
                "enable state change for unannounced publication {publication_sid}"
            )),
        };
        call_listener(
            env,
            self.jparticipant.as_obj(),
            enabled_method(kind, enabled),
            &[JValue::Object(jpublication.as_obj())],
        )
    }
}

/// Engine-facing wrapper around the guard.
pub struct GuardedParticipantObserver {
    guard: Arc<CallbackGuard<JavaParticipantListener>>,
}

impl GuardedParticipantObserver {
    pub fn new(guard: Arc<CallbackGuard<JavaParticipantListener>>) -> Self {
        Self { guard }
    }
}

impl ParticipantObserver for GuardedParticipantObserver {
    fn on_track_published(&self, publication: TrackPublicationInfo) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackPublished", |env| {
                l.track_published(env, &publication)
            })
        });
    }

    fn on_track_unpublished(&self, publication: TrackPublicationInfo) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackUnpublished", |env| {
                l.track_unpublished(env, &publication)
            })
        });
    }

    fn on_track_subscribed(&self, track: RemoteTrackHandle) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackSubscribed", |env| l.track_subscribed(env, &track))
        });
    }

    fn on_track_subscription_failed(&self, publication: TrackPublicationInfo, error: EngineError) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackSubscriptionFailed", |env| {
                l.track_subscription_failed(env, &publication, &error)
            })
        });
    }

    fn on_track_unsubscribed(&self, track_sid: &str, kind: TrackKind) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackUnsubscribed", |env| {
                l.track_unsubscribed(env, track_sid, kind)
            })
        });
    }

    fn on_track_enabled(&self, publication_sid: &str, kind: TrackKind) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackEnabled", |env| {
                l.track_enabled(env, publication_sid, kind, true)
            })
        });
    }

    fn on_track_disabled(&self, publication_sid: &str, kind: TrackKind) {
        self.guard.dispatch(|l| {
            with_env("RemoteParticipant.onTrackDisabled", |env| {
                l.track_enabled(env, publication_sid, kind, false)
            })
        });
    }
}
