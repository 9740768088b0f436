//! Local participant observer adapter: publish outcomes into Java.

use std::sync::Arc;

use jni::objects::{GlobalRef, JObject, JValue};
use jni::JNIEnv;

use videoroom_bridge_core::engine::{
    EngineError, LocalParticipantHandle, LocalParticipantObserver, TrackKind,
    TrackPublicationInfo,
};
use videoroom_bridge_core::{CallbackGuard, ChildRefMap};

use crate::context::{self, LocalParticipantContext};
use crate::error::Result;
use crate::jni_util::with_env;
use crate::observer::{call_listener, peers, Method};

static ON_AUDIO_TRACK_PUBLISHED: Method = Method {
    name: "onAudioTrackPublished",
    sig: "(Lcom/videoroom/sdk/LocalTrackPublication;)V",
};
static ON_VIDEO_TRACK_PUBLISHED: Method = Method {
    name: "onVideoTrackPublished",
    sig: "(Lcom/videoroom/sdk/LocalTrackPublication;)V",
};
static ON_DATA_TRACK_PUBLISHED: Method = Method {
    name: "onDataTrackPublished",
    sig: "(Lcom/videoroom/sdk/LocalTrackPublication;)V",
};
static ON_AUDIO_TRACK_PUBLICATION_FAILED: Method = Method {
    name: "onAudioTrackPublicationFailed",
    sig: "(Ljava/lang/String;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_VIDEO_TRACK_PUBLICATION_FAILED: Method = Method {
    name: "onVideoTrackPublicationFailed",
    sig: "(Ljava/lang/String;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_DATA_TRACK_PUBLICATION_FAILED: Method = Method {
    name: "onDataTrackPublicationFailed",
    sig: "(Ljava/lang/String;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_AUDIO_TRACK_UNPUBLISHED: Method = Method {
    name: "onAudioTrackUnpublished",
    sig: "(Lcom/videoroom/sdk/LocalTrackPublication;)V",
};
static ON_VIDEO_TRACK_UNPUBLISHED: Method = Method {
    name: "onVideoTrackUnpublished",
    sig: "(Lcom/videoroom/sdk/LocalTrackPublication;)V",
};
static ON_DATA_TRACK_UNPUBLISHED: Method = Method {
    name: "onDataTrackUnpublished",
    sig: "(Lcom/videoroom/sdk/LocalTrackPublication;)V",
};

pub(crate) static METHODS: &[&Method] = &[
    &ON_AUDIO_TRACK_PUBLISHED,
    &ON_VIDEO_TRACK_PUBLISHED,
    &ON_DATA_TRACK_PUBLISHED,
    &ON_AUDIO_TRACK_PUBLICATION_FAILED,
    &ON_VIDEO_TRACK_PUBLICATION_FAILED,
    &ON_DATA_TRACK_PUBLICATION_FAILED,
    &ON_AUDIO_TRACK_UNPUBLISHED,
    &ON_VIDEO_TRACK_UNPUBLISHED,
    &ON_DATA_TRACK_UNPUBLISHED,
];

fn published_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_PUBLISHED,
        TrackKind::Video => &ON_VIDEO_TRACK_PUBLISHED,
        TrackKind::Data => &ON_DATA_TRACK_PUBLISHED,
    }
}

fn publication_failed_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_PUBLICATION_FAILED,
        TrackKind::Video => &ON_VIDEO_TRACK_PUBLICATION_FAILED,
        TrackKind::Data => &ON_DATA_TRACK_PUBLICATION_FAILED,
    }
}

fn unpublished_method(kind: TrackKind) -> &'static Method {
    match kind {
        TrackKind::Audio => &ON_AUDIO_TRACK_UNPUBLISHED,
        TrackKind::Video => &ON_VIDEO_TRACK_UNPUBLISHED,
        TrackKind::Data => &ON_DATA_TRACK_UNPUBLISHED,
    }
}

/// Create the context, Java peer and guarded observer for the connected
/// local participant. Same two-phase shape as the remote variant.
pub(crate) fn register_local_participant<'local>(
    env: &mut JNIEnv<'local>,
    local: &LocalParticipantHandle,
) -> Result<JObject<'local>> {
    let ctx = Arc::new(LocalParticipantContext {
        control: Arc::clone(&local.control),
        observer: std::sync::OnceLock::new(),
    });
    let handle = context::local_participants().insert(Arc::clone(&ctx));

    let jlocal = peers::local_participant(env, handle.to_jni(), &local.info)?;
    let listener = JavaLocalParticipantListener::new(env, &jlocal)?;
    let guard = CallbackGuard::new("local_participant", listener);
    let _ = ctx.observer.set(Arc::clone(&guard));

    local.control.set_observer(Arc::new(GuardedLocalParticipantObserver::new(guard)));
    Ok(jlocal)
}

/// Global references and dispatch for the local participant's Java peer.
pub struct JavaLocalParticipantListener {
    jlocal: GlobalRef,
    publications: ChildRefMap<String, GlobalRef>,
}

impl Drop for JavaLocalParticipantListener {
    /// Teardown sweep for publications that never saw an unpublish.
    fn drop(&mut self) {
        drop(self.publications.drain());
    }
}

impl JavaLocalParticipantListener {
    pub fn new(env: &mut JNIEnv, jlocal: &JObject) -> Result<Self> {
        Ok(Self {
            jlocal: env.new_global_ref(jlocal)?,
            publications: ChildRefMap::new("local_participant.publications"),
        })
    }

    fn track_published(&self, env: &mut JNIEnv, publication: &TrackPublicationInfo) -> Result<()> {
        let jpublication = peers::local_track_publication(env, publication)?;
        self.publications.insert(publication.sid.clone(), env.new_global_ref(&jpublication)?);
        call_listener(
            env,
            self.jlocal.as_obj(),
            published_method(publication.kind),
            &[JValue::Object(&jpublication)],
        )
    }

    fn track_publication_failed(
        &self,
        env: &mut JNIEnv,
        track_name: &str,
        kind: TrackKind,
        error: &EngineError,
    ) -> Result<()> {
        let jname = env.new_string(track_name)?;
        let jerror = peers::video_exception(env, error)?;
        call_listener(
            env,
            self.jlocal.as_obj(),
            publication_failed_method(kind),
            &[JValue::Object(&jname), JValue::Object(&jerror)],
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
            self.jlocal.as_obj(),
            unpublished_method(publication.kind),
            &[JValue::Object(jpublication.as_obj())],
        )?;
        drop(jpublication);
        Ok(())
    }
}

/// Engine-facing wrapper around the guard.
pub struct GuardedLocalParticipantObserver {
    guard: Arc<CallbackGuard<JavaLocalParticipantListener>>,
}

impl GuardedLocalParticipantObserver {
    pub fn new(guard: Arc<CallbackGuard<JavaLocalParticipantListener>>) -> Self {
        Self { guard }
    }
}

impl LocalParticipantObserver for GuardedLocalParticipantObserver {
    fn on_track_published(&self, publication: TrackPublicationInfo) {
        self.guard.dispatch(|l| {
            with_env("LocalParticipant.onTrackPublished", |env| {
                l.track_published(env, &publication)
            })
        });
    }

    fn on_track_publication_failed(&self, track_name: &str, kind: TrackKind, error: EngineError) {
        self.guard.dispatch(|l| {
            with_env("LocalParticipant.onTrackPublicationFailed", |env| {
                l.track_publication_failed(env, track_name, kind, &error)
            })
        });
    }

    fn on_track_unpublished(&self, publication: TrackPublicationInfo) {
        self.guard.dispatch(|l| {
            with_env("LocalParticipant.onTrackUnpublished", |env| {
                l.track_unpublished(env, &publication)
            })
        });
    }
}
