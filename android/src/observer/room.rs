//! Room observer adapter: engine room events into `Room.Listener` calls.

use std::sync::Arc;

use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::JNIEnv;
use tracing::debug;

use videoroom_bridge_core::engine::{
    ConnectedRoom, EngineError, RemoteParticipantHandle, RoomObserver,
};
use videoroom_bridge_core::{CallbackGuard, ChildRefMap};

use crate::class_cache;
use crate::error::Result;
use crate::jni_util::with_env;
use crate::observer::local_participant::register_local_participant;
use crate::observer::participant::register_remote_participant;
use crate::observer::{call_listener, peers, Method};

static ON_CONNECTED: Method = Method {
    name: "onConnected",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/LocalParticipant;[Lcom/videoroom/sdk/RemoteParticipant;)V",
};
static ON_CONNECT_FAILURE: Method = Method {
    name: "onConnectFailure",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_RECONNECTING: Method = Method {
    name: "onReconnecting",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_RECONNECTED: Method =
    Method { name: "onReconnected", sig: "(Lcom/videoroom/sdk/Room;)V" };
static ON_DISCONNECTED: Method = Method {
    name: "onDisconnected",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/VideoException;)V",
};
static ON_PARTICIPANT_CONNECTED: Method = Method {
    name: "onParticipantConnected",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/RemoteParticipant;)V",
};
static ON_PARTICIPANT_DISCONNECTED: Method = Method {
    name: "onParticipantDisconnected",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/RemoteParticipant;)V",
};
static ON_RECORDING_STARTED: Method =
    Method { name: "onRecordingStarted", sig: "(Lcom/videoroom/sdk/Room;)V" };
static ON_RECORDING_STOPPED: Method =
    Method { name: "onRecordingStopped", sig: "(Lcom/videoroom/sdk/Room;)V" };
static ON_DOMINANT_SPEAKER_CHANGED: Method = Method {
    name: "onDominantSpeakerChanged",
    sig: "(Lcom/videoroom/sdk/Room;Lcom/videoroom/sdk/RemoteParticipant;)V",
};

pub(crate) static METHODS: &[&Method] = &[
    &ON_CONNECTED,
    &ON_CONNECT_FAILURE,
    &ON_RECONNECTING,
    &ON_RECONNECTED,
    &ON_DISCONNECTED,
    &ON_PARTICIPANT_CONNECTED,
    &ON_PARTICIPANT_DISCONNECTED,
    &ON_RECORDING_STARTED,
    &ON_RECORDING_STOPPED,
    &ON_DOMINANT_SPEAKER_CHANGED,
];

/// Global references and dispatch for one room's Java listener, plus the
/// retained participant peers announced to it.
pub struct JavaRoomListener {
    jroom: GlobalRef,
    listener: GlobalRef,
    participants: ChildRefMap<String, GlobalRef>,
}

impl Drop for JavaRoomListener {
    /// Teardown sweep: participants whose disconnect events never fired
    /// are still released here.
    fn drop(&mut self) {
        drop(self.participants.drain());
    }
}

impl JavaRoomListener {
    pub fn new(env: &mut JNIEnv, jroom: &JObject, listener: &JObject) -> Result<Self> {
        Ok(Self {
            jroom: env.new_global_ref(jroom)?,
            listener: env.new_global_ref(listener)?,
            participants: ChildRefMap::new("room.participants"),
        })
    }

    fn room_arg(&self) -> JValue<'_, '_> {
        JValue::Object(self.jroom.as_obj())
    }

    fn connected(&self, env: &mut JNIEnv, room: &ConnectedRoom) -> Result<()> {
        let jlocal = register_local_participant(env, &room.local)?;

        let cached = class_cache::get(class_cache::REMOTE_PARTICIPANT);
        let class = JClass::from(env.new_local_ref(cached.as_obj())?);
        let remotes = env.new_object_array(room.remotes.len() as i32, class, JObject::null())?;
        for (index, remote) in room.remotes.iter().enumerate() {
            let jremote = register_remote_participant(env, remote)?;
            self.participants.insert(remote.info.sid.clone(), env.new_global_ref(&jremote)?);
            env.set_object_array_element(&remotes, index as i32, &jremote)?;
        }

        call_listener(
            env,
            self.listener.as_obj(),
            &ON_CONNECTED,
            &[self.room_arg(), JValue::Object(&jlocal), JValue::Object(&remotes)],
        )
    }

    fn connect_failure(&self, env: &mut JNIEnv, error: &EngineError) -> Result<()> {
        let jerror = peers::video_exception(env, error)?;
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_CONNECT_FAILURE,
            &[self.room_arg(), JValue::Object(&jerror)],
        )
    }

    fn reconnecting(&self, env: &mut JNIEnv, error: &EngineError) -> Result<()> {
        let jerror = peers::video_exception(env, error)?;
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_RECONNECTING,
            &[self.room_arg(), JValue::Object(&jerror)],
        )
    }

    fn reconnected(&self, env: &mut JNIEnv) -> Result<()> {
        call_listener(env, self.listener.as_obj(), &ON_RECONNECTED, &[self.room_arg()])
    }

    fn disconnected(&self, env: &mut JNIEnv, error: Option<&EngineError>) -> Result<()> {
        let jerror = match error {
            Some(error) => peers::video_exception(env, error)?,
            None => JObject::null(),
        };
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_DISCONNECTED,
            &[self.room_arg(), JValue::Object(&jerror)],
        )
    }

    fn participant_connected(
        &self,
        env: &mut JNIEnv,
        participant: &RemoteParticipantHandle,
    ) -> Result<()> {
        let jremote = register_remote_participant(env, participant)?;
        self.participants.insert(participant.info.sid.clone(), env.new_global_ref(&jremote)?);
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_PARTICIPANT_CONNECTED,
            &[self.room_arg(), JValue::Object(&jremote)],
        )
    }

    fn participant_disconnected(&self, env: &mut JNIEnv, participant_sid: &str) -> Result<()> {
        // The callback must go out with the retained peer still valid;
        // the reference is released only after it returns.
        let jremote = self.participants.take(&participant_sid.to_string());
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_PARTICIPANT_DISCONNECTED,
            &[self.room_arg(), JValue::Object(jremote.as_obj())],
        )?;
        drop(jremote);
        Ok(())
    }

    fn recording(&self, env: &mut JNIEnv, started: bool) -> Result<()> {
        let method = if started { &ON_RECORDING_STARTED } else { &ON_RECORDING_STOPPED };
        call_listener(env, self.listener.as_obj(), method, &[self.room_arg()])
    }

    fn dominant_speaker_changed(
        &self,
        env: &mut JNIEnv,
        participant_sid: Option<&str>,
    ) -> Result<()> {
        let jremote = match participant_sid {
            Some(sid) => match self.participants.peek(&sid.to_string()) {
                Some(peer) => peer,
                None => {
                    // Advisory event for a participant this room never
                    // announced; report "no dominant speaker".
                    debug!(sid, "dominant speaker for unknown participant");
                    return call_listener(
                        env,
                        self.listener.as_obj(),
                        &ON_DOMINANT_SPEAKER_CHANGED,
                        &[self.room_arg(), JValue::Object(&JObject::null())],
                    );
                }
            },
            None => {
                return call_listener(
                    env,
                    self.listener.as_obj(),
                    &ON_DOMINANT_SPEAKER_CHANGED,
                    &[self.room_arg(), JValue::Object(&JObject::null())],
                );
            }
        };
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_DOMINANT_SPEAKER_CHANGED,
            &[self.room_arg(), JValue::Object(jremote.as_obj())],
        )
    }
}

/// Engine-facing wrapper; the only path from engine threads into
/// [`JavaRoomListener`].
pub struct GuardedRoomObserver {
    guard: Arc<CallbackGuard<JavaRoomListener>>,
}

impl GuardedRoomObserver {
    pub fn new(guard: Arc<CallbackGuard<JavaRoomListener>>) -> Self {
        Self { guard }
    }
}

impl RoomObserver for GuardedRoomObserver {
    fn on_connected(&self, room: ConnectedRoom) {
        self.guard
            .dispatch(|l| with_env("Room.Listener.onConnected", |env| l.connected(env, &room)));
    }

    fn on_connect_failure(&self, error: EngineError) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onConnectFailure", |env| l.connect_failure(env, &error))
        });
    }

    fn on_reconnecting(&self, error: EngineError) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onReconnecting", |env| l.reconnecting(env, &error))
        });
    }

    fn on_reconnected(&self) {
        self.guard
            .dispatch(|l| with_env("Room.Listener.onReconnected", |env| l.reconnected(env)));
    }

    fn on_disconnected(&self, error: Option<EngineError>) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onDisconnected", |env| l.disconnected(env, error.as_ref()))
        });
    }

    fn on_participant_connected(&self, participant: RemoteParticipantHandle) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onParticipantConnected", |env| {
                l.participant_connected(env, &participant)
            })
        });
    }

    fn on_participant_disconnected(&self, participant_sid: &str) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onParticipantDisconnected", |env| {
                l.participant_disconnected(env, participant_sid)
            })
        });
    }

    fn on_recording_started(&self) {
        self.guard
            .dispatch(|l| with_env("Room.Listener.onRecordingStarted", |env| l.recording(env, true)));
    }

    fn on_recording_stopped(&self) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onRecordingStopped", |env| l.recording(env, false))
        });
    }

    fn on_dominant_speaker_changed(&self, participant_sid: Option<&str>) {
        self.guard.dispatch(|l| {
            with_env("Room.Listener.onDominantSpeakerChanged", |env| {
                l.dominant_speaker_changed(env, participant_sid)
            })
        });
    }
}
