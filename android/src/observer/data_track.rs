//! Remote data track observer adapter: inbound messages into Java.

use std::sync::Arc;

use jni::objects::{GlobalRef, JObject, JValue};
use jni::JNIEnv;

use videoroom_bridge_core::engine::DataTrackObserver;
use videoroom_bridge_core::CallbackGuard;

use crate::error::Result;
use crate::jni_util::with_env;
use crate::observer::{call_listener, Method};

static ON_STRING_MESSAGE: Method = Method {
    name: "onMessage",
    sig: "(Lcom/videoroom/sdk/RemoteDataTrack;Ljava/lang/String;)V",
};
static ON_BUFFER_MESSAGE: Method = Method {
    name: "onMessage",
    sig: "(Lcom/videoroom/sdk/RemoteDataTrack;[B)V",
};

pub(crate) static METHODS: &[&Method] = &[&ON_STRING_MESSAGE, &ON_BUFFER_MESSAGE];

/// Global references and dispatch for one data track's message listener.
pub struct JavaDataTrackListener {
    jtrack: GlobalRef,
    listener: GlobalRef,
}

impl JavaDataTrackListener {
    pub fn new(env: &mut JNIEnv, jtrack: &JObject, listener: &JObject) -> Result<Self> {
        Ok(Self {
            jtrack: env.new_global_ref(jtrack)?,
            listener: env.new_global_ref(listener)?,
        })
    }

    fn string_message(&self, env: &mut JNIEnv, message: &str) -> Result<()> {
        let jmessage = env.new_string(message)?;
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_STRING_MESSAGE,
            &[JValue::Object(self.jtrack.as_obj()), JValue::Object(&jmessage)],
        )
    }

    fn buffer_message(&self, env: &mut JNIEnv, message: &[u8]) -> Result<()> {
        let jbuffer = env.byte_array_from_slice(message)?;
        call_listener(
            env,
            self.listener.as_obj(),
            &ON_BUFFER_MESSAGE,
            &[JValue::Object(self.jtrack.as_obj()), JValue::Object(&jbuffer)],
        )
    }
}

/// Engine-facing wrapper around the guard.
pub struct GuardedDataTrackObserver {
    guard: Arc<CallbackGuard<JavaDataTrackListener>>,
}

impl GuardedDataTrackObserver {
    pub fn new(guard: Arc<CallbackGuard<JavaDataTrackListener>>) -> Self {
        Self { guard }
    }
}

impl DataTrackObserver for GuardedDataTrackObserver {
    fn on_string_message(&self, message: &str) {
        self.guard.dispatch(|l| {
            with_env("RemoteDataTrack.Listener.onMessage", |env| l.string_message(env, message))
        });
    }

    fn on_buffer_message(&self, message: &[u8]) {
        self.guard.dispatch(|l| {
            with_env("RemoteDataTrack.Listener.onMessage", |env| l.buffer_message(env, message))
        });
    }
}
