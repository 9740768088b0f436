//! Audio sink adapter: engine PCM buffers into a Java sink.

use std::sync::Arc;

use jni::objects::{GlobalRef, JObject, JValue};
use jni::JNIEnv;

use videoroom_bridge_core::engine::{AudioSample, AudioSinkObserver};
use videoroom_bridge_core::CallbackGuard;

use crate::error::Result;
use crate::jni_util::with_env;
use crate::observer::{call_listener, Method};

static ON_SAMPLE: Method = Method { name: "onSample", sig: "([BII)V" };

pub(crate) static METHODS: &[&Method] = &[&ON_SAMPLE];

/// Global reference and dispatch for one attached Java audio sink.
pub struct JavaAudioSink {
    sink: GlobalRef,
}

impl JavaAudioSink {
    pub fn new(env: &mut JNIEnv, sink: &JObject) -> Result<Self> {
        Ok(Self { sink: env.new_global_ref(sink)? })
    }

    fn sample(&self, env: &mut JNIEnv, sample: &AudioSample) -> Result<()> {
        // Little-endian 16-bit PCM, matching the Java side's ByteBuffer
        // interpretation.
        let bytes: Vec<u8> = sample.pcm.iter().flat_map(|value| value.to_le_bytes()).collect();
        let jbuffer = env.byte_array_from_slice(&bytes)?;
        call_listener(
            env,
            self.sink.as_obj(),
            &ON_SAMPLE,
            &[
                JValue::Object(&jbuffer),
                JValue::Int(sample.sample_rate as i32),
                JValue::Int(sample.channels as i32),
            ],
        )
    }
}

/// Engine-facing wrapper around the guard.
pub struct GuardedAudioSink {
    guard: Arc<CallbackGuard<JavaAudioSink>>,
}

impl GuardedAudioSink {
    pub fn new(guard: Arc<CallbackGuard<JavaAudioSink>>) -> Self {
        Self { guard }
    }
}

impl AudioSinkObserver for GuardedAudioSink {
    fn on_sample(&self, sample: AudioSample) {
        self.guard.dispatch(|l| with_env("AudioSink.onSample", |env| l.sample(env, &sample)));
    }
}
