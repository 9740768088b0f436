//! Capturer adapter: engine capture control into the Java capturer.
//!
//! Control flows the unusual direction here -- the engine tells the host
//! capturer when to start and stop producing frames -- but the lifetime
//! rules are the same as every other observer, so the same guard applies.

use std::sync::Arc;

use jni::objects::{GlobalRef, JObject, JValue};
use jni::JNIEnv;

use videoroom_bridge_core::engine::{CaptureFormat, CapturerObserver};
use videoroom_bridge_core::CallbackGuard;

use crate::error::Result;
use crate::jni_util::with_env;
use crate::observer::{call_listener, Method};

static START_CAPTURE: Method = Method { name: "startCapture", sig: "(III)V" };
static STOP_CAPTURE: Method = Method { name: "stopCapture", sig: "()V" };

pub(crate) static METHODS: &[&Method] = &[&START_CAPTURE, &STOP_CAPTURE];

/// Global reference and dispatch for one Java video capturer.
pub struct JavaCapturer {
    capturer: GlobalRef,
}

impl JavaCapturer {
    pub fn new(env: &mut JNIEnv, capturer: &JObject) -> Result<Self> {
        Ok(Self { capturer: env.new_global_ref(capturer)? })
    }

    fn start(&self, env: &mut JNIEnv, format: &CaptureFormat) -> Result<()> {
        call_listener(
            env,
            self.capturer.as_obj(),
            &START_CAPTURE,
            &[
                JValue::Int(format.width as i32),
                JValue::Int(format.height as i32),
                JValue::Int(format.framerate as i32),
            ],
        )
    }

    fn stop(&self, env: &mut JNIEnv) -> Result<()> {
        call_listener(env, self.capturer.as_obj(), &STOP_CAPTURE, &[])
    }
}

/// Engine-facing wrapper around the guard.
pub struct GuardedCapturer {
    guard: Arc<CallbackGuard<JavaCapturer>>,
}

impl GuardedCapturer {
    pub fn new(guard: Arc<CallbackGuard<JavaCapturer>>) -> Self {
        Self { guard }
    }
}

impl CapturerObserver for GuardedCapturer {
    fn on_start_capture(&self, format: CaptureFormat) {
        self.guard
            .dispatch(|l| with_env("VideoCapturer.startCapture", |env| l.start(env, &format)));
    }

    fn on_stop_capture(&self) {
        self.guard.dispatch(|l| with_env("VideoCapturer.stopCapture", |env| l.stop(env)));
    }
}
