//! Native methods of the local track classes (`LocalAudioTrack`,
//! `LocalVideoTrack`, `LocalDataTrack`) and their audio sinks.

use std::sync::Arc;

use jni::objects::{JByteArray, JClass, JObject, JString};
use jni::sys::{jboolean, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;

use videoroom_bridge_core::CallbackGuard;

use crate::context::{self, AudioSinkContext};
use crate::jni_util::{new_java_string, ok_or_fatal, to_rust_string};
use crate::observer::audio_sink::{GuardedAudioSink, JavaAudioSink};

fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

// --- LocalAudioTrack -------------------------------------------------------

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalAudioTrack_nativeSetEnabled(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    enabled: jboolean,
) {
    context::audio_tracks().resolve(handle).track.set_enabled(enabled != 0);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalAudioTrack_nativeIsEnabled(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    to_jboolean(context::audio_tracks().resolve(handle).track.is_enabled())
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalAudioTrack_nativeGetName(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let name = context::audio_tracks().resolve(handle).track.name();
    ok_or_fatal(new_java_string(&mut env, &name), "LocalAudioTrack.nativeGetName").into_raw()
}

/// Attach a Java sink to the track; PCM buffers flow to it from the
/// engine's audio thread until the sink is removed.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalAudioTrack_nativeAddSink(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jsink: JObject,
) -> jlong {
    let ctx = context::audio_tracks().resolve(handle);
    let sink = ok_or_fatal(
        JavaAudioSink::new(&mut env, &jsink),
        "LocalAudioTrack.nativeAddSink: sink reference",
    );
    let guard = CallbackGuard::new("audio_sink", sink);
    let sink_id = ctx.track.add_sink(Arc::new(GuardedAudioSink::new(Arc::clone(&guard))));
    context::audio_sinks()
        .insert(Arc::new(AudioSinkContext { track: Arc::clone(&ctx.track), sink_id, guard }))
        .to_jni()
}

/// Detach a sink: first from the engine (no new deliveries), then the
/// guard drains whatever is already in flight before the sink's
/// references are dropped.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalAudioTrack_nativeRemoveSink(
    _env: JNIEnv,
    _class: JClass,
    sink_handle: jlong,
) {
    let ctx = context::audio_sinks().detach(sink_handle);
    ctx.track.remove_sink(ctx.sink_id);
    ctx.guard.set_deleted();
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalAudioTrack_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    drop(context::audio_tracks().detach(handle));
}

// --- LocalVideoTrack -------------------------------------------------------

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalVideoTrack_nativeSetEnabled(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    enabled: jboolean,
) {
    context::video_tracks().resolve(handle).track.set_enabled(enabled != 0);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalVideoTrack_nativeIsEnabled(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    to_jboolean(context::video_tracks().resolve(handle).track.is_enabled())
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalVideoTrack_nativeGetName(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let name = context::video_tracks().resolve(handle).track.name();
    ok_or_fatal(new_java_string(&mut env, &name), "LocalVideoTrack.nativeGetName").into_raw()
}

/// Release the track. The engine stops the capturer first, so the Java
/// capturer sees `stopCapture` before its guard is deleted.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalVideoTrack_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let ctx = context::video_tracks().detach(handle);
    ctx.track.stop();
    ctx.capturer_guard.set_deleted();
}

// --- LocalDataTrack --------------------------------------------------------

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalDataTrack_nativeSendString(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jmessage: JString,
) {
    let ctx = context::local_data_tracks().resolve(handle);
    let message =
        ok_or_fatal(to_rust_string(&mut env, &jmessage), "LocalDataTrack.nativeSendString");
    ctx.track.send_string(&message);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalDataTrack_nativeSendBytes(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jmessage: JByteArray,
) {
    let ctx = context::local_data_tracks().resolve(handle);
    let message = match env.convert_byte_array(&jmessage) {
        Ok(message) => message,
        Err(e) => crate::jni_util::fatal(&format!("LocalDataTrack.nativeSendBytes: {e}")),
    };
    ctx.track.send_bytes(&message);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalDataTrack_nativeGetName(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let name = context::local_data_tracks().resolve(handle).track.name();
    ok_or_fatal(new_java_string(&mut env, &name), "LocalDataTrack.nativeGetName").into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalDataTrack_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    drop(context::local_data_tracks().detach(handle));
}
