//! Native methods of `com.videoroom.sdk.RemoteDataTrack`.

use std::sync::Arc;

use jni::objects::{JClass, JObject};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;

use videoroom_bridge_core::CallbackGuard;

use crate::context;
use crate::jni_util::{new_java_string, ok_or_fatal};
use crate::observer::data_track::{GuardedDataTrackObserver, JavaDataTrackListener};

/// Attach (or replace) the message listener. A replaced listener is
/// deleted and drained before the new one takes over.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteDataTrack_nativeSetListener(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jtrack: JObject,
    jlistener: JObject,
) {
    let ctx = context::remote_data_tracks().resolve(handle);
    let listener = ok_or_fatal(
        JavaDataTrackListener::new(&mut env, &jtrack, &jlistener),
        "RemoteDataTrack.nativeSetListener: listener references",
    );
    let guard = CallbackGuard::new("data_track", listener);
    if let Some(previous) = ctx.observer.lock().replace(Arc::clone(&guard)) {
        previous.set_deleted();
    }
    ctx.control.set_observer(Arc::new(GuardedDataTrackObserver::new(guard)));
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteDataTrack_nativeGetName(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let name = context::remote_data_tracks().resolve(handle).control.info().name;
    ok_or_fatal(new_java_string(&mut env, &name), "RemoteDataTrack.nativeGetName").into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteDataTrack_nativeGetSid(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let sid = context::remote_data_tracks().resolve(handle).control.info().sid;
    ok_or_fatal(new_java_string(&mut env, &sid), "RemoteDataTrack.nativeGetSid").into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteDataTrack_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let ctx = context::remote_data_tracks().detach(handle);
    ctx.control.clear_observer();
    let observer = ctx.observer.lock().take();
    if let Some(guard) = observer {
        guard.set_deleted();
    }
}
