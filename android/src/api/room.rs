//! Native methods of `com.videoroom.sdk.Room`.

use std::sync::Arc;

use jni::objects::{JClass, JObject, JString};
use jni::sys::{jboolean, jint, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use tracing::debug;

use videoroom_bridge_core::engine::{ConnectOptions, NetworkChangeEvent};
use videoroom_bridge_core::{CallbackGuard, RoomDelegate};

use crate::context::{self, RoomContext};
use crate::jni_util::{self, new_java_string, ok_or_fatal, to_rust_string};
use crate::observer::room::{GuardedRoomObserver, JavaRoomListener};
use crate::observer::stats::{GuardedStatsObserver, JavaStatsQueue};

/// Start a connection attempt and hand the room context to Java.
///
/// The connect command is the first message on the room thread; the
/// outcome arrives through the listener passed here.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeConnect(
    mut env: JNIEnv,
    _class: JClass,
    jroom: JObject,
    jlistener: JObject,
    factory_handle: jlong,
    joptions: JString,
) -> jlong {
    let factory = context::media_factories().resolve(factory_handle);

    let options_json =
        ok_or_fatal(to_rust_string(&mut env, &joptions), "Room.nativeConnect: options string");
    let options = match ConnectOptions::from_json(&options_json) {
        Ok(options) => options,
        // The document is built by the SDK's own Java layer; a parse
        // failure is an SDK bug, not app input.
        Err(e) => jni_util::fatal(&format!("Room.nativeConnect: malformed options: {e}")),
    };
    debug!(room = %options.room_name, "connect requested");

    let listener = ok_or_fatal(
        JavaRoomListener::new(&mut env, &jroom, &jlistener),
        "Room.nativeConnect: listener references",
    );
    let room_guard = CallbackGuard::new("room", listener);
    let stats_guard = CallbackGuard::new("stats", JavaStatsQueue::new());

    let delegate = RoomDelegate::new(
        Arc::clone(&factory.engine),
        options,
        Arc::new(GuardedRoomObserver::new(Arc::clone(&room_guard))),
        Arc::new(GuardedStatsObserver::new(Arc::clone(&stats_guard))),
    );
    delegate.connect();

    context::rooms()
        .insert(Arc::new(RoomContext { delegate, room_guard, stats_guard }))
        .to_jni()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeDisconnect(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    context::rooms().resolve(handle).delegate.disconnect();
}

/// Queue a stats listener and post the request. If the room is already
/// releasing, both the enqueue and the request are dropped.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeGetStats(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jlistener: JObject,
) {
    let ctx = context::rooms().resolve(handle);
    let listener =
        ok_or_fatal(jni_util::global_ref(&env, &jlistener), "Room.nativeGetStats: listener");
    ctx.stats_guard.dispatch(move |queue| queue.enqueue(listener));
    ctx.delegate.get_stats();
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeOnNetworkChange(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    event: jint,
) {
    let event = match event {
        0 => NetworkChangeEvent::ConnectionChanged,
        1 => NetworkChangeEvent::ConnectionLost,
        other => jni_util::fatal(&format!("Room.nativeOnNetworkChange: unknown event {other}")),
    };
    context::rooms().resolve(handle).delegate.network_change(event);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeIsRecording(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    if context::rooms().resolve(handle).delegate.is_recording() {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeGetSid(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let ctx = context::rooms().resolve(handle);
    let sid = ctx.delegate.room().map(|room| room.sid()).unwrap_or_default();
    ok_or_fatal(new_java_string(&mut env, &sid), "Room.nativeGetSid").into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeGetState(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let state = context::rooms().resolve(handle).delegate.state();
    ok_or_fatal(new_java_string(&mut env, state.as_str()), "Room.nativeGetState").into_raw()
}

/// Tear the room down. Observers are deleted (and drained) before any of
/// their references go away, then the release command runs on the room
/// thread and this call blocks until it has.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_Room_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let ctx = context::rooms().detach(handle);
    ctx.room_guard.set_deleted();
    ctx.stats_guard.set_deleted();
    ctx.delegate.release();
    ctx.delegate.wait_released();
    debug!(handle, "room released");
}
