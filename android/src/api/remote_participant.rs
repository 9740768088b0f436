//! Native methods of `com.videoroom.sdk.RemoteParticipant`.

use jni::objects::JClass;
use jni::sys::{jlong, jstring};
use jni::JNIEnv;

use crate::context;
use crate::jni_util::{new_java_string, ok_or_fatal};

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteParticipant_nativeGetIdentity(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let identity = context::remote_participants().resolve(handle).control.info().identity;
    ok_or_fatal(new_java_string(&mut env, &identity), "RemoteParticipant.nativeGetIdentity")
        .into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteParticipant_nativeGetSid(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let sid = context::remote_participants().resolve(handle).control.info().sid;
    ok_or_fatal(new_java_string(&mut env, &sid), "RemoteParticipant.nativeGetSid").into_raw()
}

/// Release path: detach the engine observer, then delete (and drain) the
/// guard. Dropping the guard's listener sweeps the participant's child
/// maps, releasing every retained track and publication peer.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_RemoteParticipant_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let ctx = context::remote_participants().detach(handle);
    ctx.control.clear_observer();
    if let Some(guard) = ctx.observer.get() {
        guard.set_deleted();
    }
}
