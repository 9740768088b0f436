//! Native methods of `com.videoroom.sdk.LocalParticipant`.

use std::sync::Arc;

use jni::objects::JClass;
use jni::sys::{jlong, jstring};
use jni::JNIEnv;

use videoroom_bridge_core::engine::TrackKind;

use crate::context;
use crate::jni_util::{new_java_string, ok_or_fatal};

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativeGetIdentity(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let identity = context::local_participants().resolve(handle).control.info().identity;
    ok_or_fatal(new_java_string(&mut env, &identity), "LocalParticipant.nativeGetIdentity")
        .into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativeGetSid(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let sid = context::local_participants().resolve(handle).control.info().sid;
    ok_or_fatal(new_java_string(&mut env, &sid), "LocalParticipant.nativeGetSid").into_raw()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativePublishAudioTrack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    track_handle: jlong,
) {
    let participant = context::local_participants().resolve(handle);
    let track = context::audio_tracks().resolve(track_handle);
    participant.control.publish_audio_track(Arc::clone(&track.track));
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativePublishVideoTrack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    track_handle: jlong,
) {
    let participant = context::local_participants().resolve(handle);
    let track = context::video_tracks().resolve(track_handle);
    participant.control.publish_video_track(Arc::clone(&track.track));
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativePublishDataTrack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    track_handle: jlong,
) {
    let participant = context::local_participants().resolve(handle);
    let track = context::local_data_tracks().resolve(track_handle);
    participant.control.publish_data_track(Arc::clone(&track.track));
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativeUnpublishAudioTrack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    track_handle: jlong,
) {
    let participant = context::local_participants().resolve(handle);
    let track = context::audio_tracks().resolve(track_handle);
    participant.control.unpublish_track(&track.track.name(), TrackKind::Audio);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativeUnpublishVideoTrack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    track_handle: jlong,
) {
    let participant = context::local_participants().resolve(handle);
    let track = context::video_tracks().resolve(track_handle);
    participant.control.unpublish_track(&track.track.name(), TrackKind::Video);
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativeUnpublishDataTrack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    track_handle: jlong,
) {
    let participant = context::local_participants().resolve(handle);
    let track = context::local_data_tracks().resolve(track_handle);
    participant.control.unpublish_track(&track.track.name(), TrackKind::Data);
}

/// Release path: detach the engine observer, then delete (and drain) the
/// guard before its Java references go away.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_LocalParticipant_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let ctx = context::local_participants().detach(handle);
    ctx.control.clear_observer();
    if let Some(guard) = ctx.observer.get() {
        guard.set_deleted();
    }
}
