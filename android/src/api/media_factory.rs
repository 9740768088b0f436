//! Native methods of `com.videoroom.sdk.MediaFactory`.

use std::sync::Arc;

use jni::objects::{JClass, JObject, JString};
use jni::sys::{jboolean, jint, jlong};
use jni::JNIEnv;
use tracing::debug;

use videoroom_bridge_core::engine::sim::SimEngine;
use videoroom_bridge_core::engine::{CaptureFormat, VideoEngine};
use videoroom_bridge_core::CallbackGuard;

use crate::context::{
    self, AudioTrackContext, LocalDataTrackContext, MediaFactoryContext, VideoTrackContext,
};
use crate::jni_util::{ok_or_fatal, to_rust_string};
use crate::observer::capturer::{GuardedCapturer, JavaCapturer};

/// Construct the engine behind a factory. Deployments linking the vendor
/// engine swap this constructor; everything else in the layer is
/// indifferent to which engine is behind the traits.
fn create_engine() -> Arc<dyn VideoEngine> {
    SimEngine::new()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_MediaFactory_nativeCreate(
    _env: JNIEnv,
    _class: JClass,
) -> jlong {
    let handle =
        context::media_factories().insert(Arc::new(MediaFactoryContext { engine: create_engine() }));
    debug!(?handle, "media factory created");
    handle.to_jni()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_MediaFactory_nativeCreateAudioTrack(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jname: JString,
    enabled: jboolean,
) -> jlong {
    let factory = context::media_factories().resolve(handle);
    let name = ok_or_fatal(
        to_rust_string(&mut env, &jname),
        "MediaFactory.nativeCreateAudioTrack: name",
    );
    let track = factory.engine.create_audio_track(&name, enabled != 0);
    context::audio_tracks().insert(Arc::new(AudioTrackContext { track })).to_jni()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_MediaFactory_nativeCreateVideoTrack(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jname: JString,
    enabled: jboolean,
    jcapturer: JObject,
    width: jint,
    height: jint,
    framerate: jint,
) -> jlong {
    let factory = context::media_factories().resolve(handle);
    let name = ok_or_fatal(
        to_rust_string(&mut env, &jname),
        "MediaFactory.nativeCreateVideoTrack: name",
    );
    let capturer = ok_or_fatal(
        JavaCapturer::new(&mut env, &jcapturer),
        "MediaFactory.nativeCreateVideoTrack: capturer",
    );
    let capturer_guard = CallbackGuard::new("capturer", capturer);
    let format = CaptureFormat {
        width: width as u32,
        height: height as u32,
        framerate: framerate as u32,
    };
    let track = factory.engine.create_video_track(
        &name,
        enabled != 0,
        Arc::new(GuardedCapturer::new(Arc::clone(&capturer_guard))),
        format,
    );
    context::video_tracks().insert(Arc::new(VideoTrackContext { track, capturer_guard })).to_jni()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_MediaFactory_nativeCreateDataTrack(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    jname: JString,
    ordered: jboolean,
) -> jlong {
    let factory = context::media_factories().resolve(handle);
    let name = ok_or_fatal(
        to_rust_string(&mut env, &jname),
        "MediaFactory.nativeCreateDataTrack: name",
    );
    let track = factory.engine.create_data_track(&name, ordered != 0);
    context::local_data_tracks().insert(Arc::new(LocalDataTrackContext { track })).to_jni()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn Java_com_videoroom_sdk_MediaFactory_nativeRelease(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    drop(context::media_factories().detach(handle));
    debug!(handle, "media factory released");
}
