//! Construction of Java peer objects from cached classes.

use jni::objects::{JClass, JObject, JValue};
use jni::JNIEnv;

use videoroom_bridge_core::engine::{EngineError, ParticipantInfo, TrackKind, TrackPublicationInfo};

use crate::class_cache;
use crate::error::Result;

/// Kind ordinal as declared by the Java `TrackKind` enum.
pub(crate) fn kind_ordinal(kind: TrackKind) -> i32 {
    match kind {
        TrackKind::Audio => 0,
        TrackKind::Video => 1,
        TrackKind::Data => 2,
    }
}

/// Instantiate a cached class. Engine threads cannot `FindClass`, so the
/// class always comes from the load-time cache.
fn construct<'local>(
    env: &mut JNIEnv<'local>,
    class_name: &'static str,
    ctor_sig: &str,
    args: &[JValue],
) -> Result<JObject<'local>> {
    let cached = class_cache::get(class_name);
    let class = JClass::from(env.new_local_ref(cached.as_obj())?);
    Ok(env.new_object(class, ctor_sig, args)?)
}

pub(crate) fn video_exception<'local>(
    env: &mut JNIEnv<'local>,
    error: &EngineError,
) -> Result<JObject<'local>> {
    let message = env.new_string(&error.message)?;
    construct(
        env,
        class_cache::VIDEO_EXCEPTION,
        "(ILjava/lang/String;)V",
        &[JValue::Int(error.code), JValue::Object(&message)],
    )
}

pub(crate) fn remote_participant<'local>(
    env: &mut JNIEnv<'local>,
    handle: i64,
    info: &ParticipantInfo,
) -> Result<JObject<'local>> {
    let identity = env.new_string(&info.identity)?;
    let sid = env.new_string(&info.sid)?;
    construct(
        env,
        class_cache::REMOTE_PARTICIPANT,
        "(JLjava/lang/String;Ljava/lang/String;)V",
        &[JValue::Long(handle), JValue::Object(&identity), JValue::Object(&sid)],
    )
}

pub(crate) fn local_participant<'local>(
    env: &mut JNIEnv<'local>,
    handle: i64,
    info: &ParticipantInfo,
) -> Result<JObject<'local>> {
    let identity = env.new_string(&info.identity)?;
    let sid = env.new_string(&info.sid)?;
    construct(
        env,
        class_cache::LOCAL_PARTICIPANT,
        "(JLjava/lang/String;Ljava/lang/String;)V",
        &[JValue::Long(handle), JValue::Object(&identity), JValue::Object(&sid)],
    )
}

/// Remote audio/video track peer. Data tracks go through
/// [`remote_data_track`] because they carry a native handle.
pub(crate) fn remote_media_track<'local>(
    env: &mut JNIEnv<'local>,
    info: &TrackPublicationInfo,
) -> Result<JObject<'local>> {
    let class_name = match info.kind {
        TrackKind::Audio => class_cache::REMOTE_AUDIO_TRACK,
        TrackKind::Video => class_cache::REMOTE_VIDEO_TRACK,
        TrackKind::Data => unreachable!("data tracks carry a handle"),
    };
    let sid = env.new_string(&info.sid)?;
    let name = env.new_string(&info.name)?;
    construct(
        env,
        class_name,
        "(Ljava/lang/String;Ljava/lang/String;Z)V",
        &[
            JValue::Object(&sid),
            JValue::Object(&name),
            JValue::Bool(info.enabled as u8),
        ],
    )
}

pub(crate) fn remote_data_track<'local>(
    env: &mut JNIEnv<'local>,
    handle: i64,
    info: &TrackPublicationInfo,
) -> Result<JObject<'local>> {
    let sid = env.new_string(&info.sid)?;
    let name = env.new_string(&info.name)?;
    construct(
        env,
        class_cache::REMOTE_DATA_TRACK,
        "(JLjava/lang/String;Ljava/lang/String;)V",
        &[JValue::Long(handle), JValue::Object(&sid), JValue::Object(&name)],
    )
}

pub(crate) fn remote_track_publication<'local>(
    env: &mut JNIEnv<'local>,
    info: &TrackPublicationInfo,
) -> Result<JObject<'local>> {
    track_publication(env, class_cache::REMOTE_TRACK_PUBLICATION, info)
}

pub(crate) fn local_track_publication<'local>(
    env: &mut JNIEnv<'local>,
    info: &TrackPublicationInfo,
) -> Result<JObject<'local>> {
    track_publication(env, class_cache::LOCAL_TRACK_PUBLICATION, info)
}

fn track_publication<'local>(
    env: &mut JNIEnv<'local>,
    class_name: &'static str,
    info: &TrackPublicationInfo,
) -> Result<JObject<'local>> {
    let sid = env.new_string(&info.sid)?;
    let name = env.new_string(&info.name)?;
    construct(
        env,
        class_name,
        "(Ljava/lang/String;Ljava/lang/String;IZ)V",
        &[
            JValue::Object(&sid),
            JValue::Object(&name),
            JValue::Int(kind_ordinal(info.kind)),
            JValue::Bool(info.enabled as u8),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ordinals_match_the_java_enum_order() {
        assert_eq!(kind_ordinal(TrackKind::Audio), 0);
        assert_eq!(kind_ordinal(TrackKind::Video), 1);
        assert_eq!(kind_ordinal(TrackKind::Data), 2);
    }
}
