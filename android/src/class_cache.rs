//! Process-wide cache of the Java classes this layer constructs.
//!
//! Loaded once in `JNI_OnLoad` (the one moment every class is reachable
//! through the application class loader from the current thread) and
//! dropped in `JNI_OnUnload`. Engine threads attached later cannot use
//! `FindClass` for app classes, so everything they construct resolves
//! through this cache.

use std::collections::HashMap;

use jni::objects::GlobalRef;
use jni::JNIEnv;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::jni_util;

pub const REMOTE_PARTICIPANT: &str = "com/videoroom/sdk/RemoteParticipant";
pub const LOCAL_PARTICIPANT: &str = "com/videoroom/sdk/LocalParticipant";
pub const REMOTE_AUDIO_TRACK: &str = "com/videoroom/sdk/RemoteAudioTrack";
pub const REMOTE_VIDEO_TRACK: &str = "com/videoroom/sdk/RemoteVideoTrack";
pub const REMOTE_DATA_TRACK: &str = "com/videoroom/sdk/RemoteDataTrack";
pub const REMOTE_TRACK_PUBLICATION: &str = "com/videoroom/sdk/RemoteTrackPublication";
pub const LOCAL_TRACK_PUBLICATION: &str = "com/videoroom/sdk/LocalTrackPublication";
pub const VIDEO_EXCEPTION: &str = "com/videoroom/sdk/VideoException";

/// Every class constructed from native code. Kept sorted for the load log.
pub const CACHED_CLASSES: &[&str] = &[
    LOCAL_PARTICIPANT,
    LOCAL_TRACK_PUBLICATION,
    REMOTE_AUDIO_TRACK,
    REMOTE_DATA_TRACK,
    REMOTE_PARTICIPANT,
    REMOTE_TRACK_PUBLICATION,
    REMOTE_VIDEO_TRACK,
    VIDEO_EXCEPTION,
];

static CACHE: Mutex<Option<HashMap<&'static str, GlobalRef>>> = Mutex::new(None);

/// Resolve and retain every cached class. Called from `JNI_OnLoad`; a
/// lookup failure fails the load.
pub fn load(env: &mut JNIEnv) -> Result<()> {
    let mut classes = HashMap::with_capacity(CACHED_CLASSES.len());
    for &name in CACHED_CLASSES {
        let class = env
            .find_class(name)
            .map_err(|_| Error::ClassLookup(name.to_string()))?;
        classes.insert(name, env.new_global_ref(&class)?);
        debug!(class = name, "cached");
    }
    info!(count = classes.len(), "class cache loaded");
    *CACHE.lock() = Some(classes);
    Ok(())
}

/// Drop every retained class reference. Called from `JNI_OnUnload`.
pub fn unload() {
    *CACHE.lock() = None;
    info!("class cache unloaded");
}

/// Fetch a cached class by its constant name. Fatal if the cache is not
/// loaded or the name was never cached: both mean a callback ran outside
/// the library's load window.
pub fn get(name: &'static str) -> GlobalRef {
    match CACHE.lock().as_ref().and_then(|classes| classes.get(name)).cloned() {
        Some(class) => class,
        None => jni_util::fatal(&format!("class {name} not in cache")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_class_names_are_well_formed() {
        for name in CACHED_CLASSES {
            assert!(name.starts_with("com/videoroom/sdk/"), "{name}");
            assert!(!name.contains('.'), "{name}");
            assert!(!name.ends_with(';'), "{name}");
        }
    }

    #[test]
    fn cached_class_list_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for name in CACHED_CLASSES {
            assert!(seen.insert(*name), "duplicate cache entry {name}");
        }
    }
}
