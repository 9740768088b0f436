//! Observer adapters: engine callbacks in, Java listener invocations out.
//!
//! Each adapter pairs a `Java*` listener struct (global references plus
//! the dispatch code that builds Java arguments and invokes the listener
//! method) with a `Guarded*` wrapper implementing the corresponding
//! engine observer trait through a [`CallbackGuard`]. The guard is the
//! only path from an engine thread into Java.
//!
//! [`CallbackGuard`]: videoroom_bridge_core::CallbackGuard

pub mod audio_sink;
pub mod capturer;
pub mod data_track;
pub mod local_participant;
pub mod participant;
pub mod peers;
pub mod room;
pub mod stats;

use jni::objects::{JObject, JValue};
use jni::JNIEnv;

use crate::error::Result;
use crate::jni_util;

/// A Java listener method: name plus JNI signature.
pub(crate) struct Method {
    pub name: &'static str,
    pub sig: &'static str,
}

/// Invoke a void listener method, treating a pending exception as fatal.
pub(crate) fn call_listener(
    env: &mut JNIEnv,
    target: &JObject,
    method: &Method,
    args: &[JValue],
) -> Result<()> {
    env.call_method(target, method.name, method.sig, args)?;
    jni_util::check_exception(env, method.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_methods() -> Vec<&'static Method> {
        let mut methods: Vec<&'static Method> = Vec::new();
        methods.extend_from_slice(room::METHODS);
        methods.extend_from_slice(participant::METHODS);
        methods.extend_from_slice(local_participant::METHODS);
        methods.extend_from_slice(data_track::METHODS);
        methods.extend_from_slice(stats::METHODS);
        methods.extend_from_slice(audio_sink::METHODS);
        methods.extend_from_slice(capturer::METHODS);
        methods
    }

    #[test]
    fn listener_signatures_are_well_formed() {
        for method in all_methods() {
            let sig = method.sig;
            assert!(sig.starts_with('('), "{}: {sig}", method.name);
            let close = sig.find(')').unwrap_or_else(|| panic!("{}: {sig}", method.name));
            // All listener callbacks return void.
            assert_eq!(&sig[close + 1..], "V", "{}: {sig}", method.name);

            // Every object token inside the argument list must be
            // L<binary name>; and use slash-separated names.
            let args = &sig[1..close];
            let mut rest = args;
            while let Some(start) = rest.find('L') {
                let tail = &rest[start..];
                let end = tail.find(';').unwrap_or_else(|| panic!("{}: {sig}", method.name));
                assert!(!tail[..end].contains('.'), "{}: {sig}", method.name);
                rest = &tail[end + 1..];
            }
        }
    }

    #[test]
    fn listener_method_names_are_unique_per_table() {
        for table in [
            room::METHODS,
            participant::METHODS,
            local_participant::METHODS,
            data_track::METHODS,
            stats::METHODS,
            audio_sink::METHODS,
            capturer::METHODS,
        ] {
            let mut seen = std::collections::HashSet::new();
            for method in table {
                assert!(
                    seen.insert((method.name, method.sig)),
                    "duplicate method {}",
                    method.name
                );
            }
        }
    }
}
