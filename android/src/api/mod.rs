//! JNI entry points, one module per `com.videoroom.sdk` class with
//! native methods.
//!
//! Every entry point resolves its context through the typed registries in
//! [`crate::context`]; stale or foreign handles are fatal there. Failures
//! of the JNI calls themselves are fatal too -- the only errors that flow
//! back to Java are engine outcomes, and those travel through the
//! observer callbacks, not through these return values.

pub mod data_track;
pub mod local_participant;
pub mod local_track;
pub mod media_factory;
pub mod remote_participant;
pub mod room;
