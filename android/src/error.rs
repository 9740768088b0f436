//! Error types for the JNI surface.
//!
//! These errors exist to carry context to the fatal-diagnostic path, not
//! to be recovered from: a failed JNI call or class lookup means the
//! call contract with the VM was violated, and the process aborts (see
//! `jni_util::with_env`).

use thiserror::Error;

/// Result type alias for JNI-surface operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A JNI API call failed or left a pending Java exception
    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),

    /// Bridge-core error (options decoding, stats encoding)
    #[error(transparent)]
    Core(#[from] videoroom_bridge_core::Error),

    /// A cached class could not be found at library load
    #[error("class lookup failed: {0}")]
    ClassLookup(String),
}
