//! Error types for the bridge core.

use thiserror::Error;

/// Result type alias for bridge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bridge-core
///
/// Only *recoverable* conditions live here. Contract violations (double
/// release, removal events for unknown children, dropping an unreleased
/// delegate) are programmer errors and panic instead; see the module docs
/// of `refmap` and `delegate`.
#[derive(Debug, Error)]
pub enum Error {
    /// A handle crossing the FFI boundary was zero or negative
    #[error("Invalid handle value: {0}")]
    InvalidHandle(i64),

    /// JSON error while decoding options or encoding a stats report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
