//! Core of the VideoRoom Android bridge.
//!
//! The engine that does the real work (signaling, ICE, media) is linked
//! externally and drives this layer through the `engine` traits. What
//! lives here is the machinery that makes the host <-> engine boundary
//! safe to cross:
//!
//! - [`guard::CallbackGuard`]: drops engine callbacks that race host-side
//!   teardown instead of letting them touch freed references.
//! - [`refmap::ChildRefMap`]: keeps the one-to-one association between a
//!   native child object and its retained host peer.
//! - [`registry::HandleRegistry`]: typed handles replacing raw pointers
//!   across the FFI boundary.
//! - [`delegate::RoomDelegate`]: the dedicated thread that owns a room and
//!   serializes every operation against it.

#![warn(clippy::all)]

pub mod delegate;
pub mod engine;
pub mod error;
pub mod guard;
pub mod refmap;
pub mod registry;

pub use delegate::RoomDelegate;
pub use error::{Error, Result};
pub use guard::CallbackGuard;
pub use refmap::ChildRefMap;
pub use registry::{Handle, HandleRegistry};
