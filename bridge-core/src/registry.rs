//! Typed handle registry for contexts crossing the FFI boundary.
//!
//! The Java peer holds an opaque `long`; this registry is what it indexes.
//! Keys are monotonically increasing and never reused within a process
//! lifetime, so a stale handle from a released peer resolves to a miss
//! (reported as the contract violation it is) instead of a wild pointer.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Error, Result};

/// Opaque typed key for one registry entry.
///
/// Encodes to a positive `jlong`; the phantom type keeps a Room handle from
/// being spent on a Track registry at compile time.
pub struct Handle<T> {
    raw: u64,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(raw: u64) -> Self {
        Self { raw, _kind: PhantomData }
    }

    /// The `jlong` representation handed to Java.
    pub fn to_jni(self) -> i64 {
        self.raw as i64
    }

    /// Decode a handle received from Java.
    pub fn from_jni(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(Error::InvalidHandle(value));
        }
        Ok(Self::new(value as u64))
    }

    pub fn raw(self) -> u64 {
        self.raw
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl<T> Eq for Handle<T> {}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.raw)
    }
}

/// Concurrent map from handles to live contexts of one entity kind.
pub struct HandleRegistry<T> {
    label: &'static str,
    entries: DashMap<u64, Arc<T>>,
    next: AtomicU64,
}

impl<T> HandleRegistry<T> {
    pub fn new(label: &'static str) -> Self {
        Self { label, entries: DashMap::new(), next: AtomicU64::new(1) }
    }

    pub fn insert(&self, value: Arc<T>) -> Handle<T> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(raw, value);
        Handle::new(raw)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<Arc<T>> {
        self.entries.get(&handle.raw).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, handle: Handle<T>) -> Option<Arc<T>> {
        self.entries.remove(&handle.raw).map(|(_, value)| value)
    }

    /// Resolve a raw `jlong` from Java, treating a miss as fatal.
    ///
    /// A miss means Java used a handle it never owned or already released;
    /// recovering silently would mask the memory-safety bug this registry
    /// exists to catch.
    pub fn resolve(&self, raw: i64) -> Arc<T> {
        let handle = match Handle::from_jni(raw) {
            Ok(handle) => handle,
            Err(_) => panic!("{}: invalid handle {} from host", self.label, raw),
        };
        match self.get(handle) {
            Some(value) => value,
            None => panic!("{}: stale or foreign handle {} from host", self.label, raw),
        }
    }

    /// Remove a raw `jlong` from Java on the release path, fatal on a miss
    /// (double release).
    pub fn detach(&self, raw: i64) -> Arc<T> {
        let handle = match Handle::from_jni(raw) {
            Ok(handle) => handle,
            Err(_) => panic!("{}: invalid handle {} from host", self.label, raw),
        };
        match self.remove(handle) {
            Some(value) => value,
            None => panic!("{}: double release of handle {} from host", self.label, raw),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trips_through_jni_representation() {
        let registry: HandleRegistry<String> = HandleRegistry::new("test");
        let handle = registry.insert(Arc::new("ctx".to_string()));

        let raw = handle.to_jni();
        assert!(raw > 0);
        let back = Handle::<String>::from_jni(raw).unwrap();
        assert_eq!(back, handle);
        assert_eq!(*registry.get(back).unwrap(), "ctx");
    }

    #[test]
    fn keys_are_never_reused() {
        let registry: HandleRegistry<u32> = HandleRegistry::new("test");
        let first = registry.insert(Arc::new(1));
        registry.remove(first);
        let second = registry.insert(Arc::new(2));
        assert_ne!(first, second);
    }

    #[test]
    fn zero_and_negative_handles_are_rejected() {
        assert!(Handle::<u32>::from_jni(0).is_err());
        assert!(Handle::<u32>::from_jni(-7).is_err());
    }

    #[test]
    #[should_panic(expected = "stale or foreign handle")]
    fn resolving_a_released_handle_is_fatal() {
        let registry: HandleRegistry<u32> = HandleRegistry::new("test");
        let handle = registry.insert(Arc::new(1));
        registry.remove(handle);
        registry.resolve(handle.to_jni());
    }

    #[test]
    #[should_panic(expected = "double release")]
    fn double_detach_is_fatal() {
        let registry: HandleRegistry<u32> = HandleRegistry::new("test");
        let handle = registry.insert(Arc::new(1));
        registry.detach(handle.to_jni());
        registry.detach(handle.to_jni());
    }
}
