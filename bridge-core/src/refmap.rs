//! Retained-reference map between native child objects and their host peers.
//!
//! When the engine announces a child (a published track, a subscribed
//! track), the bridge constructs the host peer object once and retains it
//! here, keyed by the child's native identifier. Later events naming the
//! same child resolve to the already-constructed peer instead of creating a
//! duplicate. Removal events deliver the callback *with* the retained
//! reference and only then let it go; teardown sweeps whatever the engine
//! never removed.
//!
//! Event-ordering breaches (a removal for a child that was never added, an
//! add for a child already present) are contract violations between the
//! engine and this layer and panic with the offending key.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::debug;

/// Map from a native child key to the retained host peer reference.
///
/// `R` is a JNI `GlobalRef` in production; tests substitute a counting
/// mock. Dropping an `R` is what releases the underlying reference, so the
/// map guarantees every retained entry is dropped exactly once: either by
/// [`take`](Self::take) on the matching removal event or by
/// [`drain`](Self::drain) at teardown.
pub struct ChildRefMap<K, R> {
    label: &'static str,
    entries: Mutex<HashMap<K, R>>,
}

impl<K: Eq + Hash + Debug, R> ChildRefMap<K, R> {
    pub fn new(label: &'static str) -> Self {
        Self { label, entries: Mutex::new(HashMap::new()) }
    }

    /// Retain the peer for a newly-announced child.
    ///
    /// Panics if the key is already present: the engine announced the same
    /// child twice without a removal in between.
    pub fn insert(&self, key: K, peer: R) {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            panic!("{}: duplicate child entry for key {:?}", self.label, key);
        }
        entries.insert(key, peer);
    }

    /// Remove and return the peer for a child the engine is removing.
    ///
    /// The caller must deliver the removal callback using the returned
    /// reference before dropping it. Panics if the key is unknown: a
    /// removal event arrived for a child that was never added.
    pub fn take(&self, key: &K) -> R {
        match self.entries.lock().remove(key) {
            Some(peer) => peer,
            None => panic!("{}: removal event for unknown child {:?}", self.label, key),
        }
    }

    /// Clone the retained peer for an event that does not consume it.
    pub fn peek(&self, key: &K) -> Option<R>
    where
        R: Clone,
    {
        self.entries.lock().get(key).cloned()
    }

    /// Sweep every remaining entry at teardown.
    ///
    /// Covers the forced-teardown path where child-removed events never
    /// fire. Returns the references so the caller controls when each is
    /// dropped (and with it, released).
    pub fn drain(&self) -> Vec<R> {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            debug!(map = self.label, remaining = entries.len(), "sweeping children at teardown");
        }
        entries.drain().map(|(_, peer)| peer).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Stand-in for a global reference: counts how many times the
    /// underlying "reference" has been released.
    #[derive(Clone)]
    struct MockRef {
        releases: Arc<AtomicUsize>,
    }

    impl MockRef {
        fn new(releases: &Arc<AtomicUsize>) -> Self {
            Self { releases: Arc::clone(releases) }
        }
    }

    impl Drop for MockRef {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn insert_then_take_releases_exactly_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let map: ChildRefMap<&str, MockRef> = ChildRefMap::new("tracks");

        map.insert("MT1", MockRef::new(&releases));
        assert_eq!(map.len(), 1);

        let peer = map.take(&"MT1");
        // The callback would run here, with the reference still alive.
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        drop(peer);

        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn teardown_sweeps_all_unremoved_children() {
        let releases = Arc::new(AtomicUsize::new(0));
        let map: ChildRefMap<String, MockRef> = ChildRefMap::new("tracks");

        for i in 0..5 {
            map.insert(format!("MT{i}"), MockRef::new(&releases));
        }
        drop(map.drain());

        assert_eq!(releases.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn peek_does_not_consume() {
        let releases = Arc::new(AtomicUsize::new(0));
        let map: ChildRefMap<&str, MockRef> = ChildRefMap::new("publications");
        map.insert("MT1", MockRef::new(&releases));

        assert!(map.peek(&"MT1").is_some());
        assert!(map.contains(&"MT1"));
        assert!(map.peek(&"MT2").is_none());
    }

    #[test]
    #[should_panic(expected = "removal event for unknown child")]
    fn removal_miss_is_fatal() {
        let map: ChildRefMap<&str, ()> = ChildRefMap::new("tracks");
        map.take(&"MT1");
    }

    #[test]
    #[should_panic(expected = "duplicate child entry")]
    fn double_insert_is_fatal() {
        let map: ChildRefMap<&str, ()> = ChildRefMap::new("tracks");
        map.insert("MT1", ());
        map.insert("MT1", ());
    }
}
