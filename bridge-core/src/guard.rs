//! Observer lifetime guard.
//!
//! The native engine owns its own threads and keeps firing observer
//! callbacks until it is told to stop -- including after the host side has
//! started tearing the peer object down. `CallbackGuard` wraps the host
//! listener so that a callback racing the teardown is dropped instead of
//! touching freed references.
//!
//! The guard is a one-way state machine:
//!
//! ```text
//! Live --set_deleted()--> Draining --(in-flight drains)--> Deleted
//! ```
//!
//! `set_deleted()` does not return until every callback that entered before
//! the transition has finished, so once it returns the listener has been
//! dropped and no dispatch closure is running or will run again.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GuardState {
    Live,
    Draining,
    Deleted,
}

struct Inner<L> {
    state: GuardState,
    in_flight: usize,
    listener: Option<Arc<L>>,
}

/// Deletion-safe wrapper around a host listener.
///
/// One instance is shared between the engine-facing observer adapter
/// (which calls [`dispatch`](Self::dispatch) from engine threads) and the
/// owning context's release path (which calls
/// [`set_deleted`](Self::set_deleted) exactly once, before any of the
/// listener's retained references are needed again).
pub struct CallbackGuard<L> {
    label: &'static str,
    inner: Mutex<Inner<L>>,
    cond: Condvar,
}

impl<L> CallbackGuard<L> {
    pub fn new(label: &'static str, listener: L) -> Arc<Self> {
        Arc::new(Self {
            label,
            inner: Mutex::new(Inner {
                state: GuardState::Live,
                in_flight: 0,
                listener: Some(Arc::new(listener)),
            }),
            cond: Condvar::new(),
        })
    }

    /// Run `f` against the listener if the guard is still live.
    ///
    /// Returns `None` without invoking `f` when the guard is draining or
    /// deleted. The closure runs outside the state lock, so callbacks from
    /// different engine threads may overlap; only deletion is serialized
    /// against them.
    pub fn dispatch<R>(&self, f: impl FnOnce(&L) -> R) -> Option<R> {
        let listener = {
            let mut inner = self.inner.lock();
            if inner.state != GuardState::Live {
                debug!(observer = self.label, "dropping callback after deletion");
                return None;
            }
            inner.in_flight += 1;
            Arc::clone(inner.listener.as_ref().expect("live guard holds a listener"))
        };

        let result = f(&listener);

        // The clone must go before the counter: once in_flight hits zero the
        // drain path drops the only remaining Arc and expects the listener
        // to be freed there.
        drop(listener);
        let mut inner = self.inner.lock();
        inner.in_flight -= 1;
        if inner.in_flight == 0 {
            self.cond.notify_all();
        }
        Some(result)
    }

    /// Mark the observer deleted and drain in-flight callbacks.
    ///
    /// Blocks until every dispatch that entered before the call has
    /// returned, then drops the listener. Idempotent: later calls (and
    /// concurrent callers) return once the first deletion has completed.
    pub fn set_deleted(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            GuardState::Deleted => return,
            GuardState::Draining => {
                while inner.state != GuardState::Deleted {
                    self.cond.wait(&mut inner);
                }
                return;
            }
            GuardState::Live => {}
        }

        inner.state = GuardState::Draining;
        debug!(observer = self.label, "observer deleted");
        while inner.in_flight > 0 {
            self.cond.wait(&mut inner);
        }
        let listener = inner.listener.take();
        inner.state = GuardState::Deleted;
        drop(inner);
        self.cond.notify_all();
        // Dropping the listener is what releases its retained host
        // references; it must happen after the drain, never under the lock.
        drop(listener);
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.lock().state == GuardState::Deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Recorder {
        calls: AtomicUsize,
    }

    impl Recorder {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    #[test]
    fn dispatch_reaches_live_listener() {
        let guard = CallbackGuard::new("test", Recorder::new());
        guard.dispatch(|l| l.calls.fetch_add(1, Ordering::SeqCst));
        assert_eq!(
            guard.dispatch(|l| l.calls.load(Ordering::SeqCst)),
            Some(1)
        );
    }

    #[test]
    fn no_dispatch_after_deletion() {
        let guard = CallbackGuard::new("test", Recorder::new());
        guard.set_deleted();
        assert_eq!(guard.dispatch(|l| l.calls.fetch_add(1, Ordering::SeqCst)), None);
        assert!(guard.is_deleted());
    }

    #[test]
    fn deletion_is_idempotent() {
        let guard = CallbackGuard::new("test", Recorder::new());
        guard.set_deleted();
        guard.set_deleted();
        assert!(guard.is_deleted());
    }

    #[test]
    fn listener_dropped_exactly_once() {
        struct DropCounter(Arc<AtomicUsize>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let guard = CallbackGuard::new("test", DropCounter(Arc::clone(&drops)));
        guard.set_deleted();
        guard.set_deleted();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_deleted_waits_for_in_flight_dispatch() {
        let guard = CallbackGuard::new("test", Recorder::new());
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let dispatcher = {
            let guard = Arc::clone(&guard);
            std::thread::spawn(move || {
                guard.dispatch(|l| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    l.calls.fetch_add(1, Ordering::SeqCst);
                });
            })
        };

        // Wait until the callback is inside the guard, then delete while it
        // is still running.
        entered_rx.recv().unwrap();
        let deleter = {
            let guard = Arc::clone(&guard);
            std::thread::spawn(move || guard.set_deleted())
        };

        // The deleter cannot finish while the dispatch is blocked.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!guard.is_deleted());

        release_tx.send(()).unwrap();
        dispatcher.join().unwrap();
        deleter.join().unwrap();
        assert!(guard.is_deleted());
    }

    #[test]
    fn concurrent_deleters_all_complete() {
        let guard = CallbackGuard::new("test", Recorder::new());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let guard = Arc::clone(&guard);
                std::thread::spawn(move || guard.set_deleted())
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert!(guard.is_deleted());
    }
}
