//! Single-threaded room command actor.
//!
//! The engine's room teardown is not safe to run concurrently with, or
//! reentrantly from, its own callback delivery. Every mutating operation
//! against one room is therefore posted to a dedicated worker thread and
//! executed in FIFO order; release is a posted command too, so the
//! destructive teardown always runs after any in-flight command has fully
//! returned, never inside one.
//!
//! Callers never receive results from these methods: outcomes surface
//! through the observer callbacks registered at connect time.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::engine::{
    ConnectOptions, NetworkChangeEvent, RoomControl, RoomObserver, RoomState, StatsObserver,
    VideoEngine,
};

/// Commands consumed by the worker thread, in post order.
enum RoomCommand {
    Connect,
    Disconnect,
    GetStats,
    NetworkChange(NetworkChangeEvent),
    Release,
}

/// One-shot event signaled when the worker has finished tearing down.
struct ReleasedEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl ReleasedEvent {
    fn new() -> Self {
        Self { signaled: Mutex::new(false), cond: Condvar::new() }
    }

    fn signal(&self) {
        *self.signaled.lock() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
    }

    fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}

/// Owner of one engine room and the thread all its operations run on.
pub struct RoomDelegate {
    tx: Sender<RoomCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    released: Arc<ReleasedEvent>,
    room: Arc<Mutex<Option<Arc<dyn RoomControl>>>>,
}

impl RoomDelegate {
    pub fn new(
        engine: Arc<dyn VideoEngine>,
        options: ConnectOptions,
        room_observer: Arc<dyn RoomObserver>,
        stats_observer: Arc<dyn StatsObserver>,
    ) -> Self {
        let (tx, rx) = channel::unbounded();
        let room = Arc::new(Mutex::new(None));
        let released = Arc::new(ReleasedEvent::new());

        let worker = {
            let room = Arc::clone(&room);
            let released = Arc::clone(&released);
            std::thread::spawn(move || {
                worker_loop(rx, engine, options, room_observer, stats_observer, room, &released);
            })
        };

        Self { tx, worker: Mutex::new(Some(worker)), released, room }
    }

    /// Post the connection attempt. Must be the first command; the owning
    /// entry point calls this immediately after construction.
    pub fn connect(&self) {
        self.post(RoomCommand::Connect);
    }

    pub fn disconnect(&self) {
        self.post(RoomCommand::Disconnect);
    }

    pub fn get_stats(&self) {
        self.post(RoomCommand::GetStats);
    }

    pub fn network_change(&self, event: NetworkChangeEvent) {
        self.post(RoomCommand::NetworkChange(event));
    }

    /// Post the teardown command. Returns immediately; pair with
    /// [`wait_released`](Self::wait_released) on the release path.
    pub fn release(&self) {
        self.post(RoomCommand::Release);
    }

    /// Block until the worker has executed the teardown command, then
    /// reap the worker thread.
    pub fn wait_released(&self) {
        self.released.wait();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("room worker thread panicked during teardown");
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.is_signaled()
    }

    /// Synchronous recording query; the one operation that does not go
    /// through the command queue. Reads a plain engine flag and must stay
    /// that way -- anything stateful belongs on the worker.
    pub fn is_recording(&self) -> bool {
        self.room.lock().as_ref().map(|room| room.is_recording()).unwrap_or(false)
    }

    /// Engine room accessor for synchronous state queries (sid, state).
    pub fn room(&self) -> Option<Arc<dyn RoomControl>> {
        self.room.lock().clone()
    }

    /// Room state as the host should report it: `Connecting` until the
    /// worker has produced a room, `Disconnected` once released.
    pub fn state(&self) -> RoomState {
        if self.is_released() {
            return RoomState::Disconnected;
        }
        match self.room() {
            Some(room) => room.state(),
            None => RoomState::Connecting,
        }
    }

    fn post(&self, command: RoomCommand) {
        if self.tx.send(command).is_err() {
            // The worker has already processed Release and hung up.
            debug!("room command dropped after release");
        }
    }
}

impl Drop for RoomDelegate {
    fn drop(&mut self) {
        // Dropping a delegate whose teardown never ran means the engine
        // room and its observers would die on whatever thread this drop
        // happens to run on. Crash loudly instead of corrupting teardown
        // order.
        if !self.released.is_signaled() && !std::thread::panicking() {
            panic!("RoomDelegate dropped without release(); teardown must run on the room thread");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    rx: Receiver<RoomCommand>,
    engine: Arc<dyn VideoEngine>,
    options: ConnectOptions,
    room_observer: Arc<dyn RoomObserver>,
    stats_observer: Arc<dyn StatsObserver>,
    room_slot: Arc<Mutex<Option<Arc<dyn RoomControl>>>>,
    released: &ReleasedEvent,
) {
    while let Ok(command) = rx.recv() {
        match command {
            RoomCommand::Connect => {
                debug!(room = %options.room_name, "connecting");
                let room = engine.connect(options.clone(), Arc::clone(&room_observer));
                *room_slot.lock() = Some(room);
            }
            RoomCommand::Disconnect => match room_slot.lock().clone() {
                Some(room) => room.disconnect(),
                None => debug!("disconnect with no live room"),
            },
            RoomCommand::GetStats => match room_slot.lock().clone() {
                Some(room) => room.get_stats(Arc::clone(&stats_observer)),
                None => debug!("get_stats with no live room"),
            },
            RoomCommand::NetworkChange(event) => match room_slot.lock().clone() {
                Some(room) => room.network_change(event),
                None => debug!("network_change with no live room"),
            },
            RoomCommand::Release => break,
        }
    }

    // Teardown runs here, outside any command or callback frame: drop the
    // room first, then the observers, then signal the waiter.
    debug!("room worker releasing");
    *room_slot.lock() = None;
    drop(room_observer);
    drop(stats_observer);
    drop(engine);
    released.signal();
}
