//! Stats observer adapter.
//!
//! One stats observer lives for the whole room. Each `getStats` call from
//! Java enqueues its listener; each engine report pops the oldest pending
//! listener and delivers the encoded report to it. After the room's
//! release begins, the guard drops both enqueues and deliveries.

use std::collections::VecDeque;
use std::sync::Arc;

use jni::objects::{GlobalRef, JValue};
use jni::JNIEnv;
use parking_lot::Mutex;
use tracing::debug;

use videoroom_bridge_core::engine::{StatsObserver, StatsReport};
use videoroom_bridge_core::CallbackGuard;

use crate::error::Result;
use crate::jni_util::with_env;
use crate::observer::{call_listener, Method};

static ON_STATS: Method = Method { name: "onStats", sig: "(Ljava/lang/String;)V" };

pub(crate) static METHODS: &[&Method] = &[&ON_STATS];

/// Pending `getStats` listeners, oldest first.
pub struct JavaStatsQueue {
    pending: Mutex<VecDeque<GlobalRef>>,
}

impl JavaStatsQueue {
    pub fn new() -> Self {
        Self { pending: Mutex::new(VecDeque::new()) }
    }

    /// Queue a listener for the next report.
    pub fn enqueue(&self, listener: GlobalRef) {
        self.pending.lock().push_back(listener);
    }

    fn deliver(&self, env: &mut JNIEnv, report: &StatsReport) -> Result<()> {
        let listener = match self.pending.lock().pop_front() {
            Some(listener) => listener,
            None => {
                debug!("stats report with no pending listener");
                return Ok(());
            }
        };
        let json = report.to_json()?;
        let jreport = env.new_string(json)?;
        call_listener(env, listener.as_obj(), &ON_STATS, &[JValue::Object(&jreport)])
    }
}

impl Default for JavaStatsQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine-facing wrapper around the guard.
pub struct GuardedStatsObserver {
    guard: Arc<CallbackGuard<JavaStatsQueue>>,
}

impl GuardedStatsObserver {
    pub fn new(guard: Arc<CallbackGuard<JavaStatsQueue>>) -> Self {
        Self { guard }
    }
}

impl StatsObserver for GuardedStatsObserver {
    fn on_stats(&self, report: StatsReport) {
        self.guard
            .dispatch(|l| with_env("StatsListener.onStats", |env| l.deliver(env, &report)));
    }
}
