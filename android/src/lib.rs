//! JNI surface for the VideoRoom Android SDK.
//!
//! This crate is pure glue: every `Java_com_videoroom_sdk_*` entry point
//! resolves a typed handle, performs the operation (or posts it to the
//! room thread), and every engine callback reaches Java through a
//! lifetime guard. The protocols themselves live in
//! `videoroom-bridge-core`; this crate instantiates them over `jni`
//! global references.

#![warn(clippy::all)]

pub mod api;
pub mod class_cache;
pub mod context;
pub mod error;
pub mod jni_util;
pub mod observer;

use std::ffi::c_void;

use jni::sys::{jint, JNI_ERR, JNI_VERSION_1_6};
use jni::JavaVM;
use tracing::{error, info};

pub use error::{Error, Result};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Library load: store the VM, route panics to the fatal path, cache the
/// Java classes. This is the only moment every cached class is reachable
/// from the current thread's class loader.
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    init_tracing();

    // Contract violations panic; on an engine-owned thread that would
    // otherwise only kill the thread. Promote every panic to the fatal
    // path so violations crash the process identically everywhere.
    std::panic::set_hook(Box::new(|info| {
        error!(%info, "bridge panic");
        std::process::abort();
    }));

    {
        let mut env = match vm.get_env() {
            Ok(env) => env,
            Err(e) => {
                error!(error = %e, "JNI_OnLoad called without an attached thread");
                return JNI_ERR;
            }
        };
        if let Err(e) = class_cache::load(&mut env) {
            error!(error = %e, "class cache load failed");
            return JNI_ERR;
        }
    }

    jni_util::store_vm(vm);
    info!("videoroom bridge loaded");
    JNI_VERSION_1_6
}

/// Library unload: drop the cached class references.
#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: JavaVM, _reserved: *mut c_void) {
    class_cache::unload();
    info!("videoroom bridge unloaded");
}
