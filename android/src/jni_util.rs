//! VM access, thread attachment and the fatal-diagnostic path.
//!
//! Engine callbacks arrive on threads the VM has never seen; every JNI
//! interaction goes through [`with_env`], which attaches the calling
//! thread as a daemon on first use and scopes local references to a
//! frame. JNI failures and pending Java exceptions are call-contract
//! violations and abort the process -- this layer never clears and
//! recovers from a Java exception.

use std::sync::OnceLock;

use jni::objects::JString;
use jni::{JNIEnv, JavaVM};
use tracing::error;

use crate::error::Result;

/// Local-reference headroom per callback frame.
const LOCAL_FRAME_CAPACITY: i32 = 64;

static VM: OnceLock<JavaVM> = OnceLock::new();

/// Store the VM at library load. Later calls are ignored.
pub fn store_vm(vm: JavaVM) {
    let _ = VM.set(vm);
}

fn vm() -> &'static JavaVM {
    match VM.get() {
        Some(vm) => vm,
        None => fatal("JavaVM not available; JNI_OnLoad has not run"),
    }
}

/// Log a diagnostic for a violated invariant and abort.
///
/// Recovering from any of the conditions routed here would mask a
/// memory-safety or call-contract bug, so none of them are recoverable.
pub fn fatal(message: &str) -> ! {
    error!(message, "fatal bridge invariant violation");
    std::process::abort()
}

/// Shorthand for entry points and dispatch paths: unwrap or abort with
/// context.
pub fn ok_or_fatal<T>(result: Result<T>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => fatal(&format!("{context}: {e}")),
    }
}

/// Run `f` with a `JNIEnv` for the current thread, attaching it to the VM
/// if the engine owns it, inside a bounded local-reference frame.
///
/// Any error out of `f` is fatal.
pub fn with_env<R>(context: &str, f: impl FnOnce(&mut JNIEnv) -> Result<R>) -> R {
    let vm = vm();
    let mut env = match vm.get_env() {
        Ok(env) => env,
        Err(_) => match vm.attach_current_thread_as_daemon() {
            Ok(env) => env,
            Err(e) => fatal(&format!("{context}: cannot attach thread to VM: {e}")),
        },
    };
    match env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| f(env)) {
        Ok(value) => value,
        Err(e) => fatal(&format!("{context}: {e}")),
    }
}

/// Abort if a Java exception is pending on this thread.
///
/// `jni`'s checked calls already surface pending exceptions as errors;
/// this is the explicit check used after object construction bursts.
pub fn check_exception(env: &mut JNIEnv, context: &str) {
    match env.exception_check() {
        Ok(false) => {}
        Ok(true) => {
            let _ = env.exception_describe();
            fatal(&format!("{context}: pending Java exception"));
        }
        Err(e) => fatal(&format!("{context}: exception_check failed: {e}")),
    }
}

/// Copy a Java string into Rust.
pub fn to_rust_string(env: &mut JNIEnv, value: &JString) -> Result<String> {
    Ok(env.get_string(value)?.into())
}

/// Retain a global reference.
pub fn global_ref(env: &JNIEnv, obj: &jni::objects::JObject) -> Result<jni::objects::GlobalRef> {
    Ok(env.new_global_ref(obj)?)
}

/// Build a Java string, with the error mapped into this crate's type.
pub fn new_java_string<'local>(env: &mut JNIEnv<'local>, value: &str) -> Result<JString<'local>> {
    Ok(env.new_string(value)?)
}
