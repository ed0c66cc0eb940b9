//! Runtime replacement of Java method implementations.
//!
//! Two strategies, selected by the runtime flavor: Dalvik rewrites the
//! 56-byte `Method` struct and overlays shadow vtables
//! ([`dalvik`]); ART patches the `ArtMethod` record in place and borrows the
//! runtime's own generic JNI trampoline ([`art`]).
//!
//! The native trampoline itself is built by the embedder (generic native
//! callback synthesis lives outside this crate). The contract is small: the
//! trampoline has JNI calling convention (`JNIEnv*`, receiver, ...args),
//! holds a [`ReplacementScope`] for the duration of the user body, and on a
//! bridge error calls [`raise_pending`] and returns a sentinel (null/zero).

pub mod art;
pub mod dalvik;

use crate::dispatch::MethodDesc;
use crate::env::JniEnv;
use crate::error::{BridgeError, Result};
use crate::factory::Factory;
use crate::sys::jni;
use crate::vm::{self, RuntimeFlavor};
use log::debug;
use std::collections::HashSet;
use std::ffi::c_void;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Per-method hook bookkeeping, embedded in every [`MethodDesc`].
pub struct HookState {
    /// The installed trampoline, or `None` while unhooked.
    pub replacement: Option<*mut c_void>,
    pub(crate) dalvik: Option<dalvik::DalvikHookRecord>,
    pub(crate) art: Option<art::ArtHookRecord>,
}

impl HookState {
    pub fn new() -> Self {
        HookState {
            replacement: None,
            dalvik: None,
            art: None,
        }
    }

    /// The method id of the unhooked private clone, when one exists. Calls
    /// through this id reach the original body even while the live record
    /// is patched.
    pub fn original_method_id(&self) -> Option<jni::jmethodID> {
        if let Some(rec) = &self.dalvik {
            return Some(rec.clone_method_id());
        }
        if let Some(rec) = &self.art {
            return rec.clone_method_id;
        }
        None
    }
}

impl Default for HookState {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs `code` as the method's implementation.
///
/// Idempotent on re-install: the restoration snapshot is taken only once,
/// so flipping between replacements never loses the original bytes.
pub fn install(factory: &Factory, method: &Rc<MethodDesc>, code: *mut c_void) -> Result<()> {
    match factory.flavor() {
        RuntimeFlavor::Dalvik => dalvik::install(factory, method, code)?,
        RuntimeFlavor::Art => art::install(factory, method, code)?,
    }
    factory.note_hooked(method);
    debug!(
        "hooked {}.{} ({:?})",
        method.holder_name,
        method.name,
        factory.flavor()
    );
    Ok(())
}

/// Restores the method's pre-hook state byte for byte.
pub fn uninstall(factory: &Factory, method: &Rc<MethodDesc>) -> Result<()> {
    if !method.is_hooked() {
        return Ok(());
    }
    match factory.flavor() {
        RuntimeFlavor::Dalvik => dalvik::uninstall(factory, method)?,
        RuntimeFlavor::Art => art::uninstall(factory, method)?,
    }
    factory.note_unhooked(method);
    debug!("unhooked {}.{}", method.holder_name, method.name);
    Ok(())
}

/// RAII marker a replacement trampoline holds while the user body runs.
///
/// Entering adds the current native thread id to the method's pending set;
/// dropping removes it. The invocation dispatcher reads the set to route
/// re-entrant self-calls at the original implementation.
pub struct ReplacementScope {
    pending: Arc<Mutex<HashSet<i64>>>,
    tid: i64,
}

impl ReplacementScope {
    pub fn enter(pending: Arc<Mutex<HashSet<i64>>>) -> Self {
        let tid = vm::current_thread_id();
        if let Ok(mut set) = pending.lock() {
            set.insert(tid);
        }
        ReplacementScope { pending, tid }
    }
}

impl Drop for ReplacementScope {
    fn drop(&mut self) {
        if let Ok(mut set) = self.pending.lock() {
            set.remove(&self.tid);
        }
    }
}

/// Converts a bridge error inside a replacement body into a pending Java
/// exception, so the VM sees the throw when the trampoline returns its
/// sentinel value.
pub fn raise_pending(env: &JniEnv, err: &BridgeError) {
    if let BridgeError::JavaException(handle) = err {
        if !handle.0.is_null() {
            env.throw(handle.0);
            return;
        }
    }
    // Non-Java failures become a RuntimeException so the caller at least
    // sees a throw instead of a silent sentinel.
    if let Some(cls) = env.find_class("java/lang/RuntimeException") {
        let _ = unsafe {
            let vtable = *env.raw();
            let msg = std::ffi::CString::new(err.to_string()).unwrap_or_default();
            ((*vtable).ThrowNew)(env.raw(), cls, msg.as_ptr())
        };
    }
}
