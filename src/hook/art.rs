//! ART hooking: patch the `ArtMethod` record in place.
//!
//! Installation writes four words: the native code pointer, the access
//! flags (native + fast-native, so GC checkpoints stay out of the mutated
//! record mid-call), the quick-code entry (the runtime's own generic JNI
//! trampoline, read through the Runtime -> ClassLinker offsets so stack
//! walks recognize the frame), and the interpreter bridge. Uninstallation
//! writes the snapshot back verbatim.

use crate::dispatch::MethodDesc;
use crate::error::{BridgeError, Result};
use crate::factory::Factory;
use crate::sys::art;
use crate::sys::jni;
use std::ffi::c_void;
use std::rc::Rc;

/// Snapshot plus optional clone of a hooked ART method.
pub struct ArtHookRecord {
    snapshot: art::ArtMethodSnapshot,
    /// A free-standing copy of the `ArtMethod` made through
    /// `art::mirror::Object::Clone` before patching. It keeps the original
    /// entry points, so re-entrant calls dispatch through it directly.
    pub clone_method_id: Option<jni::jmethodID>,
}

/// Installs `code` over an ART method.
pub fn install(factory: &Factory, method: &Rc<MethodDesc>, code: *mut c_void) -> Result<()> {
    let api = factory.api();
    let art_api = api.art().ok_or(BridgeError::VmSpecMissing)?;
    if art_api.runtime_instance.is_null() {
        return Err(BridgeError::VmSpecMissing);
    }
    let spec = art_api.method_spec;
    let live = method.method_id as *mut c_void;

    // Resolve the runtime's generic JNI trampoline up front; failing here
    // leaves the method untouched.
    let trampoline = unsafe {
        let class_linker = art::read_ptr(art_api.runtime_instance, art_api.runtime_spec.class_linker);
        if class_linker.is_null() {
            return Err(BridgeError::TrampolineNotFound);
        }
        let t = art::read_ptr(class_linker, art_api.class_linker_spec.quick_generic_jni_trampoline);
        if t.is_null() {
            return Err(BridgeError::TrampolineNotFound);
        }
        t
    };

    let mut state = method.hook.borrow_mut();
    if state.art.is_none() {
        let snapshot = unsafe {
            art::ArtMethodSnapshot {
                jni_code: art::read_ptr(live, spec.jni_code),
                quick_code: art::read_ptr(live, spec.quick_code),
                interpreter_code: art::read_ptr(live, spec.interpreter_code),
                access_flags: art::read_u32(live, spec.access_flags),
            }
        };
        let clone_method_id = clone_art_method(art_api, live);
        state.art = Some(ArtHookRecord {
            snapshot,
            clone_method_id,
        });
    }

    unsafe {
        art::write_ptr(live, spec.jni_code, code);
        let flags = art::read_u32(live, spec.access_flags) | art::ACC_NATIVE | art::ACC_FAST_NATIVE;
        art::write_u32(live, spec.access_flags, flags);
        art::write_ptr(live, spec.quick_code, trampoline);
        art::write_ptr(
            live,
            spec.interpreter_code,
            art_api.interpreter_to_compiled_code_bridge,
        );
    }

    state.replacement = Some(code);
    Ok(())
}

/// Restores the four patched words from the snapshot.
pub fn uninstall(factory: &Factory, method: &Rc<MethodDesc>) -> Result<()> {
    let api = factory.api();
    let art_api = api.art().ok_or(BridgeError::VmSpecMissing)?;
    let spec = art_api.method_spec;
    let live = method.method_id as *mut c_void;

    let mut state = method.hook.borrow_mut();
    let Some(record) = state.art.take() else {
        state.replacement = None;
        return Ok(());
    };

    unsafe {
        art::write_ptr(live, spec.interpreter_code, record.snapshot.interpreter_code);
        art::write_ptr(live, spec.quick_code, record.snapshot.quick_code);
        art::write_u32(live, spec.access_flags, record.snapshot.access_flags);
        art::write_ptr(live, spec.jni_code, record.snapshot.jni_code);
    }

    state.replacement = None;
    Ok(())
}

/// Clones the live `ArtMethod` so its original entry points stay callable.
///
/// Both symbols are optional in the API surface; without them the engine
/// still hooks, it just loses the clean re-entry route.
fn clone_art_method(api: &crate::vm::ArtApi, live: *mut c_void) -> Option<jni::jmethodID> {
    let clone = api.object_clone?;
    let current = api.thread_current_from_gdb?;
    unsafe {
        let thread = current();
        let cloned = clone(live, thread);
        if cloned.is_null() {
            None
        } else {
            Some(cloned as jni::jmethodID)
        }
    }
}
