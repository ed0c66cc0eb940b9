//! Dalvik hooking: native-flag the live `Method` struct, route it through
//! the JNI bridge, and overlay shadow vtables so re-entry still reaches the
//! original bytecode.

use crate::dispatch::{MethodDesc, MethodKind};
use crate::error::{BridgeError, Result};
use crate::factory::Factory;
use crate::sys::dalvik as dvm;
use crate::sys::jni;
use log::debug;
use std::ffi::c_void;
use std::rc::Rc;

/// Snapshot plus private clone of a hooked Dalvik method.
pub struct DalvikHookRecord {
    /// Byte-exact restoration copy.
    original: Box<[u8; dvm::METHOD_SIZE]>,
    /// Live clone carrying the unhooked entry; its address doubles as the
    /// method id for re-entrant calls once a shadow vtable holds it.
    clone: Box<[u8; dvm::METHOD_SIZE]>,
}

impl DalvikHookRecord {
    pub fn clone_method_id(&self) -> jni::jmethodID {
        self.clone.as_ptr() as jni::jmethodID
    }
}

/// One class whose vtable has been swapped for an extended shadow copy.
pub struct PatchedClass {
    class_object: *mut c_void,
    original_vtable: *mut c_void,
    original_count: u32,
    /// Owned storage the class's vtable pointer now aims at. Double the
    /// original size, leaving room for appended clones.
    shadow: Box<[*mut c_void]>,
    /// Appended clone ids, in slot order after the original entries.
    entries: Vec<jni::jmethodID>,
}

impl PatchedClass {
    /// Points the class back at its original vtable.
    ///
    /// # Safety
    /// The class object must still be alive.
    pub unsafe fn restore(&self) {
        unsafe {
            dvm::write_ptr(
                self.class_object,
                dvm::CLASS_OBJECT_OFFSET_VTABLE,
                self.original_vtable,
            );
            dvm::write_u32(
                self.class_object,
                dvm::CLASS_OBJECT_OFFSET_VTABLE_COUNT,
                self.original_count,
            );
        }
    }

    pub fn contains(&self, clone_id: jni::jmethodID) -> bool {
        self.entries.contains(&clone_id)
    }

    pub fn forget(&mut self, clone_id: jni::jmethodID) {
        self.entries.retain(|&id| id != clone_id);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Installs `code` over a Dalvik method.
pub fn install(factory: &Factory, method: &Rc<MethodDesc>, code: *mut c_void) -> Result<()> {
    let api = factory.api();
    let dv = api.dalvik().ok_or(BridgeError::VmSpecMissing)?;
    let live = method.method_id as *mut c_void;

    let mut state = method.hook.borrow_mut();
    if state.dalvik.is_none() {
        // First hook: duplicate the struct twice. One copy restores, the
        // other stays callable through the shadow vtable.
        let mut original = Box::new([0u8; dvm::METHOD_SIZE]);
        unsafe {
            std::ptr::copy_nonoverlapping(live as *const u8, original.as_mut_ptr(), dvm::METHOD_SIZE);
        }
        let clone = original.clone();
        state.dalvik = Some(DalvikHookRecord { original, clone });
    }

    // ins covers the argument registers plus `this` for instance methods.
    let ins: usize = method.args.iter().map(|a| a.word_size()).sum::<usize>()
        + usize::from(method.kind == MethodKind::Instance);

    unsafe {
        let flags = dvm::read_u32(live, dvm::METHOD_OFFSET_ACCESS_FLAGS) | dvm::ACC_NATIVE;
        dvm::write_u32(live, dvm::METHOD_OFFSET_ACCESS_FLAGS, flags);
        dvm::write_u16(live, dvm::METHOD_OFFSET_REGISTERS_SIZE, ins as u16);
        dvm::write_u16(live, dvm::METHOD_OFFSET_INS_SIZE, ins as u16);
        dvm::write_u16(live, dvm::METHOD_OFFSET_OUTS_SIZE, 0);
        dvm::write_u32(live, dvm::METHOD_OFFSET_JNI_ARG_INFO, dvm::JNI_ARG_INFO_COMPUTE);
        (dv.use_jni_bridge)(live, code);
    }

    state.replacement = Some(code);
    Ok(())
}

/// Restores a Dalvik method and every vtable overlay that carried it.
pub fn uninstall(factory: &Factory, method: &Rc<MethodDesc>) -> Result<()> {
    let live = method.method_id as *mut c_void;
    let mut state = method.hook.borrow_mut();
    let Some(record) = state.dalvik.take() else {
        state.replacement = None;
        return Ok(());
    };

    unsafe {
        std::ptr::copy_nonoverlapping(
            record.original.as_ptr(),
            live as *mut u8,
            dvm::METHOD_SIZE,
        );
    }

    let clone_id = record.clone_method_id();
    let mut patched = factory.dalvik_classes().borrow_mut();
    patched.retain(|_, class| {
        if !class.contains(clone_id) {
            return true;
        }
        class.forget(clone_id);
        if class.is_empty() {
            unsafe { class.restore() };
            false
        } else {
            // Other hooked methods still live in this shadow; the dead slot
            // stays inert until the last of them unhooks.
            true
        }
    });

    state.replacement = None;
    Ok(())
}

/// Writes back every remaining shadow vtable, draining the table.
pub fn drain_overlays(factory: &Factory) {
    let mut patched = factory.dalvik_classes().borrow_mut();
    for (_, class) in patched.drain() {
        unsafe { class.restore() };
    }
}

/// Makes sure the receiver's class vtable holds this method's clone, so a
/// re-entrant virtual call through the clone id resolves.
///
/// Runs on the first re-entrant call per (class, method); later calls find
/// the entry and return immediately.
pub fn ensure_shadow_vtable(
    factory: &Factory,
    env: &crate::env::JniEnv,
    receiver: jni::jobject,
    method: &MethodDesc,
) -> Result<()> {
    let api = factory.api();
    let dv = api.dalvik().ok_or(BridgeError::VmSpecMissing)?;
    let clone_id = method
        .hook
        .borrow()
        .original_method_id()
        .ok_or(BridgeError::VmSpecMissing)?;

    unsafe {
        let thread = dvm::read_ptr(env.raw() as *const c_void, dvm::JNI_ENV_OFFSET_SELF);
        let obj = (dv.decode_indirect_ref)(thread, receiver);
        let class_object = dvm::read_ptr(obj, dvm::OBJECT_OFFSET_CLAZZ);

        let mut patched = factory.dalvik_classes().borrow_mut();
        if let Some(class) = patched.get_mut(&(class_object as usize)) {
            if class.contains(clone_id) {
                return Ok(());
            }
            // Append into the spare half of the existing shadow.
            let slot = class.original_count as usize + class.entries.len();
            if slot >= class.shadow.len() {
                return Err(BridgeError::OutOfMemory);
            }
            class.shadow[slot] = clone_id as *mut c_void;
            dvm::write_u16(clone_id as *mut c_void, dvm::METHOD_OFFSET_METHOD_INDEX, slot as u16);
            dvm::write_u32(
                class_object,
                dvm::CLASS_OBJECT_OFFSET_VTABLE_COUNT,
                slot as u32 + 1,
            );
            class.entries.push(clone_id);
            return Ok(());
        }

        let original_vtable = dvm::read_ptr(class_object, dvm::CLASS_OBJECT_OFFSET_VTABLE);
        let original_count = dvm::read_u32(class_object, dvm::CLASS_OBJECT_OFFSET_VTABLE_COUNT);
        let count = original_count as usize;

        let mut shadow = vec![std::ptr::null_mut::<c_void>(); (count * 2).max(count + 1)]
            .into_boxed_slice();
        std::ptr::copy_nonoverlapping(
            original_vtable as *const *mut c_void,
            shadow.as_mut_ptr(),
            count,
        );
        shadow[count] = clone_id as *mut c_void;
        dvm::write_u16(clone_id as *mut c_void, dvm::METHOD_OFFSET_METHOD_INDEX, count as u16);

        dvm::write_ptr(
            class_object,
            dvm::CLASS_OBJECT_OFFSET_VTABLE,
            shadow.as_ptr() as *mut c_void,
        );
        dvm::write_u32(
            class_object,
            dvm::CLASS_OBJECT_OFFSET_VTABLE_COUNT,
            original_count + 1,
        );

        debug!(
            "shadow vtable for {} (count {} -> {})",
            method.holder_name,
            original_count,
            original_count + 1
        );

        patched.insert(
            class_object as usize,
            PatchedClass {
                class_object,
                original_vtable,
                original_count,
                shadow,
                entries: vec![clone_id],
            },
        );
    }
    Ok(())
}
