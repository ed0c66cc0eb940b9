//! Description of the managed runtime the bridge is driving.
//!
//! The bridge itself never probes versions or resolves symbols; the
//! embedder's attach layer does that and hands the results in through
//! [`VmApi`]. Everything here is plain data plus the [`VmApi::perform`]
//! helper that attaches the scripting thread before touching JNI.

use crate::env::JniEnv;
use crate::sys::art::{ArtClassLinkerSpec, ArtMethodSpec, ArtRuntimeSpec};
use crate::sys::jni;
use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

/// Which managed runtime generation is live in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFlavor {
    Dalvik,
    Art,
}

/// `dvmDecodeIndirectRef(Thread*, jobject) -> Object*`
pub type DvmDecodeIndirectRefFn =
    unsafe extern "C" fn(thread: *mut c_void, ref_: jni::jobject) -> *mut c_void;
/// `dvmHeapSourceGetBase() -> void*`
pub type DvmHeapSourceGetBaseFn = unsafe extern "C" fn() -> *mut c_void;
/// `dvmHeapSourceGetLimit() -> void*`
pub type DvmHeapSourceGetLimitFn = unsafe extern "C" fn() -> *mut c_void;
/// `dvmIsValidObject(Object*) -> bool`
pub type DvmIsValidObjectFn = unsafe extern "C" fn(obj: *mut c_void) -> u8;
/// `dvmUseJNIBridge(Method*, void*)`
pub type DvmUseJniBridgeFn = unsafe extern "C" fn(method: *mut c_void, bridge: *mut c_void);
/// `addLocalReference(Thread*, Object*) -> jobject` (resolved lazily by
/// signature scan; not exported by libdvm).
pub type DvmAddLocalReferenceFn =
    unsafe extern "C" fn(thread: *mut c_void, obj: *mut c_void) -> jni::jobject;

/// Exported libdvm entry points the bridge needs.
pub struct DalvikApi {
    pub decode_indirect_ref: DvmDecodeIndirectRefFn,
    pub heap_source_get_base: DvmHeapSourceGetBaseFn,
    pub heap_source_get_limit: DvmHeapSourceGetLimitFn,
    pub is_valid_object: DvmIsValidObjectFn,
    pub use_jni_bridge: DvmUseJniBridgeFn,
    /// Filled by the heap enumerator's lazy signature scan, or by the
    /// embedder when it already knows the address.
    pub add_local_reference: Cell<Option<DvmAddLocalReferenceFn>>,
}

/// `art::mirror::Object::Clone(Object*, Thread*) -> Object*`
pub type ArtObjectCloneFn =
    unsafe extern "C" fn(obj: *mut c_void, thread: *mut c_void) -> *mut c_void;
/// `art::Thread::CurrentFromGdb() -> Thread*`
pub type ArtThreadCurrentFn = unsafe extern "C" fn() -> *mut c_void;

/// ART symbols and offset specs supplied by the embedder's prober.
pub struct ArtApi {
    /// `artInterpreterToCompiledCodeBridge`.
    pub interpreter_to_compiled_code_bridge: *mut c_void,
    /// The `art::Runtime` singleton (`runtime_instance_`).
    pub runtime_instance: *mut c_void,
    /// `art::mirror::Object::Clone`, used to keep an unhooked method copy.
    pub object_clone: Option<ArtObjectCloneFn>,
    /// `art::Thread::CurrentFromGdb`, the thread argument for the clone.
    pub thread_current_from_gdb: Option<ArtThreadCurrentFn>,
    pub method_spec: ArtMethodSpec,
    pub runtime_spec: ArtRuntimeSpec,
    pub class_linker_spec: ArtClassLinkerSpec,
}

/// Everything the bridge knows about the VM it lives in.
pub struct VmApi {
    pub flavor: RuntimeFlavor,
    pub vm: *mut jni::JavaVM,
    pub dalvik: Option<DalvikApi>,
    pub art: Option<ArtApi>,
}

impl VmApi {
    /// Attaches the current thread and runs `f` with its environment.
    ///
    /// Every host-visible bridge call happens inside one of these scopes;
    /// the attach is left in place (daemon) so repeated performs are cheap.
    pub fn perform<T>(&self, f: impl FnOnce(&JniEnv) -> T) -> T {
        let mut env_ptr: *mut jni::JNIEnv = ptr::null_mut();
        unsafe {
            let vtable = *self.vm;
            let rc = ((*vtable).GetEnv)(
                self.vm,
                &mut env_ptr as *mut *mut jni::JNIEnv as *mut *mut c_void,
                jni::JNI_VERSION_1_6,
            );
            if rc == jni::JNI_EDETACHED {
                ((*vtable).AttachCurrentThreadAsDaemon)(self.vm, &mut env_ptr, ptr::null_mut());
            }
            let env = JniEnv::from_raw(env_ptr);
            f(&env)
        }
    }

    /// The Dalvik symbol table, or `None` on ART.
    pub fn dalvik(&self) -> Option<&DalvikApi> {
        self.dalvik.as_ref()
    }

    /// The ART symbol/offset table, or `None` on Dalvik.
    pub fn art(&self) -> Option<&ArtApi> {
        self.art.as_ref()
    }
}

/// Native thread id used to key the pending-calls sets.
pub fn current_thread_id() -> i64 {
    // gettid(2) never fails; it is the same id ART logs in tombstones.
    unsafe { libc::gettid() as i64 }
}
