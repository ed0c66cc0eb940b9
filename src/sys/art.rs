//! ART in-memory record layout.
//!
//! Unlike Dalvik, the `ArtMethod`, `Runtime` and `ClassLinker` layouts move
//! between Android releases and between 32/64-bit builds. The bridge never
//! guesses: the embedder's version prober fills the offset specs below and
//! hands them in through [`crate::vm::ArtApi`].

use std::ffi::c_void;

/// `ACC_NATIVE` in `ArtMethod.access_flags_`.
pub const ACC_NATIVE: u32 = 0x0000_0100;

/// `ACC_FAST_NATIVE`: suppresses GC checkpoint polling at entry/exit, which
/// keeps the mutated method record out of a safepoint's view mid-call.
pub const ACC_FAST_NATIVE: u32 = 0x0008_0000;

/// Byte offsets into an `ArtMethod` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtMethodSpec {
    /// Total record size; used to snapshot and restore whole methods.
    pub size: usize,
    /// `entry_point_from_jni_` (a.k.a. the native code word).
    pub jni_code: usize,
    /// `entry_point_from_quick_compiled_code_`.
    pub quick_code: usize,
    /// `entry_point_from_interpreter_`.
    pub interpreter_code: usize,
    /// `access_flags_` (u32).
    pub access_flags: usize,
}

/// Byte offsets into the `art::Runtime` singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtRuntimeSpec {
    /// `Runtime::class_linker_` (pointer).
    pub class_linker: usize,
}

/// Byte offsets into `art::ClassLinker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtClassLinkerSpec {
    /// `ClassLinker::quick_generic_jni_trampoline_` (pointer).
    pub quick_generic_jni_trampoline: usize,
}

/// Snapshot of the four `ArtMethod` words a hook mutates, in install order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtMethodSnapshot {
    pub jni_code: *mut c_void,
    pub quick_code: *mut c_void,
    pub interpreter_code: *mut c_void,
    pub access_flags: u32,
}

/// # Safety
/// `base` must point at a live record with a readable pointer at `offset`.
pub unsafe fn read_ptr(base: *const c_void, offset: usize) -> *mut c_void {
    unsafe { (base as *const u8).add(offset).cast::<*mut c_void>().read_unaligned() }
}

/// # Safety
/// `base` must point at a live record with a writable pointer at `offset`.
pub unsafe fn write_ptr(base: *mut c_void, offset: usize, value: *mut c_void) {
    unsafe {
        (base as *mut u8)
            .add(offset)
            .cast::<*mut c_void>()
            .write_unaligned(value)
    }
}

/// # Safety
/// `base` must point at a live record with a readable `u32` at `offset`.
pub unsafe fn read_u32(base: *const c_void, offset: usize) -> u32 {
    unsafe { (base as *const u8).add(offset).cast::<u32>().read_unaligned() }
}

/// # Safety
/// `base` must point at a live record with a writable `u32` at `offset`.
pub unsafe fn write_u32(base: *mut c_void, offset: usize, value: u32) {
    unsafe { (base as *mut u8).add(offset).cast::<u32>().write_unaligned(value) }
}
