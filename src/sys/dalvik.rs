//! Dalvik (libdvm) in-memory record layout.
//!
//! Dalvik never exposed these structs through a public header; the offsets
//! below are the stable layout of the 4.x `Method` and `ClassObject`
//! records that every in-process instrumentation tool relies on. Dalvik is
//! 32-bit only, so all pointer-sized fields are 4 bytes.

use std::ffi::c_void;

/// Total size of a Dalvik `Method` struct in bytes.
pub const METHOD_SIZE: usize = 56;

/// `Method.accessFlags` (u32).
pub const METHOD_OFFSET_ACCESS_FLAGS: usize = 4;
/// `Method.methodIndex` (u16), the vtable slot for virtual methods.
pub const METHOD_OFFSET_METHOD_INDEX: usize = 8;
/// `Method.registersSize` (u16).
pub const METHOD_OFFSET_REGISTERS_SIZE: usize = 10;
/// `Method.outsSize` (u16).
pub const METHOD_OFFSET_OUTS_SIZE: usize = 12;
/// `Method.insSize` (u16).
pub const METHOD_OFFSET_INS_SIZE: usize = 14;
/// `Method.insns` (pointer to code or native thunk).
pub const METHOD_OFFSET_INSNS: usize = 32;
/// `Method.jniArgInfo` (u32).
pub const METHOD_OFFSET_JNI_ARG_INFO: usize = 36;

/// `Object.clazz`: every Dalvik object starts with its class pointer.
pub const OBJECT_OFFSET_CLAZZ: usize = 0;

/// `ClassObject.vtableCount` (i32).
pub const CLASS_OBJECT_OFFSET_VTABLE_COUNT: usize = 112;
/// `ClassObject.vtable` (pointer to an array of `Method*`).
pub const CLASS_OBJECT_OFFSET_VTABLE: usize = 116;

/// `JNIEnvExt.self`: the `Thread*` backing a Dalvik JNI environment.
pub const JNI_ENV_OFFSET_SELF: usize = 12;

/// `ACC_NATIVE` in `Method.accessFlags`.
pub const ACC_NATIVE: u32 = 0x0100;

/// Magic `jniArgInfo` value telling the bridge to compute argument
/// marshaling at call time instead of using a precomputed hint.
pub const JNI_ARG_INFO_COMPUTE: u32 = 0x8000_0000;

/// Reads a little-endian `u16` field out of a raw method record.
///
/// # Safety
/// `method` must point at a live, readable Dalvik `Method` struct.
pub unsafe fn read_u16(method: *const c_void, offset: usize) -> u16 {
    unsafe { (method as *const u8).add(offset).cast::<u16>().read_unaligned() }
}

/// Writes a little-endian `u16` field into a raw method record.
///
/// # Safety
/// `method` must point at a live, writable Dalvik `Method` struct.
pub unsafe fn write_u16(method: *mut c_void, offset: usize, value: u16) {
    unsafe { (method as *mut u8).add(offset).cast::<u16>().write_unaligned(value) }
}

/// # Safety
/// `method` must point at a live, readable Dalvik `Method` struct.
pub unsafe fn read_u32(method: *const c_void, offset: usize) -> u32 {
    unsafe { (method as *const u8).add(offset).cast::<u32>().read_unaligned() }
}

/// # Safety
/// `method` must point at a live, writable Dalvik `Method` struct.
pub unsafe fn write_u32(method: *mut c_void, offset: usize, value: u32) {
    unsafe { (method as *mut u8).add(offset).cast::<u32>().write_unaligned(value) }
}

/// # Safety
/// `base` must point at a live record with a readable pointer at `offset`.
pub unsafe fn read_ptr(base: *const c_void, offset: usize) -> *mut c_void {
    unsafe {
        (base as *const u8)
            .add(offset)
            .cast::<*mut c_void>()
            .read_unaligned()
    }
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
