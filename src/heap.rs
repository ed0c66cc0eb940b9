//! Live-instance enumeration over the Dalvik heap.
//!
//! `choose` decodes the target class object pointer, sweeps
//! `[dvmHeapSourceGetBase, dvmHeapSourceGetLimit)` for words equal to it
//! (every Dalvik object leads with its class pointer), validates candidates
//! with `dvmIsValidObject`, and hands each survivor to the match callback as
//! a pinned instance.
//!
//! Turning a raw `Object*` back into a JNI reference needs libdvm's
//! internal `addLocalReference`, which is not exported. It is resolved
//! lazily: find the `libdvm.so` mapping, scan its executable pages for the
//! function's prologue signature, and on ARM set the Thumb bit on the
//! resolved address.

use crate::env::JniEnv;
use crate::error::{BridgeError, Result};
use crate::factory::{ClassInstance, Factory};
use crate::sys::dalvik as dvm;
use crate::vm::{DalvikApi, DvmAddLocalReferenceFn, RuntimeFlavor};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use proc_maps::get_process_maps;
use std::ffi::c_void;
use std::rc::Rc;

/// What a match callback tells the scanner to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

/// Enumerates live instances of `class_name`, Dalvik only.
///
/// `on_match` runs once per surviving candidate and may stop the sweep;
/// `on_complete` runs on every terminating path of the scan itself.
pub fn choose(
    factory: &Factory,
    env: &JniEnv,
    class_name: &str,
    mut on_match: impl FnMut(Rc<ClassInstance>) -> ScanControl,
    on_complete: impl FnOnce(),
) -> Result<()> {
    if factory.flavor() != RuntimeFlavor::Dalvik {
        return Err(BridgeError::HeapScanUnsupported);
    }
    let dv = factory
        .api()
        .dalvik()
        .ok_or(BridgeError::HeapScanUnsupported)?;

    let wrapper = factory.use_class(env, class_name)?;
    let add_local = resolve_add_local_reference(dv)?;

    unsafe {
        let thread = dvm::read_ptr(env.raw() as *const c_void, dvm::JNI_ENV_OFFSET_SELF);
        let class_ptr = (dv.decode_indirect_ref)(thread, wrapper.class_ref());
        let base = (dv.heap_source_get_base)() as usize;
        let limit = (dv.heap_source_get_limit)() as usize;
        debug!(
            "scanning dalvik heap {base:#x}..{limit:#x} for {class_name} ({class_ptr:p})"
        );

        let step = std::mem::size_of::<usize>();
        let mut matches = 0usize;
        let mut addr = base;
        while addr + step <= limit {
            let word = (addr as *const usize).read_unaligned();
            if word == class_ptr as usize {
                let candidate = addr as *mut c_void;
                if (dv.is_valid_object)(candidate) != 0 {
                    let local = add_local(thread, candidate);
                    if !local.is_null() {
                        if let Ok(instance) = factory.cast(env, local, &wrapper) {
                            matches += 1;
                            let control = on_match(instance);
                            env.delete_local_ref(local);
                            if control == ScanControl::Stop {
                                debug!("scan stopped after {matches} matches");
                                on_complete();
                                return Ok(());
                            }
                        } else {
                            env.delete_local_ref(local);
                        }
                    }
                }
            }
            addr += step;
        }
        debug!("scan complete, {matches} matches");
    }
    on_complete();
    Ok(())
}

// =========================================================================
// addLocalReference resolution
// =========================================================================

/// Prologue signatures for `addLocalReference` in stock 4.x libdvm builds.
/// `??` bytes are build-dependent and ignored during the match.
const SIGNATURES: &[(&str, &str)] = &[
    ("arm", "2d e9 f0 41 05 46 0c 46 ?? 48 78 44 ?? 68"),
    ("x86", "55 89 e5 53 57 56 83 e4 f0 83 ec ?? 8b 75 08"),
];

static RESOLVED: OnceCell<usize> = OnceCell::new();

fn resolve_add_local_reference(dv: &DalvikApi) -> Result<DvmAddLocalReferenceFn> {
    if let Some(f) = dv.add_local_reference.get() {
        return Ok(f);
    }
    let addr = *RESOLVED.get_or_try_init(scan_libdvm)?;
    let f: DvmAddLocalReferenceFn = unsafe { std::mem::transmute(addr) };
    dv.add_local_reference.set(Some(f));
    Ok(f)
}

fn scan_libdvm() -> Result<usize> {
    let arch = if cfg!(target_arch = "arm") {
        "arm"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else {
        return Err(BridgeError::HeapScanUnsupported);
    };
    let pattern = SIGNATURES
        .iter()
        .find(|(a, _)| *a == arch)
        .map(|(_, p)| parse_pattern(p))
        .ok_or(BridgeError::HeapScanUnsupported)?;

    let maps = get_process_maps(std::process::id() as proc_maps::Pid)
        .map_err(|_| BridgeError::HeapScanUnsupported)?;

    for map in maps {
        let is_libdvm = map
            .filename()
            .map(|p| p.to_string_lossy().ends_with("libdvm.so"))
            .unwrap_or(false);
        if !is_libdvm || !map.is_exec() {
            continue;
        }
        let bytes = unsafe { std::slice::from_raw_parts(map.start() as *const u8, map.size()) };
        if let Some(offset) = find_pattern(bytes, &pattern) {
            let mut addr = map.start() + offset;
            if arch == "arm" {
                // Thumb code: odd address selects the right instruction set.
                addr |= 1;
            }
            info!("resolved addLocalReference at {addr:#x}");
            return Ok(addr);
        }
    }
    warn!("addLocalReference signature not found in libdvm");
    Err(BridgeError::HeapScanUnsupported)
}

fn parse_pattern(spec: &str) -> Vec<Option<u8>> {
    spec.split_whitespace()
        .map(|tok| {
            if tok == "??" {
                None
            } else {
                u8::from_str_radix(tok, 16).ok()
            }
        })
        .collect()
}

fn find_pattern(haystack: &[u8], pattern: &[Option<u8>]) -> Option<usize> {
    if pattern.is_empty() || haystack.len() < pattern.len() {
        return None;
    }
    (0..=haystack.len() - pattern.len()).find(|&i| {
        pattern
            .iter()
            .enumerate()
            .all(|(j, p)| p.map_or(true, |b| haystack[i + j] == b))
    })
}
