//! # artbridge
//!
//! In-process reflection and instrumentation bridge for Android's managed
//! runtimes (Dalvik and ART).
//!
//! Given a live process and a populated [`vm::VmApi`], the bridge exposes
//! the Java class graph: resolve classes by name, enumerate their members,
//! construct instances, read and write fields, invoke across overloads,
//! replace method implementations at runtime, and sweep the Dalvik heap for
//! live instances.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Embedding host                       │
//! │   attach, version probing, trampoline synthesis          │
//! ├──────────────────────────────────────────────────────────┤
//! │   factory  - class cache, wrappers, instances, dispose   │
//! │   members  - reflection-driven member tables             │
//! │   dispatch - overload selection + invocation             │
//! │   adapter  - host <-> JNI value marshaling               │
//! │   hook     - Dalvik/ART implementation replacement       │
//! │   heap     - Dalvik live-instance enumeration            │
//! ├──────────────────────────────────────────────────────────┤
//! │   env - safe JNI wrapper      vm - runtime description   │
//! ├──────────────────────────────────────────────────────────┤
//! │   sys - raw JNI table, Dalvik/ART record layouts         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use artbridge::prelude::*;
//! use std::rc::Rc;
//!
//! let api = Rc::new(build_vm_api()); // supplied by the embedder
//! let factory = Factory::new(Rc::clone(&api));
//!
//! api.perform(|env| -> artbridge::Result<()> {
//!     let string = factory.use_class(env, "java.lang.String")?;
//!     let hi = string.new_instance(&factory, env, &[Value::Str("hi".into())])?;
//!     let len = string
//!         .method(&factory, env, "length")?
//!         .call(&factory, env, Some(&hi), &[])?;
//!     assert_eq!(len, Value::Int(2));
//!     Ok(())
//! })?;
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sys`] | Raw JNI function table and runtime record layouts |
//! | [`env`] | Safe `JniEnv` wrapper, frames, reflection IDs |
//! | [`vm`] | Runtime flavor, symbol tables, offset specs |
//! | [`adapter`] | TypeAdapter registry and host values |
//! | [`factory`] | Class cache, wrappers, instances, DexFile facade |
//! | [`members`] | Member resolution |
//! | [`dispatch`] | Overload groups and invocation |
//! | [`hook`] | Method implementation replacement |
//! | [`heap`] | Dalvik heap enumeration |

pub mod adapter;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod factory;
pub mod heap;
pub mod hook;
pub mod members;
pub mod prelude;
pub mod sys;
pub mod vm;

pub use crate::error::{BridgeError, Result};

/// Routes the crate's `log` output through logcat.
///
/// Call once from the embedder's entry point; later calls are no-ops.
#[cfg(feature = "android-logging")]
pub fn init_android_logging(tag: &str) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag(tag),
    );
}
