//! Bridge-wide error type.
//!
//! Every fallible operation in the crate funnels into [`BridgeError`]; the
//! variants mirror the distinct failure surfaces a caller can act on.

use crate::sys::jni::jthrowable;
use thiserror::Error;

/// Main error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The class name did not resolve, through `FindClass` or the loader.
    #[error("class '{0}' not found")]
    ClassNotFound(String),

    /// No method or field of that name on the class or its ancestors.
    #[error("no member '{name}' on {class}")]
    NoSuchMember { class: String, name: String },

    /// No overload matched the arity or the argument types.
    #[error("no overload of '{name}' matching {detail}")]
    NoSuchOverload { name: String, detail: String },

    /// `implementation` touched on a multi-overload group.
    #[error("'{0}' has multiple overloads; select one with overload(...) before touching its implementation")]
    AmbiguousOverload(String),

    /// `implementation` touched on a constructor dispatcher.
    #[error("constructors cannot be replaced; hook the underlying <init> method")]
    ConstructorNotReplaceable,

    /// The handle is not an instance of the target class.
    #[error("handle is not an instance of {0}")]
    BadCast(String),

    /// An argument failed its type adapter's compatibility check.
    #[error("argument {index} is not assignable to {expected}")]
    IncompatibleArgument { index: usize, expected: String },

    /// A replacement returned a value the declared return type rejects.
    #[error("replacement returned a value incompatible with {0}")]
    IncompatibleReturn(String),

    /// The type name has no adapter.
    #[error("unsupported type '{0}'")]
    UnsupportedType(String),

    /// A Java exception is pending; the handle is a local reference the
    /// caller may re-throw or inspect before its frame unwinds.
    #[error("java exception pending")]
    JavaException(ThrowableHandle),

    /// The ART offset tables for this runtime version were not supplied.
    #[error("no ArtMethod/Runtime offset spec for this runtime")]
    VmSpecMissing,

    /// The class linker has no generic JNI trampoline to borrow.
    #[error("quickGenericJniTrampoline not found")]
    TrampolineNotFound,

    /// `PushLocalFrame` failed.
    #[error("out of memory pushing a local reference frame")]
    OutOfMemory,

    /// Heap enumeration is only implemented for the Dalvik runtime.
    #[error("heap scanning is not supported on this runtime")]
    HeapScanUnsupported,
}

/// Result alias used throughout the bridge.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// A pending-exception handle carried inside [`BridgeError::JavaException`].
///
/// The pointer is a JNI local reference owned by whatever frame was live
/// when the exception surfaced; it is data, not a guard.
#[derive(Debug, Clone, Copy)]
pub struct ThrowableHandle(pub jthrowable);

// jthrowable is a thread-confined token; the error only ever travels up the
// scripting thread that produced it.
unsafe impl Send for ThrowableHandle {}
unsafe impl Sync for ThrowableHandle {}

impl BridgeError {
    /// True when the error wraps a pending Java throwable.
    pub fn is_java_exception(&self) -> bool {
        matches!(self, BridgeError::JavaException(_))
    }

    /// The pending throwable, when there is one.
    pub fn throwable(&self) -> Option<jthrowable> {
        match self {
            BridgeError::JavaException(ThrowableHandle(t)) => Some(*t),
            _ => None,
        }
    }
}
