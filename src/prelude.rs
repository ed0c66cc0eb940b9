//! Convenience re-exports for embedders.

pub use crate::adapter::{AdapterRegistry, Prim, TypeAdapter, Value, WireType};
pub use crate::dispatch::{CtorStyle, MethodDesc, MethodKind, OverloadGroup};
pub use crate::env::{FrameGuard, InvokeStyle, JType, JniEnv};
pub use crate::error::{BridgeError, Result};
pub use crate::factory::{ClassInstance, ClassWrapper, DexFile, Factory};
pub use crate::heap::{choose, ScanControl};
pub use crate::members::{FieldDesc, Members, Property};
pub use crate::hook::ReplacementScope;
pub use crate::vm::{ArtApi, DalvikApi, RuntimeFlavor, VmApi};
