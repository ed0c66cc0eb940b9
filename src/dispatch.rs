//! Overload grouping and invocation dispatch.
//!
//! Every member name on a wrapper resolves to one [`OverloadGroup`]; a call
//! picks the unique overload whose arity bucket and positional compatibility
//! predicates match, then runs the marshal-invoke-unmarshal sequence against
//! a precomputed argument adapter table. There is no per-call-site code
//! generation; the adapter table plus one interpreter loop is the whole
//! dispatch machine.

use crate::adapter::{TypeAdapter, Value};
use crate::env::{FrameGuard, InvokeStyle, JType, JniEnv};
use crate::error::{BridgeError, Result, ThrowableHandle};
use crate::factory::{ClassInstance, Factory};
use crate::hook::{self, HookState};
use crate::sys::jni;
use crate::vm::{self, RuntimeFlavor};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// How a method binds to its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Static,
    Instance,
}

/// What a constructor dispatcher does with its overloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorStyle {
    /// `$new`: allocate and run `<init>`.
    New,
    /// `$init`: run `<init>` on an already-allocated instance.
    Init,
}

/// One resolved Java method (or constructor).
pub struct MethodDesc {
    pub name: String,
    pub kind: MethodKind,
    pub method_id: jni::jmethodID,
    /// The declaring wrapper's pinned class object.
    pub holder_class: jni::jclass,
    pub holder_name: String,
    pub ret: Rc<TypeAdapter>,
    pub args: Vec<Rc<TypeAdapter>>,
    /// Synthetic zero-arg `valueOf` overload: answers with the receiver.
    pub returns_receiver: bool,
    /// The element adapter of the trailing array parameter, for varargs
    /// methods; drives promotion of loose trailing arguments.
    pub varargs_element: Option<Rc<TypeAdapter>>,
    /// Hook bookkeeping; untouched until an implementation is installed.
    pub hook: RefCell<HookState>,
    /// Native thread ids currently inside the replacement body. Shared with
    /// the trampoline through [`hook::ReplacementScope`], which runs on
    /// arbitrary VM threads.
    pub pending: Arc<Mutex<HashSet<i64>>>,
}

impl MethodDesc {
    /// Formats the argument type list the way `overload(...)` errors do.
    pub fn signature(&self) -> String {
        let names: Vec<&str> = self.args.iter().map(|a| a.class_name()).collect();
        format!("({})", names.join(", "))
    }

    /// True when every positional compatibility predicate accepts.
    pub fn can_invoke_with(&self, args: &[Value]) -> bool {
        self.args.len() == args.len()
            && self
                .args
                .iter()
                .zip(args.iter())
                .all(|(adapter, value)| adapter.is_compatible(value))
    }

    /// Rewrites `m(1, "a", "b")` into `m(1, ["a", "b"])` when this overload
    /// is varargs and every piece fits. `None` means no promotion applies.
    pub fn promote_varargs(&self, args: &[Value]) -> Option<Vec<Value>> {
        let element = self.varargs_element.as_ref()?;
        let fixed = self.args.len().checked_sub(1)?;
        if args.len() < fixed {
            return None;
        }
        if !self.args[..fixed]
            .iter()
            .zip(args.iter())
            .all(|(a, v)| a.is_compatible(v))
        {
            return None;
        }
        let tail = &args[fixed..];
        if !tail.iter().all(|v| element.is_compatible(v)) {
            return None;
        }
        let mut promoted = args[..fixed].to_vec();
        promoted.push(Value::Array(tail.to_vec()));
        Some(promoted)
    }

    pub fn is_hooked(&self) -> bool {
        self.hook.borrow().replacement.is_some()
    }

    /// Whether the current native thread is inside this method's
    /// replacement body.
    pub fn current_thread_reentered(&self) -> bool {
        self.is_hooked()
            && self
                .pending
                .lock()
                .map(|set| set.contains(&vm::current_thread_id()))
                .unwrap_or(false)
    }

    /// Invokes this overload. `style` carries the constructor mode for
    /// `<init>` descriptors and is `None` for plain methods.
    pub fn invoke(
        &self,
        factory: &Factory,
        env: &JniEnv,
        receiver: Option<&Rc<ClassInstance>>,
        args: &[Value],
        style: Option<CtorStyle>,
    ) -> Result<Value> {
        if self.returns_receiver {
            let recv = receiver.ok_or_else(|| self.missing_receiver())?;
            return Ok(Value::Object(Rc::clone(recv)));
        }

        // 2 slots for the receiver/result pair, one per reference-shaped
        // argument, one more if return marshaling can allocate.
        let arg_locals = self.args.iter().filter(|a| a.allocates_local()).count();
        let ret_locals = usize::from(self.ret.allocates_local());
        let frame = env.push_frame(2 + arg_locals + ret_locals)?;

        let mut raw_args = Vec::with_capacity(args.len());
        let mut marshal_err = None;
        for (i, (adapter, value)) in self.args.iter().zip(args.iter()).enumerate() {
            match adapter.to_jni(env, factory, value) {
                Ok(raw) => raw_args.push(raw),
                Err(e) => {
                    marshal_err = Some(reindex_argument(e, i));
                    break;
                }
            }
        }
        if let Some(e) = marshal_err {
            return Err(escalate(env, frame, e));
        }

        let raw_ret = match (self.kind, style) {
            (MethodKind::Constructor, Some(CtorStyle::New) | None) => {
                let obj = env.new_object(self.holder_class, self.method_id, &raw_args);
                if let Err(e) = env.check_exception() {
                    return Err(escalate(env, frame, e));
                }
                let instance =
                    match factory.wrap_class_ref(env, self.holder_class, &self.holder_name, obj) {
                        Ok(i) => i,
                        Err(e) => return Err(escalate(env, frame, e)),
                    };
                frame.pop();
                return Ok(Value::Object(instance));
            }
            (MethodKind::Constructor, Some(CtorStyle::Init)) => {
                let recv = match receiver {
                    Some(r) => r,
                    None => return Err(escalate(env, frame, self.missing_receiver())),
                };
                env.invoke(
                    InvokeStyle::Direct,
                    JType::Void,
                    recv.handle(),
                    self.holder_class,
                    self.method_id,
                    &raw_args,
                )
            }
            (MethodKind::Static, _) => {
                let (method_id, invoke_style) = self.reentry_route(factory.flavor());
                env.invoke(
                    invoke_style,
                    self.ret.jtype(),
                    std::ptr::null_mut(),
                    self.holder_class,
                    method_id,
                    &raw_args,
                )
            }
            (MethodKind::Instance, _) => {
                let recv = match receiver {
                    Some(r) => r,
                    None => return Err(escalate(env, frame, self.missing_receiver())),
                };
                let (method_id, invoke_style) = self.reentry_route(factory.flavor());
                if method_id != self.method_id && factory.flavor() == RuntimeFlavor::Dalvik {
                    // The private clone only resolves through a vtable that
                    // actually contains it.
                    if let Err(e) =
                        hook::dalvik::ensure_shadow_vtable(factory, env, recv.handle(), self)
                    {
                        return Err(escalate(env, frame, e));
                    }
                }
                env.invoke(
                    invoke_style,
                    self.ret.jtype(),
                    recv.handle(),
                    self.holder_class,
                    method_id,
                    &raw_args,
                )
            }
        };

        if let Err(e) = env.check_exception() {
            return Err(escalate(env, frame, e));
        }
        match self.ret.from_jni(env, factory, raw_ret, receiver, false) {
            Ok(value) => {
                frame.pop();
                Ok(value)
            }
            Err(e) => Err(escalate(env, frame, e)),
        }
    }

    /// Picks the method id and invoke style for the current thread.
    ///
    /// Outside a replacement body this is the live id with virtual (or
    /// static) dispatch. Inside one, the call has to reach the original
    /// body, which lives in the unhooked private clone: Dalvik clones
    /// resolve through the shadow-vtable slot, ART clones are free-standing
    /// records that must be called directly so the receiver's vtable never
    /// re-resolves them back to the hooked entry.
    fn reentry_route(&self, flavor: RuntimeFlavor) -> (jni::jmethodID, InvokeStyle) {
        if self.current_thread_reentered() {
            if let Some(clone_id) = self.hook.borrow().original_method_id() {
                let style = match (self.kind, flavor) {
                    (MethodKind::Static, _) => InvokeStyle::Static,
                    (_, RuntimeFlavor::Dalvik) => InvokeStyle::Virtual,
                    (_, RuntimeFlavor::Art) => InvokeStyle::Direct,
                };
                return (clone_id, style);
            }
            // No clone survives; direct dispatch is the best remaining route.
            return (self.method_id, InvokeStyle::Direct);
        }
        let style = match self.kind {
            MethodKind::Static => InvokeStyle::Static,
            _ => InvokeStyle::Virtual,
        };
        (self.method_id, style)
    }

    fn missing_receiver(&self) -> BridgeError {
        BridgeError::NoSuchOverload {
            name: self.name.clone(),
            detail: "an instance receiver is required".into(),
        }
    }
}

/// Pops the frame on an error path. A pending-exception error carries its
/// throwable across the pop so the handle stays valid in the caller's frame.
pub(crate) fn escalate(_env: &JniEnv, frame: FrameGuard<'_>, err: BridgeError) -> BridgeError {
    match err {
        BridgeError::JavaException(ThrowableHandle(t)) => {
            let carried = frame.pop_with(t);
            BridgeError::JavaException(ThrowableHandle(carried))
        }
        other => {
            frame.pop();
            other
        }
    }
}

fn reindex_argument(err: BridgeError, index: usize) -> BridgeError {
    match err {
        BridgeError::IncompatibleArgument { expected, .. } => {
            BridgeError::IncompatibleArgument { index, expected }
        }
        other => other,
    }
}

/// All overloads of one member name, bucketed by arity.
pub struct OverloadGroup {
    pub name: String,
    pub holder_name: String,
    pub ctor_style: Option<CtorStyle>,
    overloads: Vec<Rc<MethodDesc>>,
    buckets: HashMap<usize, Vec<Rc<MethodDesc>>>,
}

impl OverloadGroup {
    pub fn new(
        name: String,
        holder_name: String,
        ctor_style: Option<CtorStyle>,
        overloads: Vec<Rc<MethodDesc>>,
    ) -> Self {
        let mut buckets: HashMap<usize, Vec<Rc<MethodDesc>>> = HashMap::new();
        for m in &overloads {
            buckets.entry(m.args.len()).or_default().push(Rc::clone(m));
        }
        OverloadGroup {
            name,
            holder_name,
            ctor_style,
            overloads,
            buckets,
        }
    }

    /// The ordered overload list.
    pub fn overloads(&self) -> &[Rc<MethodDesc>] {
        &self.overloads
    }

    /// Selects exactly one overload by its argument type names.
    pub fn overload(&self, factory: &Factory, arg_type_names: &[&str]) -> Result<Rc<MethodDesc>> {
        let mut wanted = Vec::with_capacity(arg_type_names.len());
        for name in arg_type_names {
            wanted.push(factory.adapters().get(name)?);
        }
        for m in &self.overloads {
            if m.args.len() == wanted.len()
                && m.args
                    .iter()
                    .zip(wanted.iter())
                    .all(|(a, w)| a.class_name() == w.class_name())
            {
                return Ok(Rc::clone(m));
            }
        }
        Err(BridgeError::NoSuchOverload {
            name: self.name.clone(),
            detail: format!("signature ({})", arg_type_names.join(", ")),
        })
    }

    /// True when some overload would accept these arguments.
    pub fn can_invoke_with(&self, args: &[Value]) -> bool {
        self.buckets
            .get(&args.len())
            .is_some_and(|bucket| bucket.iter().any(|m| m.can_invoke_with(args)))
    }

    /// Selects and invokes the first compatible overload.
    pub fn call(
        &self,
        factory: &Factory,
        env: &JniEnv,
        receiver: Option<&Rc<ClassInstance>>,
        args: &[Value],
    ) -> Result<Value> {
        // A class-view toString answers with the wrapper's marker string
        // instead of demanding a receiver.
        if self.name == "toString" && receiver.is_none() && args.is_empty() {
            return Ok(Value::Str(format!("<{}>", self.holder_name)));
        }

        let bucket = self.buckets.get(&args.len());
        if let Some(bucket) = bucket {
            if let Some(method) = bucket.iter().find(|m| m.can_invoke_with(args)) {
                return method.invoke(factory, env, receiver, args, self.ctor_style);
            }
        }

        // No exact match; a varargs overload may still absorb the tail.
        for method in &self.overloads {
            if let Some(promoted) = method.promote_varargs(args) {
                return method.invoke(factory, env, receiver, &promoted, self.ctor_style);
            }
        }

        Err(BridgeError::NoSuchOverload {
            name: self.name.clone(),
            detail: if bucket.is_none() {
                format!("arity {}", args.len())
            } else {
                format!("argument types (arity {})", args.len())
            },
        })
    }

    /// The single overload, or `AmbiguousOverload` when there are several.
    pub fn single(&self) -> Result<&Rc<MethodDesc>> {
        if self.overloads.len() == 1 {
            Ok(&self.overloads[0])
        } else {
            Err(BridgeError::AmbiguousOverload(format!(
                "{}.{}",
                self.holder_name, self.name
            )))
        }
    }

    /// The installed replacement, if any (single-overload groups only).
    pub fn implementation(&self) -> Result<Option<*mut c_void>> {
        Ok(self.single()?.hook.borrow().replacement)
    }

    /// Installs (`Some`) or clears (`None`) the replacement for the single
    /// overload. Constructor dispatchers always refuse; hook the underlying
    /// `<init>` descriptor through its own group instead.
    pub fn set_implementation(&self, factory: &Factory, code: Option<*mut c_void>) -> Result<()> {
        if self.ctor_style.is_some() {
            return Err(BridgeError::ConstructorNotReplaceable);
        }
        let method = self.single()?;
        match code {
            Some(code) => hook::install(factory, method, code),
            None => hook::uninstall(factory, method),
        }
    }
}
