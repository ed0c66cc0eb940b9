//! Member resolution: reflection-driven materialization of a wrapper's
//! method, field and constructor tables.
//!
//! Runs once per wrapper, on first member access. Everything goes through
//! the cached reflective IDs in [`crate::env::Reflect`]; the results are
//! grouped into [`OverloadGroup`]s and merged field/method properties.

use crate::adapter::{TypeAdapter, Value};
use crate::dispatch::{escalate, CtorStyle, MethodDesc, MethodKind, OverloadGroup};
use crate::env::{JniEnv, Reflect};
use crate::error::{BridgeError, Result};
use crate::factory::{ClassInstance, ClassWrapper, Factory};
use crate::hook::HookState;
use crate::sys::jni;
use log::debug;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// One name on a wrapper: a method group, a field, or (merged) both.
pub struct Property {
    pub method: Option<Rc<OverloadGroup>>,
    pub field: Option<Rc<FieldDesc>>,
}

/// A wrapper's materialized member table.
pub struct Members {
    pub properties: HashMap<String, Property>,
    /// `<init>` overloads that allocate and construct (`$new`).
    pub ctor_new: Rc<OverloadGroup>,
    /// The same `<init>` overloads, run on an existing allocation (`$init`).
    pub ctor_init: Rc<OverloadGroup>,
}

/// One resolved Java field.
pub struct FieldDesc {
    pub name: String,
    pub is_static: bool,
    pub field_id: jni::jfieldID,
    pub holder_class: jni::jclass,
    pub holder_name: String,
    pub adapter: Rc<TypeAdapter>,
}

impl FieldDesc {
    /// Reads the field, marshaling through the adapter.
    pub fn get(
        &self,
        factory: &Factory,
        env: &JniEnv,
        receiver: Option<&Rc<ClassInstance>>,
    ) -> Result<Value> {
        let frame = env.push_frame(2 + usize::from(self.adapter.allocates_local()))?;
        let target = match self.target(receiver) {
            Ok(t) => t,
            Err(e) => return Err(escalate(env, frame, e)),
        };
        let raw = env.get_field_raw(self.is_static, self.adapter.jtype(), target, self.field_id);
        if let Err(e) = env.check_exception() {
            return Err(escalate(env, frame, e));
        }
        match self.adapter.from_jni(env, factory, raw, receiver, false) {
            Ok(value) => {
                frame.pop();
                Ok(value)
            }
            Err(e) => Err(escalate(env, frame, e)),
        }
    }

    /// Writes the field after a compatibility check.
    pub fn set(
        &self,
        factory: &Factory,
        env: &JniEnv,
        receiver: Option<&Rc<ClassInstance>>,
        value: &Value,
    ) -> Result<()> {
        if !self.adapter.is_compatible(value) {
            return Err(BridgeError::IncompatibleArgument {
                index: 0,
                expected: self.adapter.class_name().into(),
            });
        }
        let frame = env.push_frame(2 + usize::from(self.adapter.allocates_local()))?;
        let target = match self.target(receiver) {
            Ok(t) => t,
            Err(e) => return Err(escalate(env, frame, e)),
        };
        let raw = match self.adapter.to_jni(env, factory, value) {
            Ok(r) => r,
            Err(e) => return Err(escalate(env, frame, e)),
        };
        env.set_field_raw(self.is_static, self.adapter.jtype(), target, self.field_id, raw);
        if let Err(e) = env.check_exception() {
            return Err(escalate(env, frame, e));
        }
        frame.pop();
        Ok(())
    }

    fn target(&self, receiver: Option<&Rc<ClassInstance>>) -> Result<jni::jobject> {
        if self.is_static {
            return Ok(self.holder_class);
        }
        receiver
            .map(|r| r.handle())
            .ok_or_else(|| BridgeError::NoSuchOverload {
                name: self.name.clone(),
                detail: "an instance receiver is required".into(),
            })
    }
}

/// Materializes the member table of `wrapper`.
pub fn materialize(factory: &Factory, env: &JniEnv, wrapper: &ClassWrapper) -> Result<Members> {
    let reflect = factory.reflect(env)?;
    let holder_class = wrapper.class_ref();
    let holder_name = wrapper.name().to_string();

    let frame = env.push_frame(16)?;
    let result = materialize_inner(factory, env, reflect, holder_class, &holder_name);
    match result {
        Ok(members) => {
            frame.pop();
            debug!(
                "materialized {} members on {}",
                members.properties.len(),
                holder_name
            );
            Ok(members)
        }
        Err(e) => Err(escalate(env, frame, e)),
    }
}

fn materialize_inner(
    factory: &Factory,
    env: &JniEnv,
    reflect: &Reflect,
    holder_class: jni::jclass,
    holder_name: &str,
) -> Result<Members> {
    let mut method_lists: HashMap<String, Vec<Rc<MethodDesc>>> = HashMap::new();
    let mut method_order: Vec<String> = Vec::new();

    // ---- declared methods ----
    let methods_arr = env.call_object_method(holder_class, reflect.class_get_declared_methods, &[]);
    env.check_exception()?;
    for i in 0..env.get_array_length(methods_arr) {
        let m = env.get_object_array_element(methods_arr, i);
        env.check_exception()?;

        let name = read_string_via(env, m, reflect.method_get_name)?;
        let modifiers = env.call_int_method(m, reflect.method_get_modifiers, &[]);
        env.check_exception()?;
        let is_static = modifiers & reflect.modifier_static != 0;
        let is_varargs = env.call_boolean_method(m, reflect.method_is_var_args, &[]);
        env.check_exception()?;

        let ret_name = {
            let t = env.call_object_method(m, reflect.method_get_generic_return_type, &[]);
            env.check_exception()?;
            let n = read_string_via(env, t, reflect.type_get_type_name)?;
            env.delete_local_ref(t);
            n
        };
        let arg_names = read_type_names(env, reflect, m, reflect.method_get_generic_parameter_types)?;

        let method_id = env.from_reflected_method(m);
        env.delete_local_ref(m);

        let desc = build_method(
            factory,
            MethodBuild {
                name: name.clone(),
                kind: if is_static {
                    MethodKind::Static
                } else {
                    MethodKind::Instance
                },
                method_id,
                holder_class,
                holder_name,
                ret_name: &ret_name,
                arg_names: &arg_names,
                is_varargs,
            },
        )?;

        if !method_lists.contains_key(&name) {
            method_order.push(name.clone());
        }
        method_lists.entry(name).or_default().push(desc);
    }
    env.delete_local_ref(methods_arr);

    // valueOf without a zero-arg instance overload gains a synthetic one
    // answering with the receiver.
    if let Some(list) = method_lists.get_mut("valueOf") {
        let has_plain = list
            .iter()
            .any(|m| m.kind == MethodKind::Instance && m.args.is_empty());
        if !has_plain {
            list.push(Rc::new(MethodDesc {
                name: "valueOf".into(),
                kind: MethodKind::Instance,
                method_id: std::ptr::null_mut(),
                holder_class,
                holder_name: holder_name.to_string(),
                ret: factory.adapters().get("int")?,
                args: Vec::new(),
                returns_receiver: true,
                varargs_element: None,
                hook: RefCell::new(HookState::new()),
                pending: Arc::new(Mutex::new(HashSet::new())),
            }));
        }
    }

    // ---- declared fields ----
    let mut fields: HashMap<String, Rc<FieldDesc>> = HashMap::new();
    let fields_arr = env.call_object_method(holder_class, reflect.class_get_declared_fields, &[]);
    env.check_exception()?;
    for i in 0..env.get_array_length(fields_arr) {
        let f = env.get_object_array_element(fields_arr, i);
        env.check_exception()?;

        let name = read_string_via(env, f, reflect.field_get_name)?;
        let modifiers = env.call_int_method(f, reflect.field_get_modifiers, &[]);
        env.check_exception()?;
        let type_name = {
            let t = env.call_object_method(f, reflect.field_get_generic_type, &[]);
            env.check_exception()?;
            let n = read_string_via(env, t, reflect.type_get_type_name)?;
            env.delete_local_ref(t);
            n
        };
        let field_id = env.from_reflected_field(f);
        env.delete_local_ref(f);

        fields.insert(
            name.clone(),
            Rc::new(FieldDesc {
                name,
                is_static: modifiers & reflect.modifier_static != 0,
                field_id,
                holder_class,
                holder_name: holder_name.to_string(),
                adapter: factory.adapters().get(&type_name)?,
            }),
        );
    }
    env.delete_local_ref(fields_arr);

    // ---- declared constructors ----
    let mut ctors: Vec<Rc<MethodDesc>> = Vec::new();
    let ctors_arr =
        env.call_object_method(holder_class, reflect.class_get_declared_constructors, &[]);
    env.check_exception()?;
    for i in 0..env.get_array_length(ctors_arr) {
        let c = env.get_object_array_element(ctors_arr, i);
        env.check_exception()?;

        let arg_names = read_type_names(env, reflect, c, reflect.ctor_get_generic_parameter_types)?;
        let is_varargs = env.call_boolean_method(c, reflect.ctor_is_var_args, &[]);
        env.check_exception()?;
        let method_id = env.from_reflected_method(c);
        env.delete_local_ref(c);

        ctors.push(build_method(
            factory,
            MethodBuild {
                name: "<init>".into(),
                kind: MethodKind::Constructor,
                method_id,
                holder_class,
                holder_name,
                ret_name: holder_name,
                arg_names: &arg_names,
                is_varargs,
            },
        )?);
    }
    env.delete_local_ref(ctors_arr);

    // ---- assemble ----
    let mut properties = HashMap::new();
    for name in method_order {
        let list = method_lists.remove(&name).unwrap_or_default();
        let group = Rc::new(OverloadGroup::new(
            name.clone(),
            holder_name.to_string(),
            None,
            list,
        ));
        properties.insert(
            name.clone(),
            Property {
                method: Some(group),
                field: fields.remove(&name),
            },
        );
    }
    for (name, field) in fields {
        properties.insert(
            name,
            Property {
                method: None,
                field: Some(field),
            },
        );
    }

    let ctor_new = Rc::new(OverloadGroup::new(
        "$new".into(),
        holder_name.to_string(),
        Some(CtorStyle::New),
        ctors.clone(),
    ));
    let ctor_init = Rc::new(OverloadGroup::new(
        "$init".into(),
        holder_name.to_string(),
        Some(CtorStyle::Init),
        ctors,
    ));

    Ok(Members {
        properties,
        ctor_new,
        ctor_init,
    })
}

struct MethodBuild<'a> {
    name: String,
    kind: MethodKind,
    method_id: jni::jmethodID,
    holder_class: jni::jclass,
    holder_name: &'a str,
    ret_name: &'a str,
    arg_names: &'a [String],
    is_varargs: bool,
}

fn build_method(factory: &Factory, b: MethodBuild<'_>) -> Result<Rc<MethodDesc>> {
    let registry = factory.adapters();
    let mut args = Vec::with_capacity(b.arg_names.len());
    for name in b.arg_names {
        args.push(registry.get(name)?);
    }

    let mut varargs_element = None;
    if b.is_varargs {
        if let Some(last) = args.last_mut() {
            // Reflection already reports the trailing parameter in array
            // form; normalize if it ever arrives as the bare element.
            if !last.class_name().ends_with("[]") {
                let promoted = registry.array_of(last)?;
                *last = promoted;
            }
            let element_name = last
                .class_name()
                .strip_suffix("[]")
                .unwrap_or(last.class_name())
                .to_string();
            varargs_element = Some(registry.get(&element_name)?);
        }
    }

    Ok(Rc::new(MethodDesc {
        name: b.name,
        kind: b.kind,
        method_id: b.method_id,
        holder_class: b.holder_class,
        holder_name: b.holder_name.to_string(),
        ret: registry.get(b.ret_name)?,
        args,
        returns_receiver: false,
        varargs_element,
        hook: RefCell::new(HookState::new()),
        pending: Arc::new(Mutex::new(HashSet::new())),
    }))
}

/// Calls a string-returning reflective method and reads the result out.
fn read_string_via(env: &JniEnv, obj: jni::jobject, method_id: jni::jmethodID) -> Result<String> {
    let s = env.call_object_method(obj, method_id, &[]);
    env.check_exception()?;
    let out = env
        .get_string_utf(s)
        .ok_or_else(|| BridgeError::UnsupportedType("<unreadable name>".into()))?;
    env.delete_local_ref(s);
    Ok(out)
}

/// Reads a `Type[]`-returning reflective accessor into type names.
fn read_type_names(
    env: &JniEnv,
    reflect: &Reflect,
    obj: jni::jobject,
    accessor: jni::jmethodID,
) -> Result<Vec<String>> {
    let arr = env.call_object_method(obj, accessor, &[]);
    env.check_exception()?;
    let len = env.get_array_length(arr);
    let mut names = Vec::with_capacity(len);
    for i in 0..len {
        let t = env.get_object_array_element(arr, i);
        env.check_exception()?;
        let name = read_string_via(env, t, reflect.type_get_type_name)?;
        env.delete_local_ref(t);
        names.push(name);
    }
    env.delete_local_ref(arr);
    Ok(names)
}
