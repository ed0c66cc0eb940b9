//! Type marshaling between host values and JNI representations.
//!
//! Every Java type name the bridge meets resolves to one [`TypeAdapter`]
//! describing its wire shape, compatibility predicate and converters. The
//! registry caches adapters by canonical name; unknown names fail with
//! [`BridgeError::UnsupportedType`].
//!
//! Names arrive in every form the reflection surface produces: primitive
//! keywords (`int`), dotted class names (`java.lang.String`), `getTypeName`
//! array suffixes (`byte[][]`), and JNI descriptors (`[I`, `Ljava/lang/String;`).
//! All of them normalize before hitting the cache.

use crate::env::{JniEnv, JType};
use crate::error::{BridgeError, Result};
use crate::factory::{ClassInstance, Factory};
use crate::sys::jni::{self, jvalue};
use std::cell::RefCell;
use std::collections::HashMap;
use std::mem::size_of;
use std::rc::Rc;

// =========================================================================
// Host values
// =========================================================================

/// A value on the host side of the bridge.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// A host string; auto-boxes into `java.lang.String` where accepted.
    Str(String),
    /// A wrapped Java instance.
    Object(Rc<ClassInstance>),
    /// A host array; marshals against primitive- and object-array adapters.
    Array(Vec<Value>),
    Void,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (Void, Void) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Object(a), Object(b)) => Rc::ptr_eq(a, b),
            (Array(a), Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// The value as a widened integer, when it is one.
    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a double, when it is numeric at all.
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

// =========================================================================
// Wire types
// =========================================================================

/// The raw shape a value takes on the JNI wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    U8,
    I8,
    U16,
    I16,
    I32,
    I64,
    F32,
    F64,
    Void,
    Pointer,
}

// =========================================================================
// Primitives
// =========================================================================

/// One Java primitive, with its marshaling monomorphized per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    pub const ALL: [Prim; 8] = [
        Prim::Boolean,
        Prim::Byte,
        Prim::Char,
        Prim::Short,
        Prim::Int,
        Prim::Long,
        Prim::Float,
        Prim::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prim::Boolean => "boolean",
            Prim::Byte => "byte",
            Prim::Char => "char",
            Prim::Short => "short",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        }
    }

    /// The JNI array descriptor letter (`[Z` and friends).
    pub fn descriptor(self) -> char {
        match self {
            Prim::Boolean => 'Z',
            Prim::Byte => 'B',
            Prim::Char => 'C',
            Prim::Short => 'S',
            Prim::Int => 'I',
            Prim::Long => 'J',
            Prim::Float => 'F',
            Prim::Double => 'D',
        }
    }

    pub fn jtype(self) -> JType {
        match self {
            Prim::Boolean => JType::Boolean,
            Prim::Byte => JType::Byte,
            Prim::Char => JType::Char,
            Prim::Short => JType::Short,
            Prim::Int => JType::Int,
            Prim::Long => JType::Long,
            Prim::Float => JType::Float,
            Prim::Double => JType::Double,
        }
    }

    pub fn wire(self) -> WireType {
        match self {
            Prim::Boolean => WireType::U8,
            Prim::Byte => WireType::I8,
            Prim::Char => WireType::U16,
            Prim::Short => WireType::I16,
            Prim::Int => WireType::I32,
            Prim::Long => WireType::I64,
            Prim::Float => WireType::F32,
            Prim::Double => WireType::F64,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            Prim::Boolean | Prim::Byte => 1,
            Prim::Char | Prim::Short => 2,
            Prim::Int | Prim::Float => 4,
            Prim::Long | Prim::Double => 8,
        }
    }

    /// Slots the value occupies in a Dalvik register frame.
    pub fn word_size(self) -> usize {
        match self {
            Prim::Long | Prim::Double => 2,
            _ => 1,
        }
    }

    fn is_compatible(self, value: &Value) -> bool {
        match self {
            Prim::Boolean => matches!(value, Value::Boolean(_)),
            Prim::Byte => value.as_i64().is_some_and(|v| (-128..=127).contains(&v)),
            Prim::Char => match value {
                // One UTF-16 code unit; anything above U+FFFF needs a pair.
                Value::Char(c) => (*c as u32) <= 0xFFFF,
                Value::Str(s) => {
                    let mut units = s.encode_utf16();
                    units.next().is_some() && units.next().is_none()
                }
                _ => false,
            },
            Prim::Short => value.as_i64().is_some_and(|v| (-32768..=32767).contains(&v)),
            Prim::Int => value
                .as_i64()
                .is_some_and(|v| (i32::MIN as i64..=i32::MAX as i64).contains(&v)),
            Prim::Long => value.as_i64().is_some(),
            Prim::Float | Prim::Double => value.as_f64().is_some(),
        }
    }

    fn to_jni(self, value: &Value) -> Result<jvalue> {
        let incompatible = || BridgeError::IncompatibleArgument {
            index: 0,
            expected: self.name().into(),
        };
        Ok(match self {
            Prim::Boolean => match value {
                Value::Boolean(b) => jvalue {
                    z: if *b { jni::JNI_TRUE } else { jni::JNI_FALSE },
                },
                _ => return Err(incompatible()),
            },
            Prim::Byte => jvalue {
                b: value.as_i64().ok_or_else(incompatible)? as i8,
            },
            Prim::Char => {
                let unit = match value {
                    Value::Char(c) => *c as u32 as u16,
                    Value::Str(s) => s.encode_utf16().next().ok_or_else(incompatible)?,
                    _ => return Err(incompatible()),
                };
                jvalue { c: unit }
            }
            Prim::Short => jvalue {
                s: value.as_i64().ok_or_else(incompatible)? as i16,
            },
            Prim::Int => jvalue {
                i: value.as_i64().ok_or_else(incompatible)? as i32,
            },
            Prim::Long => jvalue {
                j: value.as_i64().ok_or_else(incompatible)?,
            },
            Prim::Float => jvalue {
                f: value.as_f64().ok_or_else(incompatible)? as f32,
            },
            Prim::Double => jvalue {
                d: value.as_f64().ok_or_else(incompatible)?,
            },
        })
    }

    fn from_jni(self, raw: jvalue) -> Value {
        unsafe {
            match self {
                Prim::Boolean => Value::Boolean(raw.z != 0),
                Prim::Byte => Value::Byte(raw.b),
                Prim::Char => Value::Char(
                    char::from_u32(raw.c as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
                ),
                Prim::Short => Value::Short(raw.s),
                Prim::Int => Value::Int(raw.i),
                Prim::Long => Value::Long(raw.j),
                Prim::Float => Value::Float(raw.f),
                Prim::Double => Value::Double(raw.d),
            }
        }
    }

    /// Reads element `index` out of a pinned array buffer.
    ///
    /// # Safety
    /// `buf` must point at least `index + 1` elements of this primitive.
    pub unsafe fn memory_read(self, buf: *const u8, index: usize) -> Value {
        unsafe {
            match self {
                Prim::Boolean => Value::Boolean(*buf.add(index) != 0),
                Prim::Byte => Value::Byte(buf.add(index).cast::<i8>().read()),
                Prim::Char => Value::Char(
                    char::from_u32(buf.cast::<u16>().add(index).read_unaligned() as u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER),
                ),
                Prim::Short => Value::Short(buf.cast::<i16>().add(index).read_unaligned()),
                Prim::Int => Value::Int(buf.cast::<i32>().add(index).read_unaligned()),
                Prim::Long => Value::Long(buf.cast::<i64>().add(index).read_unaligned()),
                Prim::Float => Value::Float(buf.cast::<f32>().add(index).read_unaligned()),
                Prim::Double => Value::Double(buf.cast::<f64>().add(index).read_unaligned()),
            }
        }
    }

    /// Writes a compatible value into element `index` of a scratch buffer.
    ///
    /// # Safety
    /// `buf` must have room for at least `index + 1` elements.
    pub unsafe fn memory_write(self, buf: *mut u8, index: usize, value: &Value) -> Result<()> {
        let raw = self.to_jni(value)?;
        unsafe {
            match self {
                Prim::Boolean => *buf.add(index) = raw.z,
                Prim::Byte => buf.add(index).cast::<i8>().write(raw.b),
                Prim::Char => buf.cast::<u16>().add(index).write_unaligned(raw.c),
                Prim::Short => buf.cast::<i16>().add(index).write_unaligned(raw.s),
                Prim::Int => buf.cast::<i32>().add(index).write_unaligned(raw.i),
                Prim::Long => buf.cast::<i64>().add(index).write_unaligned(raw.j),
                Prim::Float => buf.cast::<f32>().add(index).write_unaligned(raw.f),
                Prim::Double => buf.cast::<f64>().add(index).write_unaligned(raw.d),
            }
        }
        Ok(())
    }

    fn from_descriptor(c: char) -> Option<Prim> {
        Prim::ALL.iter().copied().find(|p| p.descriptor() == c)
    }
}

// =========================================================================
// Adapters
// =========================================================================

#[derive(Debug)]
enum AdapterKind {
    Void,
    Primitive(Prim),
    Reference,
    PrimitiveArray(Prim),
    ObjectArray { element: Rc<TypeAdapter> },
}

/// Descriptor of one Java type: wire shape, compatibility, converters.
#[derive(Debug)]
pub struct TypeAdapter {
    class_name: String,
    kind: AdapterKind,
}

impl TypeAdapter {
    /// Canonical name: `int`, `java.lang.String`, `int[]`, `java.lang.String[]`.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn wire(&self) -> WireType {
        match &self.kind {
            AdapterKind::Void => WireType::Void,
            AdapterKind::Primitive(p) => p.wire(),
            _ => WireType::Pointer,
        }
    }

    pub fn jtype(&self) -> JType {
        match &self.kind {
            AdapterKind::Void => JType::Void,
            AdapterKind::Primitive(p) => p.jtype(),
            _ => JType::Object,
        }
    }

    pub fn byte_size(&self) -> usize {
        match &self.kind {
            AdapterKind::Void => 0,
            AdapterKind::Primitive(p) => p.byte_size(),
            _ => size_of::<jni::jobject>(),
        }
    }

    /// Slots in a Dalvik register frame.
    pub fn word_size(&self) -> usize {
        match &self.kind {
            AdapterKind::Void => 0,
            AdapterKind::Primitive(p) => p.word_size(),
            _ => 1,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, AdapterKind::Primitive(_) | AdapterKind::Void)
    }

    /// Whether `to_jni`/`from_jni` can leave a local reference behind,
    /// which is what the local-frame sizing has to budget for.
    pub fn allocates_local(&self) -> bool {
        match &self.kind {
            AdapterKind::Void | AdapterKind::Primitive(_) => false,
            AdapterKind::Reference | AdapterKind::PrimitiveArray(_)
            | AdapterKind::ObjectArray { .. } => true,
        }
    }

    /// Whether a host value can ride this type at all.
    pub fn is_compatible(&self, value: &Value) -> bool {
        match &self.kind {
            AdapterKind::Void => matches!(value, Value::Void),
            AdapterKind::Primitive(p) => p.is_compatible(value),
            AdapterKind::Reference => match value {
                Value::Null | Value::Object(_) => true,
                Value::Str(_) => {
                    self.class_name == "java.lang.String"
                        || self.class_name == "java.lang.CharSequence"
                }
                _ => false,
            },
            AdapterKind::PrimitiveArray(p) => match value {
                Value::Null => true,
                Value::Array(xs) => xs.iter().all(|x| p.is_compatible(x)),
                _ => false,
            },
            AdapterKind::ObjectArray { element } => match value {
                Value::Null => true,
                Value::Array(xs) => xs.iter().all(|x| element.is_compatible(x)),
                _ => false,
            },
        }
    }

    /// Marshals a host value into its JNI representation.
    ///
    /// Reference-shaped results may allocate exactly one local in the
    /// caller's frame; primitives never touch the reference table.
    pub fn to_jni(&self, env: &JniEnv, factory: &Factory, value: &Value) -> Result<jvalue> {
        match &self.kind {
            AdapterKind::Void => Ok(jvalue::default()),
            AdapterKind::Primitive(p) => p.to_jni(value),
            AdapterKind::Reference => match value {
                Value::Null => Ok(jvalue { l: std::ptr::null_mut() }),
                Value::Str(s) => {
                    let jstr = env
                        .new_string_utf(s)
                        .ok_or_else(|| env.check_exception().err().unwrap_or(BridgeError::OutOfMemory))?;
                    Ok(jvalue { l: jstr })
                }
                Value::Object(instance) => Ok(jvalue { l: instance.handle() }),
                _ => Err(BridgeError::IncompatibleArgument {
                    index: 0,
                    expected: self.class_name.clone(),
                }),
            },
            AdapterKind::PrimitiveArray(p) => self.primitive_array_to_jni(env, *p, value),
            AdapterKind::ObjectArray { element } => {
                self.object_array_to_jni(env, factory, element, value)
            }
        }
    }

    /// Marshals a JNI value back into a host value.
    ///
    /// `receiver` preserves identity: a handle equal to the receiver's own
    /// comes back as the same wrapped instance. `unbox` turns
    /// `java.lang.String` handles into host strings.
    pub fn from_jni(
        &self,
        env: &JniEnv,
        factory: &Factory,
        raw: jvalue,
        receiver: Option<&Rc<ClassInstance>>,
        unbox: bool,
    ) -> Result<Value> {
        match &self.kind {
            AdapterKind::Void => Ok(Value::Void),
            AdapterKind::Primitive(p) => Ok(p.from_jni(raw)),
            AdapterKind::Reference => {
                let handle = unsafe { raw.l };
                if handle.is_null() {
                    return Ok(Value::Null);
                }
                if unbox && self.class_name == "java.lang.String" {
                    let s = env
                        .get_string_utf(handle)
                        .ok_or_else(|| BridgeError::IncompatibleReturn(self.class_name.clone()))?;
                    return Ok(Value::Str(s));
                }
                if let Some(recv) = receiver {
                    if env.is_same_object(handle, recv.handle()) {
                        return Ok(Value::Object(Rc::clone(recv)));
                    }
                }
                let instance = factory.wrap(env, &self.class_name, handle)?;
                Ok(Value::Object(instance))
            }
            AdapterKind::PrimitiveArray(p) => self.primitive_array_from_jni(env, *p, raw),
            AdapterKind::ObjectArray { element } => {
                self.object_array_from_jni(env, factory, element, raw)
            }
        }
    }

    fn primitive_array_to_jni(&self, env: &JniEnv, p: Prim, value: &Value) -> Result<jvalue> {
        let xs = match value {
            Value::Null => return Ok(jvalue { l: std::ptr::null_mut() }),
            Value::Array(xs) => xs,
            _ => {
                return Err(BridgeError::IncompatibleArgument {
                    index: 0,
                    expected: self.class_name.clone(),
                })
            }
        };
        let array = env
            .new_primitive_array(p.jtype(), xs.len())
            .ok_or(BridgeError::OutOfMemory)?;
        env.check_exception()?;
        if !xs.is_empty() {
            let mut scratch = vec![0u8; xs.len() * p.byte_size()];
            for (i, x) in xs.iter().enumerate() {
                unsafe { p.memory_write(scratch.as_mut_ptr(), i, x)? };
            }
            unsafe {
                env.set_primitive_array_region(p.jtype(), array, xs.len(), scratch.as_ptr() as _);
            }
            env.check_exception()?;
        }
        Ok(jvalue { l: array })
    }

    fn primitive_array_from_jni(&self, env: &JniEnv, p: Prim, raw: jvalue) -> Result<Value> {
        let array = unsafe { raw.l };
        if array.is_null() {
            return Ok(Value::Null);
        }
        let len = env.get_array_length(array);
        let elems = env.get_primitive_array_elements(p.jtype(), array);
        if elems.is_null() {
            env.check_exception()?;
            return Err(BridgeError::OutOfMemory);
        }
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(unsafe { p.memory_read(elems as *const u8, i) });
        }
        // Plain read-out; JNI_ABORT skips the useless copy-back.
        env.release_primitive_array_elements(p.jtype(), array, elems, jni::JNI_ABORT);
        env.check_exception()?;
        Ok(Value::Array(out))
    }

    fn object_array_to_jni(
        &self,
        env: &JniEnv,
        factory: &Factory,
        element: &Rc<TypeAdapter>,
        value: &Value,
    ) -> Result<jvalue> {
        let xs = match value {
            Value::Null => return Ok(jvalue { l: std::ptr::null_mut() }),
            Value::Array(xs) => xs,
            _ => {
                return Err(BridgeError::IncompatibleArgument {
                    index: 0,
                    expected: self.class_name.clone(),
                })
            }
        };
        let element_class = factory.resolve_class_handle(env, element.class_name())?;
        let array = env
            .new_object_array(xs.len(), element_class, std::ptr::null_mut())
            .ok_or(BridgeError::OutOfMemory)?;
        env.check_exception()?;
        for (i, x) in xs.iter().enumerate() {
            if !element.is_compatible(x) {
                return Err(BridgeError::IncompatibleArgument {
                    index: i,
                    expected: element.class_name().into(),
                });
            }
            let raw = element.to_jni(env, factory, x)?;
            let handle = unsafe { raw.l };
            env.set_object_array_element(array, i, handle);
            env.check_exception()?;
            // A string element allocated a fresh local; drop it now that
            // the array owns the reference.
            if element.allocates_local() && !handle.is_null() && matches!(x, Value::Str(_)) {
                env.delete_local_ref(handle);
            }
        }
        env.delete_local_ref(element_class);
        Ok(jvalue { l: array })
    }

    fn object_array_from_jni(
        &self,
        env: &JniEnv,
        factory: &Factory,
        element: &Rc<TypeAdapter>,
        raw: jvalue,
    ) -> Result<Value> {
        let array = unsafe { raw.l };
        if array.is_null() {
            return Ok(Value::Null);
        }
        let len = env.get_array_length(array);
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let handle = env.get_object_array_element(array, i);
            env.check_exception()?;
            let value = element.from_jni(env, factory, jvalue { l: handle }, None, true)?;
            if !handle.is_null() {
                env.delete_local_ref(handle);
            }
            out.push(value);
        }
        Ok(Value::Array(out))
    }
}

// =========================================================================
// Registry
// =========================================================================

/// Name-keyed adapter cache.
pub struct AdapterRegistry {
    cache: RefCell<HashMap<String, Rc<TypeAdapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        AdapterRegistry {
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves a type name to its adapter, caching the result.
    pub fn get(&self, name: &str) -> Result<Rc<TypeAdapter>> {
        let canonical = canonicalize(name).ok_or_else(|| BridgeError::UnsupportedType(name.into()))?;
        if let Some(adapter) = self.cache.borrow().get(&canonical) {
            return Ok(Rc::clone(adapter));
        }
        let adapter = Rc::new(self.build(&canonical)?);
        self.cache
            .borrow_mut()
            .insert(canonical, Rc::clone(&adapter));
        Ok(adapter)
    }

    /// The adapter for an array whose elements are `element`.
    pub fn array_of(&self, element: &TypeAdapter) -> Result<Rc<TypeAdapter>> {
        self.get(&format!("{}[]", element.class_name()))
    }

    fn build(&self, canonical: &str) -> Result<TypeAdapter> {
        if canonical == "void" {
            return Ok(TypeAdapter {
                class_name: canonical.into(),
                kind: AdapterKind::Void,
            });
        }
        if let Some(p) = Prim::ALL.iter().copied().find(|p| p.name() == canonical) {
            return Ok(TypeAdapter {
                class_name: canonical.into(),
                kind: AdapterKind::Primitive(p),
            });
        }
        if let Some(element_name) = canonical.strip_suffix("[]") {
            if let Some(p) = Prim::ALL.iter().copied().find(|p| p.name() == element_name) {
                return Ok(TypeAdapter {
                    class_name: canonical.into(),
                    kind: AdapterKind::PrimitiveArray(p),
                });
            }
            let element = self.get(element_name)?;
            return Ok(TypeAdapter {
                class_name: canonical.into(),
                kind: AdapterKind::ObjectArray { element },
            });
        }
        Ok(TypeAdapter {
            class_name: canonical.into(),
            kind: AdapterKind::Reference,
        })
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizes any accepted spelling to the canonical `getTypeName` form.
///
/// Returns `None` for spellings that can't be a Java type at all; semantic
/// unknowns (a class that doesn't exist) surface later, at resolution time.
fn canonicalize(name: &str) -> Option<String> {
    // Erase generics: java.util.List<java.lang.String> -> java.util.List.
    let name = match name.find('<') {
        Some(lt) => {
            let gt = name.rfind('>')?;
            format!("{}{}", &name[..lt], &name[gt + 1..])
        }
        None => name.to_string(),
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    // JNI descriptor forms.
    if let Some(rest) = name.strip_prefix('[') {
        return Some(format!("{}[]", canonicalize_descriptor(rest)?));
    }
    if name.starts_with('L') && name.ends_with(';') && name.len() > 2 {
        return Some(name[1..name.len() - 1].replace('/', "."));
    }

    // getTypeName array suffixes recurse on the element.
    if let Some(element) = name.strip_suffix("[]") {
        return Some(format!("{}[]", canonicalize(element)?));
    }

    Some(name.replace('/', "."))
}

/// Canonicalizes the element part of a `[`-prefixed descriptor.
fn canonicalize_descriptor(rest: &str) -> Option<String> {
    if let Some(inner) = rest.strip_prefix('[') {
        return Some(format!("{}[]", canonicalize_descriptor(inner)?));
    }
    if rest.len() == 1 {
        return Prim::from_descriptor(rest.chars().next()?).map(|p| p.name().to_string());
    }
    if rest.starts_with('L') && rest.ends_with(';') && rest.len() > 2 {
        return Some(rest[1..rest.len() - 1].replace('/', "."));
    }
    None
}
