//! Synthetic JNI environment for driving the bridge without a VM.
//!
//! A [`TestVm`] owns a fake object heap (classes, strings, instances,
//! arrays, reflection objects), a real `JNINativeInterface_` whose slots are
//! implemented over that heap, and the local-frame / global-reference
//! accounting the bridge's lifecycle invariants are asserted against.
//!
//! Classes are registered per test through [`ClassSpec`]; method bodies are
//! host closures receiving a [`MockCtx`]. The reflection surface
//! (`getDeclaredMethods`, `getTypeName`, `Modifier.STATIC`, ...) is built in,
//! so `Factory::use_class` runs its real materialization path.

#![allow(dead_code)]

use artbridge::sys::art::ArtMethodSpec;
use artbridge::sys::jni::{self, jvalue};
use artbridge::vm::{ArtApi, DalvikApi, RuntimeFlavor, VmApi};
use std::cell::{Cell, RefCell, RefMut, UnsafeCell};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::rc::Rc;
use std::sync::Mutex;

pub type ObjId = usize;

// =========================================================================
// Values
// =========================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum MockVal {
    Void,
    Null,
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Obj(ObjId),
}

pub type UserFn = Rc<dyn Fn(&MockCtx, Option<ObjId>, &[MockVal]) -> MockVal>;

#[derive(Clone)]
enum Body {
    User(UserFn),
    Builtin(Builtin),
}

#[derive(Clone, Copy, Debug)]
enum Builtin {
    ClassGetName,
    ClassDeclaredMethods,
    ClassDeclaredFields,
    ClassDeclaredCtors,
    MethodGetName,
    MethodGetModifiers,
    MethodIsVarArgs,
    MethodReturnType,
    MethodParamTypes,
    FieldGetName,
    FieldGetModifiers,
    FieldGenericType,
    CtorParamTypes,
    CtorIsVarArgs,
    TypeGetTypeName,
    LoaderLoadClass,
    ObjectToString,
    StringLength,
    StringCtor,
}

const MODIFIER_STATIC: i32 = 0x0008;

// =========================================================================
// Heap model
// =========================================================================

#[repr(C)]
pub struct MethodDef {
    /// Scratch region doubling as the method's native record; hooking
    /// tests point their offset specs in here.
    pub record: UnsafeCell<[u8; 64]>,
    name: String,
    is_static: bool,
    is_varargs: bool,
    ret: String,
    params: Vec<String>,
    body: Body,
}

pub struct FieldDef {
    name: String,
    is_static: bool,
    ty: String,
}

struct ClassRt {
    name: String,
    superclass: Option<usize>,
    methods: Vec<Rc<MethodDef>>,
    ctors: Vec<Rc<MethodDef>>,
    fields: Vec<Rc<FieldDef>>,
    statics: HashMap<String, MockVal>,
    field_defaults: Vec<(String, MockVal)>,
    class_obj: ObjId,
}

#[derive(Clone)]
pub enum PrimArr {
    Z(Vec<u8>),
    B(Vec<i8>),
    C(Vec<u16>),
    S(Vec<i16>),
    I(Vec<i32>),
    J(Vec<i64>),
    F(Vec<f32>),
    D(Vec<f64>),
}

enum HeapObj {
    Class(usize),
    Str(String),
    Instance {
        class: usize,
        fields: HashMap<String, MockVal>,
    },
    PrimArray(PrimArr),
    ObjArray {
        element: usize,
        items: Vec<Option<ObjId>>,
    },
    ReflectMethod {
        class: usize,
        index: usize,
        ctor: bool,
    },
    ReflectField {
        class: usize,
        index: usize,
    },
    TypeName(String),
    Throwable(String),
}

struct RefEntry {
    obj: ObjId,
}

struct PinnedBuf {
    len: usize,
}

// =========================================================================
// VM state
// =========================================================================

pub struct VmState {
    classes: Vec<ClassRt>,
    class_by_name: HashMap<String, usize>,
    objects: Vec<HeapObj>,
    frames: Vec<Vec<*mut RefEntry>>,
    globals: Vec<*mut RefEntry>,
    weaks: Vec<*mut RefEntry>,
    pending: Option<ObjId>,
    methods: HashMap<usize, Rc<MethodDef>>,
    fields: HashMap<usize, Rc<FieldDef>>,
    cstrings: HashSet<usize>,
    wchars: HashMap<usize, PinnedBuf>,
    pinned: HashMap<usize, PinnedBuf>,
    loadable: HashSet<String>,
    call_log: Vec<String>,
    vm_ptr: *mut jni::JavaVM,
    env_ptr: *mut jni::JNIEnv,
}

impl VmState {
    fn push_obj(&mut self, obj: HeapObj) -> ObjId {
        self.objects.push(obj);
        self.objects.len() - 1
    }

    fn new_string(&mut self, s: &str) -> ObjId {
        self.push_obj(HeapObj::Str(s.to_string()))
    }

    fn alloc_ref(&mut self, obj: ObjId) -> jni::jobject {
        let entry = Box::into_raw(Box::new(RefEntry { obj }));
        self.frames
            .last_mut()
            .expect("no local frame")
            .push(entry);
        entry as jni::jobject
    }

    fn class_of(&self, obj: ObjId) -> Option<usize> {
        let idx = |name: &str| self.class_by_name.get(name).copied();
        match &self.objects[obj] {
            HeapObj::Class(_) => idx("java.lang.Class"),
            HeapObj::Str(_) => idx("java.lang.String"),
            HeapObj::Instance { class, .. } => Some(*class),
            HeapObj::ReflectMethod { ctor: false, .. } => idx("java.lang.reflect.Method"),
            HeapObj::ReflectMethod { ctor: true, .. } => idx("java.lang.reflect.Constructor"),
            HeapObj::ReflectField { .. } => idx("java.lang.reflect.Field"),
            HeapObj::TypeName(_) => idx("java.lang.reflect.Type"),
            HeapObj::Throwable(_) => idx("java.lang.RuntimeException"),
            HeapObj::PrimArray(_) | HeapObj::ObjArray { .. } => None,
        }
    }

    fn is_instance(&self, obj: ObjId, target: usize) -> bool {
        let mut current = self.class_of(obj);
        while let Some(idx) = current {
            if idx == target {
                return true;
            }
            current = self.classes[idx].superclass;
        }
        false
    }

    fn find_method(&self, class: usize, name: &str) -> Option<Rc<MethodDef>> {
        let mut current = Some(class);
        while let Some(idx) = current {
            if let Some(m) = self.classes[idx].methods.iter().find(|m| m.name == name) {
                return Some(Rc::clone(m));
            }
            current = self.classes[idx].superclass;
        }
        None
    }

    fn find_field(&self, class: usize, name: &str) -> Option<Rc<FieldDef>> {
        let mut current = Some(class);
        while let Some(idx) = current {
            if let Some(f) = self.classes[idx].fields.iter().find(|f| f.name == name) {
                return Some(Rc::clone(f));
            }
            current = self.classes[idx].superclass;
        }
        None
    }

    fn throw(&mut self, kind: &str, message: &str) {
        let obj = self.push_obj(HeapObj::Throwable(format!("{kind}: {message}")));
        self.pending = Some(obj);
    }
}

// =========================================================================
// Env / VM blocks
// =========================================================================

#[repr(C)]
struct EnvBlock {
    table: jni::JNIEnv,
    state: *const RefCell<VmState>,
}

#[repr(C)]
struct VmBlock {
    table: jni::JavaVM,
    env: *mut jni::JNIEnv,
}

fn st<'a>(env: *mut jni::JNIEnv) -> &'a RefCell<VmState> {
    unsafe { &*(*(env as *const EnvBlock)).state }
}

fn deref(handle: jni::jobject) -> ObjId {
    unsafe { (*(handle as *const RefEntry)).obj }
}

// =========================================================================
// Method invocation plumbing
// =========================================================================

pub struct MockCtx {
    env: *mut jni::JNIEnv,
}

impl MockCtx {
    fn state(&self) -> RefMut<'_, VmState> {
        st(self.env).borrow_mut()
    }

    pub fn string(&self, v: &MockVal) -> Option<String> {
        let MockVal::Obj(id) = v else { return None };
        match &self.state().objects[*id] {
            HeapObj::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn str_val(&self, s: &str) -> MockVal {
        MockVal::Obj(self.state().new_string(s))
    }

    pub fn get_field(&self, this: ObjId, name: &str) -> MockVal {
        match &self.state().objects[this] {
            HeapObj::Instance { fields, .. } => {
                fields.get(name).cloned().unwrap_or(MockVal::Null)
            }
            _ => MockVal::Null,
        }
    }

    pub fn set_field(&self, this: ObjId, name: &str, value: MockVal) {
        if let HeapObj::Instance { fields, .. } = &mut self.state().objects[this] {
            fields.insert(name.to_string(), value);
        }
    }

    /// The contents of an object array, read as strings where possible.
    pub fn obj_array_strings(&self, v: &MockVal) -> Option<Vec<Option<String>>> {
        let MockVal::Obj(id) = v else { return None };
        let state = self.state();
        let HeapObj::ObjArray { items, .. } = &state.objects[*id] else {
            return None;
        };
        Some(
            items
                .iter()
                .map(|item| {
                    item.and_then(|o| match &state.objects[o] {
                        HeapObj::Str(s) => Some(s.clone()),
                        _ => None,
                    })
                })
                .collect(),
        )
    }

    pub fn int_array(&self, v: &MockVal) -> Option<Vec<i32>> {
        let MockVal::Obj(id) = v else { return None };
        match &self.state().objects[*id] {
            HeapObj::PrimArray(PrimArr::I(xs)) => Some(xs.clone()),
            _ => None,
        }
    }

    pub fn throw(&self, message: &str) {
        self.state().throw("java.lang.RuntimeException", message);
    }
}

unsafe fn collect_args(
    env: *mut jni::JNIEnv,
    params: &[String],
    args: *const jvalue,
) -> Vec<MockVal> {
    let mut out = Vec::with_capacity(params.len());
    for (i, ty) in params.iter().enumerate() {
        let v = unsafe { *args.add(i) };
        out.push(unsafe { jvalue_to_mock(ty, v) });
    }
    out
}

unsafe fn jvalue_to_mock(ty: &str, v: jvalue) -> MockVal {
    unsafe {
        match ty {
            "boolean" => MockVal::Bool(v.z != 0),
            "byte" => MockVal::Byte(v.b),
            "char" => MockVal::Char(v.c),
            "short" => MockVal::Short(v.s),
            "int" => MockVal::Int(v.i),
            "long" => MockVal::Long(v.j),
            "float" => MockVal::Float(v.f),
            "double" => MockVal::Double(v.d),
            _ => {
                if v.l.is_null() {
                    MockVal::Null
                } else {
                    MockVal::Obj(deref(v.l))
                }
            }
        }
    }
}

unsafe fn invoke(
    env: *mut jni::JNIEnv,
    style: &str,
    this: jni::jobject,
    mid: jni::jmethodID,
    args: *const jvalue,
) -> MockVal {
    let def = st(env)
        .borrow()
        .methods
        .get(&(mid as usize))
        .cloned()
        .expect("call through unknown method id");
    let this_obj = if this.is_null() { None } else { Some(deref(this)) };
    let margs = unsafe { collect_args(env, &def.params, args) };
    st(env)
        .borrow_mut()
        .call_log
        .push(format!("{style}:{}", def.name));
    match &def.body {
        Body::User(f) => f(&MockCtx { env }, this_obj, &margs),
        Body::Builtin(b) => run_builtin(env, *b, this_obj, &margs),
    }
}

fn run_builtin(
    env: *mut jni::JNIEnv,
    builtin: Builtin,
    this: Option<ObjId>,
    args: &[MockVal],
) -> MockVal {
    let cell = st(env);
    let mut state = cell.borrow_mut();
    let this = this.expect("builtin needs a receiver");
    match builtin {
        Builtin::ClassGetName => {
            let &HeapObj::Class(idx) = &state.objects[this] else {
                panic!("getName on non-class");
            };
            let name = state.classes[idx].name.clone();
            let id = state.new_string(&name);
            MockVal::Obj(id)
        }
        Builtin::ClassDeclaredMethods => {
            let &HeapObj::Class(idx) = &state.objects[this] else {
                panic!("getDeclaredMethods on non-class");
            };
            let element = state.class_by_name["java.lang.reflect.Method"];
            let items: Vec<Option<ObjId>> = (0..state.classes[idx].methods.len())
                .map(|i| {
                    Some(state.push_obj(HeapObj::ReflectMethod {
                        class: idx,
                        index: i,
                        ctor: false,
                    }))
                })
                .collect::<Vec<_>>();
            MockVal::Obj(state.push_obj(HeapObj::ObjArray { element, items }))
        }
        Builtin::ClassDeclaredFields => {
            let &HeapObj::Class(idx) = &state.objects[this] else {
                panic!("getDeclaredFields on non-class");
            };
            let element = state.class_by_name["java.lang.reflect.Field"];
            let items: Vec<Option<ObjId>> = (0..state.classes[idx].fields.len())
                .map(|i| Some(state.push_obj(HeapObj::ReflectField { class: idx, index: i })))
                .collect::<Vec<_>>();
            MockVal::Obj(state.push_obj(HeapObj::ObjArray { element, items }))
        }
        Builtin::ClassDeclaredCtors => {
            let &HeapObj::Class(idx) = &state.objects[this] else {
                panic!("getDeclaredConstructors on non-class");
            };
            let element = state.class_by_name["java.lang.reflect.Constructor"];
            let items: Vec<Option<ObjId>> = (0..state.classes[idx].ctors.len())
                .map(|i| {
                    Some(state.push_obj(HeapObj::ReflectMethod {
                        class: idx,
                        index: i,
                        ctor: true,
                    }))
                })
                .collect::<Vec<_>>();
            MockVal::Obj(state.push_obj(HeapObj::ObjArray { element, items }))
        }
        Builtin::MethodGetName => {
            let def = reflect_method(&state, this);
            let name = def.name.clone();
            let id = state.new_string(&name);
            MockVal::Obj(id)
        }
        Builtin::MethodGetModifiers => {
            let def = reflect_method(&state, this);
            MockVal::Int(if def.is_static { MODIFIER_STATIC } else { 0 })
        }
        Builtin::MethodIsVarArgs | Builtin::CtorIsVarArgs => {
            let def = reflect_method(&state, this);
            MockVal::Bool(def.is_varargs)
        }
        Builtin::MethodReturnType => {
            let def = reflect_method(&state, this);
            let ret = def.ret.clone();
            MockVal::Obj(state.push_obj(HeapObj::TypeName(ret)))
        }
        Builtin::MethodParamTypes | Builtin::CtorParamTypes => {
            let def = reflect_method(&state, this);
            let params = def.params.clone();
            let element = state.class_by_name["java.lang.reflect.Type"];
            let items: Vec<Option<ObjId>> = params
                .iter()
                .map(|p| Some(state.push_obj(HeapObj::TypeName(p.clone()))))
                .collect();
            MockVal::Obj(state.push_obj(HeapObj::ObjArray { element, items }))
        }
        Builtin::FieldGetName => {
            let (class, index) = reflect_field(&state, this);
            let name = state.classes[class].fields[index].name.clone();
            let id = state.new_string(&name);
            MockVal::Obj(id)
        }
        Builtin::FieldGetModifiers => {
            let (class, index) = reflect_field(&state, this);
            let is_static = state.classes[class].fields[index].is_static;
            MockVal::Int(if is_static { MODIFIER_STATIC } else { 0 })
        }
        Builtin::FieldGenericType => {
            let (class, index) = reflect_field(&state, this);
            let ty = state.classes[class].fields[index].ty.clone();
            MockVal::Obj(state.push_obj(HeapObj::TypeName(ty)))
        }
        Builtin::TypeGetTypeName => {
            let HeapObj::TypeName(name) = &state.objects[this] else {
                panic!("getTypeName on non-type");
            };
            let name = name.clone();
            let id = state.new_string(&name);
            MockVal::Obj(id)
        }
        Builtin::LoaderLoadClass => {
            let MockVal::Obj(name_id) = &args[0] else {
                panic!("loadClass without a name");
            };
            let HeapObj::Str(name) = &state.objects[*name_id] else {
                panic!("loadClass name is not a string");
            };
            let name = name.clone();
            if state.loadable.contains(&name) {
                if let Some(&idx) = state.class_by_name.get(&name) {
                    return MockVal::Obj(state.classes[idx].class_obj);
                }
            }
            state.throw("java.lang.ClassNotFoundException", &name);
            MockVal::Null
        }
        Builtin::ObjectToString => {
            let id = state.new_string(&format!("object#{this}"));
            MockVal::Obj(id)
        }
        Builtin::StringLength => {
            let HeapObj::Str(s) = &state.objects[this] else {
                panic!("length on non-string");
            };
            MockVal::Int(s.encode_utf16().count() as i32)
        }
        Builtin::StringCtor => {
            let payload = match &args[0] {
                MockVal::Obj(id) => match &state.objects[*id] {
                    HeapObj::Str(s) => s.clone(),
                    _ => String::new(),
                },
                _ => String::new(),
            };
            let id = state.new_string(&payload);
            MockVal::Obj(id)
        }
    }
}

fn reflect_method(state: &VmState, obj: ObjId) -> Rc<MethodDef> {
    let &HeapObj::ReflectMethod { class, index, ctor } = &state.objects[obj] else {
        panic!("not a reflected method");
    };
    if ctor {
        Rc::clone(&state.classes[class].ctors[index])
    } else {
        Rc::clone(&state.classes[class].methods[index])
    }
}

fn reflect_field(state: &VmState, obj: ObjId) -> (usize, usize) {
    let &HeapObj::ReflectField { class, index } = &state.objects[obj] else {
        panic!("not a reflected field");
    };
    (class, index)
}

fn mock_to_obj_handle(env: *mut jni::JNIEnv, v: MockVal) -> jni::jobject {
    match v {
        MockVal::Null | MockVal::Void => std::ptr::null_mut(),
        MockVal::Obj(id) => st(env).borrow_mut().alloc_ref(id),
        other => panic!("expected an object result, got {other:?}"),
    }
}

// =========================================================================
// JNI function implementations
// =========================================================================

unsafe extern "system" fn get_version(_env: *mut jni::JNIEnv) -> jni::jint {
    jni::JNI_VERSION_1_6
}

unsafe extern "system" fn find_class(env: *mut jni::JNIEnv, name: *const c_char) -> jni::jclass {
    let name = unsafe { CStr::from_ptr(name) }
        .to_string_lossy()
        .replace('/', ".");
    let mut state = st(env).borrow_mut();
    match state.class_by_name.get(&name).copied() {
        Some(idx) => {
            let obj = state.classes[idx].class_obj;
            state.alloc_ref(obj)
        }
        None => {
            state.throw("java.lang.NoClassDefFoundError", &name);
            std::ptr::null_mut()
        }
    }
}

unsafe extern "system" fn from_reflected_method(
    env: *mut jni::JNIEnv,
    method: jni::jobject,
) -> jni::jmethodID {
    let state = st(env).borrow();
    let def = reflect_method(&state, deref(method));
    Rc::as_ptr(&def) as jni::jmethodID
}

unsafe extern "system" fn from_reflected_field(
    env: *mut jni::JNIEnv,
    field: jni::jobject,
) -> jni::jfieldID {
    let cell = st(env);
    let def = {
        let state = cell.borrow();
        let (class, index) = reflect_field(&state, deref(field));
        Rc::clone(&state.classes[class].fields[index])
    };
    let ptr = Rc::as_ptr(&def) as jni::jfieldID;
    cell.borrow_mut().fields.insert(ptr as usize, def);
    ptr
}

unsafe extern "system" fn get_superclass(env: *mut jni::JNIEnv, sub: jni::jclass) -> jni::jclass {
    let mut state = st(env).borrow_mut();
    let &HeapObj::Class(idx) = &state.objects[deref(sub)] else {
        return std::ptr::null_mut();
    };
    match state.classes[idx].superclass {
        Some(sup) => {
            let obj = state.classes[sup].class_obj;
            state.alloc_ref(obj)
        }
        None => std::ptr::null_mut(),
    }
}

unsafe extern "system" fn is_assignable_from(
    env: *mut jni::JNIEnv,
    sub: jni::jclass,
    sup: jni::jclass,
) -> jni::jboolean {
    let state = st(env).borrow();
    let (HeapObj::Class(a), HeapObj::Class(b)) =
        (&state.objects[deref(sub)], &state.objects[deref(sup)])
    else {
        return jni::JNI_FALSE;
    };
    let mut current = Some(*a);
    while let Some(idx) = current {
        if idx == *b {
            return jni::JNI_TRUE;
        }
        current = state.classes[idx].superclass;
    }
    jni::JNI_FALSE
}

unsafe extern "system" fn throw(env: *mut jni::JNIEnv, obj: jni::jthrowable) -> jni::jint {
    st(env).borrow_mut().pending = Some(deref(obj));
    jni::JNI_OK
}

unsafe extern "system" fn throw_new(
    env: *mut jni::JNIEnv,
    _clazz: jni::jclass,
    msg: *const c_char,
) -> jni::jint {
    let msg = unsafe { CStr::from_ptr(msg) }.to_string_lossy().to_string();
    st(env)
        .borrow_mut()
        .throw("java.lang.RuntimeException", &msg);
    jni::JNI_OK
}

unsafe extern "system" fn exception_occurred(env: *mut jni::JNIEnv) -> jni::jthrowable {
    let mut state = st(env).borrow_mut();
    match state.pending {
        Some(obj) => state.alloc_ref(obj),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "system" fn exception_describe(_env: *mut jni::JNIEnv) {}

unsafe extern "system" fn exception_clear(env: *mut jni::JNIEnv) {
    st(env).borrow_mut().pending = None;
}

unsafe extern "system" fn exception_check(env: *mut jni::JNIEnv) -> jni::jboolean {
    if st(env).borrow().pending.is_some() {
        jni::JNI_TRUE
    } else {
        jni::JNI_FALSE
    }
}

unsafe extern "system" fn push_local_frame(env: *mut jni::JNIEnv, _cap: jni::jint) -> jni::jint {
    st(env).borrow_mut().frames.push(Vec::new());
    jni::JNI_OK
}

unsafe extern "system" fn pop_local_frame(
    env: *mut jni::JNIEnv,
    result: jni::jobject,
) -> jni::jobject {
    let mut state = st(env).borrow_mut();
    let carried = if result.is_null() {
        None
    } else {
        Some(deref(result))
    };
    if state.frames.len() > 1 {
        let frame = state.frames.pop().unwrap();
        for entry in frame {
            drop(unsafe { Box::from_raw(entry) });
        }
    }
    match carried {
        Some(obj) => state.alloc_ref(obj),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "system" fn new_global_ref(env: *mut jni::JNIEnv, obj: jni::jobject) -> jni::jobject {
    if obj.is_null() {
        return std::ptr::null_mut();
    }
    let mut state = st(env).borrow_mut();
    let entry = Box::into_raw(Box::new(RefEntry { obj: deref(obj) }));
    state.globals.push(entry);
    entry as jni::jobject
}

unsafe extern "system" fn delete_global_ref(env: *mut jni::JNIEnv, gref: jni::jobject) {
    if gref.is_null() {
        return;
    }
    let mut state = st(env).borrow_mut();
    let ptr = gref as *mut RefEntry;
    if let Some(pos) = state.globals.iter().position(|&g| g == ptr) {
        state.globals.remove(pos);
        drop(unsafe { Box::from_raw(ptr) });
    }
}

unsafe extern "system" fn delete_local_ref(env: *mut jni::JNIEnv, obj: jni::jobject) {
    if obj.is_null() {
        return;
    }
    let mut state = st(env).borrow_mut();
    let ptr = obj as *mut RefEntry;
    for frame in state.frames.iter_mut().rev() {
        if let Some(pos) = frame.iter().position(|&r| r == ptr) {
            frame.remove(pos);
            drop(unsafe { Box::from_raw(ptr) });
            return;
        }
    }
}

unsafe extern "system" fn is_same_object(
    env: *mut jni::JNIEnv,
    a: jni::jobject,
    b: jni::jobject,
) -> jni::jboolean {
    let _ = env;
    let same = match (a.is_null(), b.is_null()) {
        (true, true) => true,
        (false, false) => deref(a) == deref(b),
        _ => false,
    };
    if same {
        jni::JNI_TRUE
    } else {
        jni::JNI_FALSE
    }
}

unsafe extern "system" fn new_local_ref(env: *mut jni::JNIEnv, obj: jni::jobject) -> jni::jobject {
    if obj.is_null() {
        return std::ptr::null_mut();
    }
    let id = deref(obj);
    st(env).borrow_mut().alloc_ref(id)
}

unsafe extern "system" fn ensure_local_capacity(
    _env: *mut jni::JNIEnv,
    _cap: jni::jint,
) -> jni::jint {
    jni::JNI_OK
}

unsafe extern "system" fn alloc_object(env: *mut jni::JNIEnv, clazz: jni::jclass) -> jni::jobject {
    let mut state = st(env).borrow_mut();
    let &HeapObj::Class(idx) = &state.objects[deref(clazz)] else {
        return std::ptr::null_mut();
    };
    let fields: HashMap<String, MockVal> =
        state.classes[idx].field_defaults.iter().cloned().collect();
    let obj = state.push_obj(HeapObj::Instance { class: idx, fields });
    state.alloc_ref(obj)
}

unsafe extern "system" fn new_object_a(
    env: *mut jni::JNIEnv,
    clazz: jni::jclass,
    mid: jni::jmethodID,
    args: *const jvalue,
) -> jni::jobject {
    let allocated = unsafe { alloc_object(env, clazz) };
    if allocated.is_null() {
        return std::ptr::null_mut();
    }
    let result = unsafe { invoke(env, "new", allocated, mid, args) };
    match result {
        MockVal::Obj(id) => {
            unsafe { delete_local_ref(env, allocated) };
            st(env).borrow_mut().alloc_ref(id)
        }
        _ => allocated,
    }
}

unsafe extern "system" fn get_object_class(
    env: *mut jni::JNIEnv,
    obj: jni::jobject,
) -> jni::jclass {
    let mut state = st(env).borrow_mut();
    match state.class_of(deref(obj)) {
        Some(idx) => {
            let class_obj = state.classes[idx].class_obj;
            state.alloc_ref(class_obj)
        }
        None => std::ptr::null_mut(),
    }
}

unsafe extern "system" fn is_instance_of(
    env: *mut jni::JNIEnv,
    obj: jni::jobject,
    clazz: jni::jclass,
) -> jni::jboolean {
    if obj.is_null() {
        return jni::JNI_TRUE;
    }
    let state = st(env).borrow();
    let &HeapObj::Class(target) = &state.objects[deref(clazz)] else {
        return jni::JNI_FALSE;
    };
    if state.is_instance(deref(obj), target) {
        jni::JNI_TRUE
    } else {
        jni::JNI_FALSE
    }
}

unsafe extern "system" fn get_method_id(
    env: *mut jni::JNIEnv,
    clazz: jni::jclass,
    name: *const c_char,
    _sig: *const c_char,
) -> jni::jmethodID {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().to_string();
    let mut state = st(env).borrow_mut();
    let &HeapObj::Class(idx) = &state.objects[deref(clazz)] else {
        return std::ptr::null_mut();
    };
    match state.find_method(idx, &name) {
        Some(def) => Rc::as_ptr(&def) as jni::jmethodID,
        None => {
            state.throw("java.lang.NoSuchMethodError", &name);
            std::ptr::null_mut()
        }
    }
}

unsafe extern "system" fn get_static_method_id(
    env: *mut jni::JNIEnv,
    clazz: jni::jclass,
    name: *const c_char,
    sig: *const c_char,
) -> jni::jmethodID {
    unsafe { get_method_id(env, clazz, name, sig) }
}

unsafe extern "system" fn get_field_id(
    env: *mut jni::JNIEnv,
    clazz: jni::jclass,
    name: *const c_char,
    _sig: *const c_char,
) -> jni::jfieldID {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().to_string();
    let cell = st(env);
    let def = {
        let state = cell.borrow();
        let &HeapObj::Class(idx) = &state.objects[deref(clazz)] else {
            return std::ptr::null_mut();
        };
        state.find_field(idx, &name)
    };
    match def {
        Some(def) => {
            let ptr = Rc::as_ptr(&def) as jni::jfieldID;
            cell.borrow_mut().fields.insert(ptr as usize, def);
            ptr
        }
        None => {
            cell.borrow_mut()
                .throw("java.lang.NoSuchFieldError", &name);
            std::ptr::null_mut()
        }
    }
}

unsafe extern "system" fn get_static_field_id(
    env: *mut jni::JNIEnv,
    clazz: jni::jclass,
    name: *const c_char,
    sig: *const c_char,
) -> jni::jfieldID {
    unsafe { get_field_id(env, clazz, name, sig) }
}

// ---- call families -------------------------------------------------------

macro_rules! call_family {
    ($virt:ident, $nonvirt:ident, $stat:ident, $ret:ty, $unwrap:expr, $default:expr) => {
        unsafe extern "system" fn $virt(
            env: *mut jni::JNIEnv,
            obj: jni::jobject,
            mid: jni::jmethodID,
            args: *const jvalue,
        ) -> $ret {
            let v = unsafe { invoke(env, "virtual", obj, mid, args) };
            ($unwrap)(env, v)
        }
        unsafe extern "system" fn $nonvirt(
            env: *mut jni::JNIEnv,
            obj: jni::jobject,
            _clazz: jni::jclass,
            mid: jni::jmethodID,
            args: *const jvalue,
        ) -> $ret {
            let v = unsafe { invoke(env, "nonvirtual", obj, mid, args) };
            ($unwrap)(env, v)
        }
        unsafe extern "system" fn $stat(
            env: *mut jni::JNIEnv,
            _clazz: jni::jclass,
            mid: jni::jmethodID,
            args: *const jvalue,
        ) -> $ret {
            let v = unsafe { invoke(env, "static", std::ptr::null_mut(), mid, args) };
            ($unwrap)(env, v)
        }
    };
}

call_family!(
    call_object_a,
    call_nonvirtual_object_a,
    call_static_object_a,
    jni::jobject,
    |env, v| mock_to_obj_handle(env, v),
    std::ptr::null_mut()
);
call_family!(
    call_boolean_a,
    call_nonvirtual_boolean_a,
    call_static_boolean_a,
    jni::jboolean,
    |_env, v| match v {
        MockVal::Bool(b) => b as jni::jboolean,
        other => panic!("expected boolean, got {other:?}"),
    },
    0
);
call_family!(
    call_byte_a,
    call_nonvirtual_byte_a,
    call_static_byte_a,
    jni::jbyte,
    |_env, v| match v {
        MockVal::Byte(b) => b,
        other => panic!("expected byte, got {other:?}"),
    },
    0
);
call_family!(
    call_char_a,
    call_nonvirtual_char_a,
    call_static_char_a,
    jni::jchar,
    |_env, v| match v {
        MockVal::Char(c) => c,
        other => panic!("expected char, got {other:?}"),
    },
    0
);
call_family!(
    call_short_a,
    call_nonvirtual_short_a,
    call_static_short_a,
    jni::jshort,
    |_env, v| match v {
        MockVal::Short(s) => s,
        other => panic!("expected short, got {other:?}"),
    },
    0
);
call_family!(
    call_int_a,
    call_nonvirtual_int_a,
    call_static_int_a,
    jni::jint,
    |_env, v| match v {
        MockVal::Int(i) => i,
        other => panic!("expected int, got {other:?}"),
    },
    0
);
call_family!(
    call_long_a,
    call_nonvirtual_long_a,
    call_static_long_a,
    jni::jlong,
    |_env, v| match v {
        MockVal::Long(j) => j,
        other => panic!("expected long, got {other:?}"),
    },
    0
);
call_family!(
    call_float_a,
    call_nonvirtual_float_a,
    call_static_float_a,
    jni::jfloat,
    |_env, v| match v {
        MockVal::Float(f) => f,
        other => panic!("expected float, got {other:?}"),
    },
    0.0
);
call_family!(
    call_double_a,
    call_nonvirtual_double_a,
    call_static_double_a,
    jni::jdouble,
    |_env, v| match v {
        MockVal::Double(d) => d,
        other => panic!("expected double, got {other:?}"),
    },
    0.0
);

unsafe extern "system" fn call_void_a(
    env: *mut jni::JNIEnv,
    obj: jni::jobject,
    mid: jni::jmethodID,
    args: *const jvalue,
) {
    let _ = unsafe { invoke(env, "virtual", obj, mid, args) };
}

unsafe extern "system" fn call_nonvirtual_void_a(
    env: *mut jni::JNIEnv,
    obj: jni::jobject,
    _clazz: jni::jclass,
    mid: jni::jmethodID,
    args: *const jvalue,
) {
    let _ = unsafe { invoke(env, "nonvirtual", obj, mid, args) };
}

unsafe extern "system" fn call_static_void_a(
    env: *mut jni::JNIEnv,
    _clazz: jni::jclass,
    mid: jni::jmethodID,
    args: *const jvalue,
) {
    let _ = unsafe { invoke(env, "static", std::ptr::null_mut(), mid, args) };
}

// ---- field families ------------------------------------------------------

unsafe fn field_get(env: *mut jni::JNIEnv, target: jni::jobject, fid: jni::jfieldID) -> MockVal {
    let state = st(env).borrow();
    let def = state
        .fields
        .get(&(fid as usize))
        .cloned()
        .expect("unknown field id");
    let target_obj = deref(target);
    if def.is_static {
        let &HeapObj::Class(idx) = &state.objects[target_obj] else {
            panic!("static field access on non-class");
        };
        state.classes[idx]
            .statics
            .get(&def.name)
            .cloned()
            .unwrap_or(MockVal::Null)
    } else {
        match &state.objects[target_obj] {
            HeapObj::Instance { fields, .. } => {
                fields.get(&def.name).cloned().unwrap_or(MockVal::Null)
            }
            _ => panic!("instance field access on non-instance"),
        }
    }
}

unsafe fn field_set(
    env: *mut jni::JNIEnv,
    target: jni::jobject,
    fid: jni::jfieldID,
    value: MockVal,
) {
    let mut state = st(env).borrow_mut();
    let def = state
        .fields
        .get(&(fid as usize))
        .cloned()
        .expect("unknown field id");
    let target_obj = deref(target);
    if def.is_static {
        let &HeapObj::Class(idx) = &state.objects[target_obj] else {
            panic!("static field write on non-class");
        };
        state.classes[idx].statics.insert(def.name.clone(), value);
    } else {
        match &mut state.objects[target_obj] {
            HeapObj::Instance { fields, .. } => {
                fields.insert(def.name.clone(), value);
            }
            _ => panic!("instance field write on non-instance"),
        }
    }
}

macro_rules! field_family {
    ($get:ident, $set:ident, $sget:ident, $sset:ident, $ty:ty, $wrap:expr, $unwrap:expr) => {
        unsafe extern "system" fn $get(
            env: *mut jni::JNIEnv,
            obj: jni::jobject,
            fid: jni::jfieldID,
        ) -> $ty {
            ($unwrap)(env, unsafe { field_get(env, obj, fid) })
        }
        unsafe extern "system" fn $set(
            env: *mut jni::JNIEnv,
            obj: jni::jobject,
            fid: jni::jfieldID,
            val: $ty,
        ) {
            let v = ($wrap)(val);
            unsafe { field_set(env, obj, fid, v) };
        }
        unsafe extern "system" fn $sget(
            env: *mut jni::JNIEnv,
            clazz: jni::jclass,
            fid: jni::jfieldID,
        ) -> $ty {
            ($unwrap)(env, unsafe { field_get(env, clazz, fid) })
        }
        unsafe extern "system" fn $sset(
            env: *mut jni::JNIEnv,
            clazz: jni::jclass,
            fid: jni::jfieldID,
            val: $ty,
        ) {
            let v = ($wrap)(val);
            unsafe { field_set(env, clazz, fid, v) };
        }
    };
}

field_family!(
    get_object_field,
    set_object_field,
    get_static_object_field,
    set_static_object_field,
    jni::jobject,
    |val: jni::jobject| if val.is_null() {
        MockVal::Null
    } else {
        MockVal::Obj(deref(val))
    },
    |env, v| mock_to_obj_handle(env, v)
);
field_family!(
    get_boolean_field,
    set_boolean_field,
    get_static_boolean_field,
    set_static_boolean_field,
    jni::jboolean,
    |val: jni::jboolean| MockVal::Bool(val != 0),
    |_env, v| match v {
        MockVal::Bool(b) => b as jni::jboolean,
        other => panic!("expected boolean field, got {other:?}"),
    }
);
field_family!(
    get_byte_field,
    set_byte_field,
    get_static_byte_field,
    set_static_byte_field,
    jni::jbyte,
    |val: jni::jbyte| MockVal::Byte(val),
    |_env, v| match v {
        MockVal::Byte(b) => b,
        other => panic!("expected byte field, got {other:?}"),
    }
);
field_family!(
    get_char_field,
    set_char_field,
    get_static_char_field,
    set_static_char_field,
    jni::jchar,
    |val: jni::jchar| MockVal::Char(val),
    |_env, v| match v {
        MockVal::Char(c) => c,
        other => panic!("expected char field, got {other:?}"),
    }
);
field_family!(
    get_short_field,
    set_short_field,
    get_static_short_field,
    set_static_short_field,
    jni::jshort,
    |val: jni::jshort| MockVal::Short(val),
    |_env, v| match v {
        MockVal::Short(s) => s,
        other => panic!("expected short field, got {other:?}"),
    }
);
field_family!(
    get_int_field,
    set_int_field,
    get_static_int_field,
    set_static_int_field,
    jni::jint,
    |val: jni::jint| MockVal::Int(val),
    |_env, v| match v {
        MockVal::Int(i) => i,
        other => panic!("expected int field, got {other:?}"),
    }
);
field_family!(
    get_long_field,
    set_long_field,
    get_static_long_field,
    set_static_long_field,
    jni::jlong,
    |val: jni::jlong| MockVal::Long(val),
    |_env, v| match v {
        MockVal::Long(j) => j,
        other => panic!("expected long field, got {other:?}"),
    }
);
field_family!(
    get_float_field,
    set_float_field,
    get_static_float_field,
    set_static_float_field,
    jni::jfloat,
    |val: jni::jfloat| MockVal::Float(val),
    |_env, v| match v {
        MockVal::Float(f) => f,
        other => panic!("expected float field, got {other:?}"),
    }
);
field_family!(
    get_double_field,
    set_double_field,
    get_static_double_field,
    set_static_double_field,
    jni::jdouble,
    |val: jni::jdouble| MockVal::Double(val),
    |_env, v| match v {
        MockVal::Double(d) => d,
        other => panic!("expected double field, got {other:?}"),
    }
);

// ---- strings -------------------------------------------------------------

unsafe extern "system" fn new_string(
    env: *mut jni::JNIEnv,
    unicode: *const jni::jchar,
    len: jni::jsize,
) -> jni::jstring {
    let slice = unsafe { std::slice::from_raw_parts(unicode, len.max(0) as usize) };
    let s = String::from_utf16_lossy(slice);
    let mut state = st(env).borrow_mut();
    let id = state.new_string(&s);
    state.alloc_ref(id)
}

unsafe extern "system" fn get_string_length(env: *mut jni::JNIEnv, s: jni::jstring) -> jni::jsize {
    let state = st(env).borrow();
    match &state.objects[deref(s)] {
        HeapObj::Str(s) => s.encode_utf16().count() as jni::jsize,
        _ => 0,
    }
}

unsafe extern "system" fn get_string_chars(
    env: *mut jni::JNIEnv,
    s: jni::jstring,
    is_copy: *mut jni::jboolean,
) -> *const jni::jchar {
    if !is_copy.is_null() {
        unsafe { *is_copy = jni::JNI_TRUE };
    }
    let mut state = st(env).borrow_mut();
    let HeapObj::Str(payload) = &state.objects[deref(s)] else {
        return std::ptr::null();
    };
    let units: Vec<u16> = payload.encode_utf16().collect();
    let len = units.len();
    let ptr = Box::into_raw(units.into_boxed_slice()) as *mut jni::jchar;
    state.wchars.insert(ptr as usize, PinnedBuf { len });
    ptr
}

unsafe extern "system" fn release_string_chars(
    env: *mut jni::JNIEnv,
    _s: jni::jstring,
    chars: *const jni::jchar,
) {
    let mut state = st(env).borrow_mut();
    if let Some(buf) = state.wchars.remove(&(chars as usize)) {
        drop(unsafe {
            Box::from_raw(std::slice::from_raw_parts_mut(
                chars as *mut jni::jchar,
                buf.len,
            ))
        });
    }
}

unsafe extern "system" fn new_string_utf(
    env: *mut jni::JNIEnv,
    utf: *const c_char,
) -> jni::jstring {
    let s = unsafe { CStr::from_ptr(utf) }.to_string_lossy().to_string();
    let mut state = st(env).borrow_mut();
    let id = state.new_string(&s);
    state.alloc_ref(id)
}

unsafe extern "system" fn get_string_utf_length(
    env: *mut jni::JNIEnv,
    s: jni::jstring,
) -> jni::jsize {
    let state = st(env).borrow();
    match &state.objects[deref(s)] {
        HeapObj::Str(s) => s.len() as jni::jsize,
        _ => 0,
    }
}

unsafe extern "system" fn get_string_utf_chars(
    env: *mut jni::JNIEnv,
    s: jni::jstring,
    is_copy: *mut jni::jboolean,
) -> *const c_char {
    if !is_copy.is_null() {
        unsafe { *is_copy = jni::JNI_TRUE };
    }
    let mut state = st(env).borrow_mut();
    let HeapObj::Str(payload) = &state.objects[deref(s)] else {
        return std::ptr::null();
    };
    let c = CString::new(payload.clone()).unwrap_or_default();
    let ptr = c.into_raw();
    state.cstrings.insert(ptr as usize);
    ptr
}

unsafe extern "system" fn release_string_utf_chars(
    env: *mut jni::JNIEnv,
    _s: jni::jstring,
    chars: *const c_char,
) {
    let mut state = st(env).borrow_mut();
    if state.cstrings.remove(&(chars as usize)) {
        drop(unsafe { CString::from_raw(chars as *mut c_char) });
    }
}

// ---- arrays --------------------------------------------------------------

unsafe extern "system" fn get_array_length(env: *mut jni::JNIEnv, array: jni::jarray) -> jni::jsize {
    let state = st(env).borrow();
    match &state.objects[deref(array)] {
        HeapObj::ObjArray { items, .. } => items.len() as jni::jsize,
        HeapObj::PrimArray(arr) => match arr {
            PrimArr::Z(v) => v.len() as jni::jsize,
            PrimArr::B(v) => v.len() as jni::jsize,
            PrimArr::C(v) => v.len() as jni::jsize,
            PrimArr::S(v) => v.len() as jni::jsize,
            PrimArr::I(v) => v.len() as jni::jsize,
            PrimArr::J(v) => v.len() as jni::jsize,
            PrimArr::F(v) => v.len() as jni::jsize,
            PrimArr::D(v) => v.len() as jni::jsize,
        },
        _ => 0,
    }
}

unsafe extern "system" fn new_object_array(
    env: *mut jni::JNIEnv,
    len: jni::jsize,
    clazz: jni::jclass,
    init: jni::jobject,
) -> jni::jobjectArray {
    let mut state = st(env).borrow_mut();
    let &HeapObj::Class(element) = &state.objects[deref(clazz)] else {
        return std::ptr::null_mut();
    };
    let fill = if init.is_null() {
        None
    } else {
        Some(deref(init))
    };
    let items = vec![fill; len.max(0) as usize];
    let id = state.push_obj(HeapObj::ObjArray { element, items });
    state.alloc_ref(id)
}

unsafe extern "system" fn get_object_array_element(
    env: *mut jni::JNIEnv,
    array: jni::jobjectArray,
    index: jni::jsize,
) -> jni::jobject {
    let mut state = st(env).borrow_mut();
    let item = match &state.objects[deref(array)] {
        HeapObj::ObjArray { items, .. } => items.get(index as usize).copied().flatten(),
        _ => None,
    };
    match item {
        Some(obj) => state.alloc_ref(obj),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "system" fn set_object_array_element(
    env: *mut jni::JNIEnv,
    array: jni::jobjectArray,
    index: jni::jsize,
    val: jni::jobject,
) {
    let mut state = st(env).borrow_mut();
    let value = if val.is_null() { None } else { Some(deref(val)) };
    let arr = deref(array);
    if let HeapObj::ObjArray { items, .. } = &mut state.objects[arr] {
        if let Some(slot) = items.get_mut(index as usize) {
            *slot = value;
        }
    }
}

macro_rules! prim_array_family {
    ($variant:ident, $elem:ty, $new:ident, $get_elems:ident, $release:ident, $get_region:ident, $set_region:ident) => {
        unsafe extern "system" fn $new(env: *mut jni::JNIEnv, len: jni::jsize) -> jni::jarray {
            let mut state = st(env).borrow_mut();
            let id = state.push_obj(HeapObj::PrimArray(PrimArr::$variant(vec![
                Default::default();
                len.max(0) as usize
            ])));
            state.alloc_ref(id)
        }

        unsafe extern "system" fn $get_elems(
            env: *mut jni::JNIEnv,
            array: jni::jarray,
            is_copy: *mut jni::jboolean,
        ) -> *mut $elem {
            if !is_copy.is_null() {
                unsafe { *is_copy = jni::JNI_TRUE };
            }
            let mut state = st(env).borrow_mut();
            let HeapObj::PrimArray(PrimArr::$variant(data)) = &state.objects[deref(array)] else {
                return std::ptr::null_mut();
            };
            let copy: Vec<$elem> = data.clone();
            let len = copy.len();
            let ptr = Box::into_raw(copy.into_boxed_slice()) as *mut $elem;
            state.pinned.insert(ptr as usize, PinnedBuf { len });
            ptr
        }

        unsafe extern "system" fn $release(
            env: *mut jni::JNIEnv,
            array: jni::jarray,
            elems: *mut $elem,
            mode: jni::jint,
        ) {
            let mut state = st(env).borrow_mut();
            let Some(buf) = state.pinned.remove(&(elems as usize)) else {
                return;
            };
            if mode != jni::JNI_ABORT {
                let written =
                    unsafe { std::slice::from_raw_parts(elems as *const $elem, buf.len) }.to_vec();
                let arr = deref(array);
                if let HeapObj::PrimArray(PrimArr::$variant(data)) = &mut state.objects[arr] {
                    *data = written;
                }
            }
            drop(unsafe { Box::from_raw(std::slice::from_raw_parts_mut(elems, buf.len)) });
        }

        unsafe extern "system" fn $get_region(
            env: *mut jni::JNIEnv,
            array: jni::jarray,
            start: jni::jsize,
            len: jni::jsize,
            buf: *mut $elem,
        ) {
            let state = st(env).borrow();
            if let HeapObj::PrimArray(PrimArr::$variant(data)) = &state.objects[deref(array)] {
                let start = start.max(0) as usize;
                let len = len.max(0) as usize;
                unsafe {
                    std::ptr::copy_nonoverlapping(data[start..start + len].as_ptr(), buf, len)
                };
            }
        }

        unsafe extern "system" fn $set_region(
            env: *mut jni::JNIEnv,
            array: jni::jarray,
            start: jni::jsize,
            len: jni::jsize,
            buf: *const $elem,
        ) {
            let mut state = st(env).borrow_mut();
            let arr = deref(array);
            if let HeapObj::PrimArray(PrimArr::$variant(data)) = &mut state.objects[arr] {
                let start = start.max(0) as usize;
                let len = len.max(0) as usize;
                unsafe {
                    std::ptr::copy_nonoverlapping(buf, data[start..start + len].as_mut_ptr(), len)
                };
            }
        }
    };
}

prim_array_family!(Z, jni::jboolean, new_boolean_array, get_boolean_array_elements, release_boolean_array_elements, get_boolean_array_region, set_boolean_array_region);
prim_array_family!(B, jni::jbyte, new_byte_array, get_byte_array_elements, release_byte_array_elements, get_byte_array_region, set_byte_array_region);
prim_array_family!(C, jni::jchar, new_char_array, get_char_array_elements, release_char_array_elements, get_char_array_region, set_char_array_region);
prim_array_family!(S, jni::jshort, new_short_array, get_short_array_elements, release_short_array_elements, get_short_array_region, set_short_array_region);
prim_array_family!(I, jni::jint, new_int_array, get_int_array_elements, release_int_array_elements, get_int_array_region, set_int_array_region);
prim_array_family!(J, jni::jlong, new_long_array, get_long_array_elements, release_long_array_elements, get_long_array_region, set_long_array_region);
prim_array_family!(F, jni::jfloat, new_float_array, get_float_array_elements, release_float_array_elements, get_float_array_region, set_float_array_region);
prim_array_family!(D, jni::jdouble, new_double_array, get_double_array_elements, release_double_array_elements, get_double_array_region, set_double_array_region);

// ---- misc ----------------------------------------------------------------

unsafe extern "system" fn monitor_enter(_env: *mut jni::JNIEnv, _obj: jni::jobject) -> jni::jint {
    jni::JNI_OK
}

unsafe extern "system" fn monitor_exit(_env: *mut jni::JNIEnv, _obj: jni::jobject) -> jni::jint {
    jni::JNI_OK
}

unsafe extern "system" fn get_java_vm(
    env: *mut jni::JNIEnv,
    vm: *mut *mut jni::JavaVM,
) -> jni::jint {
    unsafe { *vm = st(env).borrow().vm_ptr };
    jni::JNI_OK
}

unsafe extern "system" fn new_weak_global_ref(
    env: *mut jni::JNIEnv,
    obj: jni::jobject,
) -> jni::jweak {
    if obj.is_null() {
        return std::ptr::null_mut();
    }
    let mut state = st(env).borrow_mut();
    let entry = Box::into_raw(Box::new(RefEntry { obj: deref(obj) }));
    state.weaks.push(entry);
    entry as jni::jweak
}

unsafe extern "system" fn delete_weak_global_ref(env: *mut jni::JNIEnv, obj: jni::jweak) {
    if obj.is_null() {
        return;
    }
    let mut state = st(env).borrow_mut();
    let ptr = obj as *mut RefEntry;
    if let Some(pos) = state.weaks.iter().position(|&w| w == ptr) {
        state.weaks.remove(pos);
        drop(unsafe { Box::from_raw(ptr) });
    }
}

// ---- JavaVM table --------------------------------------------------------

unsafe extern "system" fn vm_destroy(_vm: *mut jni::JavaVM) -> jni::jint {
    jni::JNI_OK
}

unsafe extern "system" fn vm_attach(
    vm: *mut jni::JavaVM,
    penv: *mut *mut jni::JNIEnv,
    _args: *mut c_void,
) -> jni::jint {
    unsafe { *penv = (*(vm as *const VmBlock)).env };
    jni::JNI_OK
}

unsafe extern "system" fn vm_detach(_vm: *mut jni::JavaVM) -> jni::jint {
    jni::JNI_OK
}

unsafe extern "system" fn vm_get_env(
    vm: *mut jni::JavaVM,
    penv: *mut *mut c_void,
    _version: jni::jint,
) -> jni::jint {
    unsafe { *penv = (*(vm as *const VmBlock)).env as *mut c_void };
    jni::JNI_OK
}

// =========================================================================
// Class registration
// =========================================================================

pub struct MethodSpec {
    name: String,
    ret: String,
    params: Vec<String>,
    is_static: bool,
    is_varargs: bool,
    body: Body,
}

impl MethodSpec {
    pub fn new(
        name: &str,
        ret: &str,
        params: &[&str],
        body: impl Fn(&MockCtx, Option<ObjId>, &[MockVal]) -> MockVal + 'static,
    ) -> Self {
        MethodSpec {
            name: name.into(),
            ret: ret.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            is_static: false,
            is_varargs: false,
            body: Body::User(Rc::new(body)),
        }
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn varargs(mut self) -> Self {
        self.is_varargs = true;
        self
    }

    fn builtin(name: &str, ret: &str, params: &[&str], builtin: Builtin) -> Self {
        MethodSpec {
            name: name.into(),
            ret: ret.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            is_static: false,
            is_varargs: false,
            body: Body::Builtin(builtin),
        }
    }
}

pub struct ClassSpec {
    name: String,
    superclass: Option<String>,
    methods: Vec<MethodSpec>,
    ctors: Vec<MethodSpec>,
    fields: Vec<(String, String, bool, MockVal)>,
}

impl ClassSpec {
    pub fn new(name: &str) -> Self {
        ClassSpec {
            name: name.into(),
            superclass: Some("java.lang.Object".into()),
            methods: Vec::new(),
            ctors: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, name: &str) -> Self {
        self.superclass = Some(name.into());
        self
    }

    fn rootless(mut self) -> Self {
        self.superclass = None;
        self
    }

    pub fn method(mut self, m: MethodSpec) -> Self {
        self.methods.push(m);
        self
    }

    pub fn ctor(
        mut self,
        params: &[&str],
        body: impl Fn(&MockCtx, Option<ObjId>, &[MockVal]) -> MockVal + 'static,
    ) -> Self {
        self.ctors.push(MethodSpec::new("<init>", "void", params, body));
        self
    }

    pub fn field(mut self, name: &str, ty: &str, initial: MockVal) -> Self {
        self.fields.push((name.into(), ty.into(), false, initial));
        self
    }

    pub fn static_field(mut self, name: &str, ty: &str, initial: MockVal) -> Self {
        self.fields.push((name.into(), ty.into(), true, initial));
        self
    }
}

// =========================================================================
// TestVm
// =========================================================================

pub struct TestVm {
    state: Box<RefCell<VmState>>,
    _table: Box<jni::JNINativeInterface_>,
    _vm_table: Box<jni::JNIInvokeInterface_>,
    env_block: Box<EnvBlock>,
    vm_block: Box<VmBlock>,
}

impl TestVm {
    pub fn new() -> TestVm {
        let state = Box::new(RefCell::new(VmState {
            classes: Vec::new(),
            class_by_name: HashMap::new(),
            objects: Vec::new(),
            frames: vec![Vec::new()],
            globals: Vec::new(),
            weaks: Vec::new(),
            pending: None,
            methods: HashMap::new(),
            fields: HashMap::new(),
            cstrings: HashSet::new(),
            wchars: HashMap::new(),
            pinned: HashMap::new(),
            loadable: HashSet::new(),
            call_log: Vec::new(),
            vm_ptr: std::ptr::null_mut(),
            env_ptr: std::ptr::null_mut(),
        }));

        let table = Box::new(make_table());
        let vm_table = Box::new(jni::JNIInvokeInterface_ {
            reserved0: std::ptr::null_mut(),
            reserved1: std::ptr::null_mut(),
            reserved2: std::ptr::null_mut(),
            DestroyJavaVM: vm_destroy,
            AttachCurrentThread: vm_attach,
            DetachCurrentThread: vm_detach,
            GetEnv: vm_get_env,
            AttachCurrentThreadAsDaemon: vm_attach,
        });

        let mut env_block = Box::new(EnvBlock {
            table: &*table,
            state: &*state,
        });
        let env_ptr = &mut env_block.table as *mut jni::JNIEnv;

        let mut vm_block = Box::new(VmBlock {
            table: &*vm_table,
            env: env_ptr,
        });
        let vm_ptr = &mut vm_block.table as *mut jni::JavaVM;

        {
            let mut s = state.borrow_mut();
            s.vm_ptr = vm_ptr;
            s.env_ptr = env_ptr;
        }

        let vm = TestVm {
            state,
            _table: table,
            _vm_table: vm_table,
            env_block,
            vm_block,
        };
        vm.register_builtins();
        vm
    }

    pub fn env(&self) -> *mut jni::JNIEnv {
        &self.env_block.table as *const jni::JNIEnv as *mut jni::JNIEnv
    }

    pub fn raw_vm(&self) -> *mut jni::JavaVM {
        &self.vm_block.table as *const jni::JavaVM as *mut jni::JavaVM
    }

    fn register_builtins(&self) {
        self.register(ClassSpec::new("java.lang.Object").rootless().method(
            MethodSpec::builtin("toString", "java.lang.String", &[], Builtin::ObjectToString),
        ));
        self.register(
            ClassSpec::new("java.lang.Class")
                .method(MethodSpec::builtin(
                    "getName",
                    "java.lang.String",
                    &[],
                    Builtin::ClassGetName,
                ))
                .method(MethodSpec::builtin(
                    "getDeclaredMethods",
                    "java.lang.reflect.Method[]",
                    &[],
                    Builtin::ClassDeclaredMethods,
                ))
                .method(MethodSpec::builtin(
                    "getDeclaredFields",
                    "java.lang.reflect.Field[]",
                    &[],
                    Builtin::ClassDeclaredFields,
                ))
                .method(MethodSpec::builtin(
                    "getDeclaredConstructors",
                    "java.lang.reflect.Constructor[]",
                    &[],
                    Builtin::ClassDeclaredCtors,
                )),
        );
        self.register(
            ClassSpec::new("java.lang.reflect.Method")
                .method(MethodSpec::builtin(
                    "getName",
                    "java.lang.String",
                    &[],
                    Builtin::MethodGetName,
                ))
                .method(MethodSpec::builtin(
                    "getGenericReturnType",
                    "java.lang.reflect.Type",
                    &[],
                    Builtin::MethodReturnType,
                ))
                .method(MethodSpec::builtin(
                    "getGenericParameterTypes",
                    "java.lang.reflect.Type[]",
                    &[],
                    Builtin::MethodParamTypes,
                ))
                .method(MethodSpec::builtin(
                    "getModifiers",
                    "int",
                    &[],
                    Builtin::MethodGetModifiers,
                ))
                .method(MethodSpec::builtin(
                    "isVarArgs",
                    "boolean",
                    &[],
                    Builtin::MethodIsVarArgs,
                )),
        );
        self.register(
            ClassSpec::new("java.lang.reflect.Field")
                .method(MethodSpec::builtin(
                    "getName",
                    "java.lang.String",
                    &[],
                    Builtin::FieldGetName,
                ))
                .method(MethodSpec::builtin(
                    "getGenericType",
                    "java.lang.reflect.Type",
                    &[],
                    Builtin::FieldGenericType,
                ))
                .method(MethodSpec::builtin(
                    "getModifiers",
                    "int",
                    &[],
                    Builtin::FieldGetModifiers,
                )),
        );
        self.register(
            ClassSpec::new("java.lang.reflect.Constructor")
                .method(MethodSpec::builtin(
                    "getGenericParameterTypes",
                    "java.lang.reflect.Type[]",
                    &[],
                    Builtin::CtorParamTypes,
                ))
                .method(MethodSpec::builtin(
                    "isVarArgs",
                    "boolean",
                    &[],
                    Builtin::CtorIsVarArgs,
                )),
        );
        self.register(
            ClassSpec::new("java.lang.reflect.Modifier").static_field(
                "STATIC",
                "int",
                MockVal::Int(MODIFIER_STATIC),
            ),
        );
        self.register(ClassSpec::new("java.lang.reflect.Type").method(MethodSpec::builtin(
            "getTypeName",
            "java.lang.String",
            &[],
            Builtin::TypeGetTypeName,
        )));
        self.register(ClassSpec::new("java.lang.ClassLoader").method(MethodSpec::builtin(
            "loadClass",
            "java.lang.Class",
            &["java.lang.String"],
            Builtin::LoaderLoadClass,
        )));
        self.register(ClassSpec::new("java.lang.RuntimeException"));
        self.register(
            ClassSpec::new("java.lang.String")
                .method(MethodSpec::builtin(
                    "length",
                    "int",
                    &[],
                    Builtin::StringLength,
                ))
                .ctor_builtin(&["java.lang.String"], Builtin::StringCtor),
        );
    }

    pub fn register(&self, spec: ClassSpec) {
        let mut state = self.state.borrow_mut();
        let superclass = spec
            .superclass
            .as_ref()
            .map(|s| *state.class_by_name.get(s).expect("superclass not registered"));

        let make_def = |m: MethodSpec| {
            Rc::new(MethodDef {
                record: UnsafeCell::new([0u8; 64]),
                name: m.name,
                is_static: m.is_static,
                is_varargs: m.is_varargs,
                ret: m.ret,
                params: m.params,
                body: m.body,
            })
        };

        let methods: Vec<Rc<MethodDef>> = spec.methods.into_iter().map(make_def).collect();
        let ctors: Vec<Rc<MethodDef>> = spec.ctors.into_iter().map(make_def).collect();
        let fields: Vec<Rc<FieldDef>> = spec
            .fields
            .iter()
            .map(|(name, ty, is_static, _)| {
                Rc::new(FieldDef {
                    name: name.clone(),
                    is_static: *is_static,
                    ty: ty.clone(),
                })
            })
            .collect();

        for def in methods.iter().chain(ctors.iter()) {
            state.methods.insert(Rc::as_ptr(def) as usize, Rc::clone(def));
        }
        for def in &fields {
            state.fields.insert(Rc::as_ptr(def) as usize, Rc::clone(def));
        }

        let statics = spec
            .fields
            .iter()
            .filter(|(_, _, is_static, _)| *is_static)
            .map(|(name, _, _, initial)| (name.clone(), initial.clone()))
            .collect();
        let field_defaults = spec
            .fields
            .iter()
            .filter(|(_, _, is_static, _)| !*is_static)
            .map(|(name, _, _, initial)| (name.clone(), initial.clone()))
            .collect();

        let idx = state.classes.len();
        let class_obj = state.push_obj(HeapObj::Class(idx));
        state.classes.push(ClassRt {
            name: spec.name.clone(),
            superclass,
            methods,
            ctors,
            fields,
            statics,
            field_defaults,
            class_obj,
        });
        state.class_by_name.insert(spec.name, idx);
    }

    /// The fake loader resolves only names passed here.
    pub fn allow_load(&self, name: &str) {
        self.state.borrow_mut().loadable.insert(name.to_string());
    }

    /// A `java.lang.ClassLoader` instance handle in the base frame.
    pub fn new_loader(&self) -> jni::jobject {
        let mut state = self.state.borrow_mut();
        let class = state.class_by_name["java.lang.ClassLoader"];
        let obj = state.push_obj(HeapObj::Instance {
            class,
            fields: HashMap::new(),
        });
        state.alloc_ref(obj)
    }

    /// A bare instance handle of a registered class, in the base frame.
    pub fn make_instance(&self, class_name: &str) -> jni::jobject {
        make_instance_raw(self.env(), class_name)
    }

    pub fn global_count(&self) -> usize {
        self.state.borrow().globals.len()
    }

    pub fn pending_exception(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.state.borrow().call_log.clone()
    }

    pub fn clear_call_log(&self) {
        self.state.borrow_mut().call_log.clear();
    }
}

impl ClassSpec {
    fn ctor_builtin(mut self, params: &[&str], builtin: Builtin) -> Self {
        self.ctors
            .push(MethodSpec::builtin("<init>", "void", params, builtin));
        self
    }
}

/// Creates an instance of `class_name` and hands back a base-frame local
/// reference; usable from plain fn pointers (the fake dalvik symbols).
pub fn make_instance_raw(env: *mut jni::JNIEnv, class_name: &str) -> jni::jobject {
    let cell = st(env);
    let mut state = cell.borrow_mut();
    let class = *state
        .class_by_name
        .get(class_name)
        .expect("class not registered");
    let fields: HashMap<String, MockVal> =
        state.classes[class].field_defaults.iter().cloned().collect();
    let obj = state.push_obj(HeapObj::Instance { class, fields });
    state.alloc_ref(obj)
}

fn make_table() -> jni::JNINativeInterface_ {
    let n = std::ptr::null_mut::<c_void>();
    jni::JNINativeInterface_ {
        reserved0: n,
        reserved1: n,
        reserved2: n,
        reserved3: n,
        GetVersion: get_version,
        DefineClass: n,
        FindClass: find_class,
        FromReflectedMethod: from_reflected_method,
        FromReflectedField: from_reflected_field,
        ToReflectedMethod: n,
        GetSuperclass: get_superclass,
        IsAssignableFrom: is_assignable_from,
        ToReflectedField: n,
        Throw: throw,
        ThrowNew: throw_new,
        ExceptionOccurred: exception_occurred,
        ExceptionDescribe: exception_describe,
        ExceptionClear: exception_clear,
        FatalError: n,
        PushLocalFrame: push_local_frame,
        PopLocalFrame: pop_local_frame,
        NewGlobalRef: new_global_ref,
        DeleteGlobalRef: delete_global_ref,
        DeleteLocalRef: delete_local_ref,
        IsSameObject: is_same_object,
        NewLocalRef: new_local_ref,
        EnsureLocalCapacity: ensure_local_capacity,
        AllocObject: alloc_object,
        NewObject: n,
        NewObjectV: n,
        NewObjectA: new_object_a,
        GetObjectClass: get_object_class,
        IsInstanceOf: is_instance_of,
        GetMethodID: get_method_id,
        CallObjectMethod: n,
        CallObjectMethodV: n,
        CallObjectMethodA: call_object_a,
        CallBooleanMethod: n,
        CallBooleanMethodV: n,
        CallBooleanMethodA: call_boolean_a,
        CallByteMethod: n,
        CallByteMethodV: n,
        CallByteMethodA: call_byte_a,
        CallCharMethod: n,
        CallCharMethodV: n,
        CallCharMethodA: call_char_a,
        CallShortMethod: n,
        CallShortMethodV: n,
        CallShortMethodA: call_short_a,
        CallIntMethod: n,
        CallIntMethodV: n,
        CallIntMethodA: call_int_a,
        CallLongMethod: n,
        CallLongMethodV: n,
        CallLongMethodA: call_long_a,
        CallFloatMethod: n,
        CallFloatMethodV: n,
        CallFloatMethodA: call_float_a,
        CallDoubleMethod: n,
        CallDoubleMethodV: n,
        CallDoubleMethodA: call_double_a,
        CallVoidMethod: n,
        CallVoidMethodV: n,
        CallVoidMethodA: call_void_a,
        CallNonvirtualObjectMethod: n,
        CallNonvirtualObjectMethodV: n,
        CallNonvirtualObjectMethodA: call_nonvirtual_object_a,
        CallNonvirtualBooleanMethod: n,
        CallNonvirtualBooleanMethodV: n,
        CallNonvirtualBooleanMethodA: call_nonvirtual_boolean_a,
        CallNonvirtualByteMethod: n,
        CallNonvirtualByteMethodV: n,
        CallNonvirtualByteMethodA: call_nonvirtual_byte_a,
        CallNonvirtualCharMethod: n,
        CallNonvirtualCharMethodV: n,
        CallNonvirtualCharMethodA: call_nonvirtual_char_a,
        CallNonvirtualShortMethod: n,
        CallNonvirtualShortMethodV: n,
        CallNonvirtualShortMethodA: call_nonvirtual_short_a,
        CallNonvirtualIntMethod: n,
        CallNonvirtualIntMethodV: n,
        CallNonvirtualIntMethodA: call_nonvirtual_int_a,
        CallNonvirtualLongMethod: n,
        CallNonvirtualLongMethodV: n,
        CallNonvirtualLongMethodA: call_nonvirtual_long_a,
        CallNonvirtualFloatMethod: n,
        CallNonvirtualFloatMethodV: n,
        CallNonvirtualFloatMethodA: call_nonvirtual_float_a,
        CallNonvirtualDoubleMethod: n,
        CallNonvirtualDoubleMethodV: n,
        CallNonvirtualDoubleMethodA: call_nonvirtual_double_a,
        CallNonvirtualVoidMethod: n,
        CallNonvirtualVoidMethodV: n,
        CallNonvirtualVoidMethodA: call_nonvirtual_void_a,
        GetFieldID: get_field_id,
        GetObjectField: get_object_field,
        GetBooleanField: get_boolean_field,
        GetByteField: get_byte_field,
        GetCharField: get_char_field,
        GetShortField: get_short_field,
        GetIntField: get_int_field,
        GetLongField: get_long_field,
        GetFloatField: get_float_field,
        GetDoubleField: get_double_field,
        SetObjectField: set_object_field,
        SetBooleanField: set_boolean_field,
        SetByteField: set_byte_field,
        SetCharField: set_char_field,
        SetShortField: set_short_field,
        SetIntField: set_int_field,
        SetLongField: set_long_field,
        SetFloatField: set_float_field,
        SetDoubleField: set_double_field,
        GetStaticMethodID: get_static_method_id,
        CallStaticObjectMethod: n,
        CallStaticObjectMethodV: n,
        CallStaticObjectMethodA: call_static_object_a,
        CallStaticBooleanMethod: n,
        CallStaticBooleanMethodV: n,
        CallStaticBooleanMethodA: call_static_boolean_a,
        CallStaticByteMethod: n,
        CallStaticByteMethodV: n,
        CallStaticByteMethodA: call_static_byte_a,
        CallStaticCharMethod: n,
        CallStaticCharMethodV: n,
        CallStaticCharMethodA: call_static_char_a,
        CallStaticShortMethod: n,
        CallStaticShortMethodV: n,
        CallStaticShortMethodA: call_static_short_a,
        CallStaticIntMethod: n,
        CallStaticIntMethodV: n,
        CallStaticIntMethodA: call_static_int_a,
        CallStaticLongMethod: n,
        CallStaticLongMethodV: n,
        CallStaticLongMethodA: call_static_long_a,
        CallStaticFloatMethod: n,
        CallStaticFloatMethodV: n,
        CallStaticFloatMethodA: call_static_float_a,
        CallStaticDoubleMethod: n,
        CallStaticDoubleMethodV: n,
        CallStaticDoubleMethodA: call_static_double_a,
        CallStaticVoidMethod: n,
        CallStaticVoidMethodV: n,
        CallStaticVoidMethodA: call_static_void_a,
        GetStaticFieldID: get_static_field_id,
        GetStaticObjectField: get_static_object_field,
        GetStaticBooleanField: get_static_boolean_field,
        GetStaticByteField: get_static_byte_field,
        GetStaticCharField: get_static_char_field,
        GetStaticShortField: get_static_short_field,
        GetStaticIntField: get_static_int_field,
        GetStaticLongField: get_static_long_field,
        GetStaticFloatField: get_static_float_field,
        GetStaticDoubleField: get_static_double_field,
        SetStaticObjectField: set_static_object_field,
        SetStaticBooleanField: set_static_boolean_field,
        SetStaticByteField: set_static_byte_field,
        SetStaticCharField: set_static_char_field,
        SetStaticShortField: set_static_short_field,
        SetStaticIntField: set_static_int_field,
        SetStaticLongField: set_static_long_field,
        SetStaticFloatField: set_static_float_field,
        SetStaticDoubleField: set_static_double_field,
        NewString: new_string,
        GetStringLength: get_string_length,
        GetStringChars: get_string_chars,
        ReleaseStringChars: release_string_chars,
        NewStringUTF: new_string_utf,
        GetStringUTFLength: get_string_utf_length,
        GetStringUTFChars: get_string_utf_chars,
        ReleaseStringUTFChars: release_string_utf_chars,
        GetArrayLength: get_array_length,
        NewObjectArray: new_object_array,
        GetObjectArrayElement: get_object_array_element,
        SetObjectArrayElement: set_object_array_element,
        NewBooleanArray: new_boolean_array,
        NewByteArray: new_byte_array,
        NewCharArray: new_char_array,
        NewShortArray: new_short_array,
        NewIntArray: new_int_array,
        NewLongArray: new_long_array,
        NewFloatArray: new_float_array,
        NewDoubleArray: new_double_array,
        GetBooleanArrayElements: get_boolean_array_elements,
        GetByteArrayElements: get_byte_array_elements,
        GetCharArrayElements: get_char_array_elements,
        GetShortArrayElements: get_short_array_elements,
        GetIntArrayElements: get_int_array_elements,
        GetLongArrayElements: get_long_array_elements,
        GetFloatArrayElements: get_float_array_elements,
        GetDoubleArrayElements: get_double_array_elements,
        ReleaseBooleanArrayElements: release_boolean_array_elements,
        ReleaseByteArrayElements: release_byte_array_elements,
        ReleaseCharArrayElements: release_char_array_elements,
        ReleaseShortArrayElements: release_short_array_elements,
        ReleaseIntArrayElements: release_int_array_elements,
        ReleaseLongArrayElements: release_long_array_elements,
        ReleaseFloatArrayElements: release_float_array_elements,
        ReleaseDoubleArrayElements: release_double_array_elements,
        GetBooleanArrayRegion: get_boolean_array_region,
        GetByteArrayRegion: get_byte_array_region,
        GetCharArrayRegion: get_char_array_region,
        GetShortArrayRegion: get_short_array_region,
        GetIntArrayRegion: get_int_array_region,
        GetLongArrayRegion: get_long_array_region,
        GetFloatArrayRegion: get_float_array_region,
        GetDoubleArrayRegion: get_double_array_region,
        SetBooleanArrayRegion: set_boolean_array_region,
        SetByteArrayRegion: set_byte_array_region,
        SetCharArrayRegion: set_char_array_region,
        SetShortArrayRegion: set_short_array_region,
        SetIntArrayRegion: set_int_array_region,
        SetLongArrayRegion: set_long_array_region,
        SetFloatArrayRegion: set_float_array_region,
        SetDoubleArrayRegion: set_double_array_region,
        RegisterNatives: n,
        UnregisterNatives: n,
        MonitorEnter: monitor_enter,
        MonitorExit: monitor_exit,
        GetJavaVM: get_java_vm,
        GetStringRegion: n,
        GetStringUTFRegion: n,
        GetPrimitiveArrayCritical: n,
        ReleasePrimitiveArrayCritical: n,
        GetStringCritical: n,
        ReleaseStringCritical: n,
        NewWeakGlobalRef: new_weak_global_ref,
        DeleteWeakGlobalRef: delete_weak_global_ref,
        ExceptionCheck: exception_check,
        NewDirectByteBuffer: n,
        GetDirectBufferAddress: n,
        GetDirectBufferCapacity: n,
        GetObjectRefType: n,
    }
}

// =========================================================================
// VmApi fixtures
// =========================================================================

/// Offsets into the 64-byte scratch record carried by every mock method.
pub const TEST_ART_SPEC: ArtMethodSpec = ArtMethodSpec {
    size: 32,
    jni_code: 8,
    quick_code: 16,
    interpreter_code: 24,
    access_flags: 4,
};

pub unsafe extern "C" fn identity_clone(obj: *mut c_void, _thread: *mut c_void) -> *mut c_void {
    obj
}

pub unsafe extern "C" fn fake_current_thread() -> *mut c_void {
    0x1000 as *mut c_void
}

pub unsafe extern "C" fn fake_interpreter_bridge() {}

/// Owned `Runtime`/`ClassLinker` blocks the ART fixture points into.
pub struct ArtFixture {
    runtime: Box<[u8; 64]>,
    class_linker: Box<[u8; 64]>,
}

pub const RUNTIME_CLASS_LINKER_OFFSET: usize = 16;
pub const CLASS_LINKER_TRAMPOLINE_OFFSET: usize = 24;
pub const FAKE_QUICK_TRAMPOLINE: usize = 0x7ea9_0000;

impl ArtFixture {
    pub fn new() -> ArtFixture {
        let mut fixture = ArtFixture {
            runtime: Box::new([0u8; 64]),
            class_linker: Box::new([0u8; 64]),
        };
        let linker_ptr = fixture.class_linker.as_ptr() as usize;
        fixture.runtime[RUNTIME_CLASS_LINKER_OFFSET..RUNTIME_CLASS_LINKER_OFFSET + 8]
            .copy_from_slice(&linker_ptr.to_ne_bytes());
        fixture.class_linker[CLASS_LINKER_TRAMPOLINE_OFFSET..CLASS_LINKER_TRAMPOLINE_OFFSET + 8]
            .copy_from_slice(&FAKE_QUICK_TRAMPOLINE.to_ne_bytes());
        fixture
    }

    pub fn quick_trampoline(&self) -> usize {
        FAKE_QUICK_TRAMPOLINE
    }

    /// Zeroes the class linker's trampoline slot, for failure-path tests.
    pub fn clear_trampoline(&mut self) {
        self.class_linker[CLASS_LINKER_TRAMPOLINE_OFFSET..CLASS_LINKER_TRAMPOLINE_OFFSET + 8]
            .fill(0);
    }

    pub fn art_api(&self) -> ArtApi {
        ArtApi {
            interpreter_to_compiled_code_bridge: fake_interpreter_bridge as *mut c_void,
            runtime_instance: self.runtime.as_ptr() as *mut c_void,
            object_clone: Some(identity_clone),
            thread_current_from_gdb: Some(fake_current_thread),
            method_spec: TEST_ART_SPEC,
            runtime_spec: artbridge::sys::art::ArtRuntimeSpec {
                class_linker: RUNTIME_CLASS_LINKER_OFFSET,
            },
            class_linker_spec: artbridge::sys::art::ArtClassLinkerSpec {
                quick_generic_jni_trampoline: CLASS_LINKER_TRAMPOLINE_OFFSET,
            },
        }
    }
}

pub fn art_vm_api(vm: &TestVm, fixture: &ArtFixture) -> VmApi {
    VmApi {
        flavor: RuntimeFlavor::Art,
        vm: vm.raw_vm(),
        dalvik: None,
        art: Some(fixture.art_api()),
    }
}

// ---- Dalvik fixtures -----------------------------------------------------

/// (method ptr, bridge code ptr) pairs recorded by the fake
/// `dvmUseJNIBridge`.
pub static BRIDGE_LOG: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
/// handle ptr -> fake Object* mapping for `dvmDecodeIndirectRef`.
pub static DECODE_MAP: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
/// Heap bounds served by the fake `dvmHeapSourceGetBase/Limit`.
pub static HEAP_RANGE: Mutex<(usize, usize)> = Mutex::new((0, 0));
/// Env pointer + class name the fake `addLocalReference` materializes with.
pub static ADD_LOCAL_ENV: Mutex<usize> = Mutex::new(0);
pub static ADD_LOCAL_CLASS: Mutex<String> = Mutex::new(String::new());

pub unsafe extern "C" fn fake_decode_indirect_ref(
    _thread: *mut c_void,
    r: jni::jobject,
) -> *mut c_void {
    let map = DECODE_MAP.lock().unwrap();
    map.iter()
        .find(|(h, _)| *h == r as usize)
        .map(|(_, obj)| *obj as *mut c_void)
        .unwrap_or(std::ptr::null_mut())
}

pub unsafe extern "C" fn fake_heap_base() -> *mut c_void {
    HEAP_RANGE.lock().unwrap().0 as *mut c_void
}

pub unsafe extern "C" fn fake_heap_limit() -> *mut c_void {
    HEAP_RANGE.lock().unwrap().1 as *mut c_void
}

pub unsafe extern "C" fn fake_is_valid_object(obj: *mut c_void) -> u8 {
    u8::from(!obj.is_null())
}

pub unsafe extern "C" fn fake_use_jni_bridge(method: *mut c_void, bridge: *mut c_void) {
    BRIDGE_LOG
        .lock()
        .unwrap()
        .push((method as usize, bridge as usize));
}

pub unsafe extern "C" fn fake_add_local_reference(
    _thread: *mut c_void,
    _obj: *mut c_void,
) -> jni::jobject {
    let env = *ADD_LOCAL_ENV.lock().unwrap() as *mut jni::JNIEnv;
    let class = ADD_LOCAL_CLASS.lock().unwrap().clone();
    make_instance_raw(env, &class)
}

pub fn dalvik_api(with_add_local: bool) -> DalvikApi {
    DalvikApi {
        decode_indirect_ref: fake_decode_indirect_ref,
        heap_source_get_base: fake_heap_base,
        heap_source_get_limit: fake_heap_limit,
        is_valid_object: fake_is_valid_object,
        use_jni_bridge: fake_use_jni_bridge,
        add_local_reference: Cell::new(if with_add_local {
            Some(fake_add_local_reference)
        } else {
            None
        }),
    }
}

pub fn dalvik_vm_api(vm: &TestVm) -> VmApi {
    VmApi {
        flavor: RuntimeFlavor::Dalvik,
        vm: vm.raw_vm(),
        dalvik: Some(dalvik_api(true)),
        art: None,
    }
}
