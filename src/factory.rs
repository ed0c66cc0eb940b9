//! Class cache and wrapper factory.
//!
//! The [`Factory`] is the explicit context every bridge operation runs
//! against: it owns the class-wrapper arena (name-indexed, the sole owner;
//! superclass links are arena ids), the adapter registry, the user class
//! loader, the weak instance registry, and all hook bookkeeping. Creation
//! and [`Factory::dispose`] are paired; disposal restores every hook and
//! vtable and releases every pinned global reference exactly once.

use crate::adapter::{AdapterRegistry, Value};
use crate::dispatch::{MethodDesc, OverloadGroup};
use crate::env::{JniEnv, Reflect};
use crate::error::{BridgeError, Result};
use crate::hook;
use crate::members::{self, FieldDesc, Members};
use crate::sys::jni::{self, jvalue};
use crate::vm::{RuntimeFlavor, VmApi};
use log::{debug, info};
use once_cell::unsync::OnceCell;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Index of a wrapper in the factory's arena.
pub type ClassId = usize;

// =========================================================================
// ClassWrapper
// =========================================================================

/// One Java class, pinned and cached for the life of the factory.
pub struct ClassWrapper {
    id: ClassId,
    name: String,
    class_ref: jni::jclass,
    parent: Option<ClassId>,
    members: OnceCell<Members>,
}

impl ClassWrapper {
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully-qualified dotted name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pinned global reference to the `java.lang.Class` object.
    pub fn class_ref(&self) -> jni::jclass {
        self.class_ref
    }

    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// The member table, materialized on first touch.
    pub fn members(&self, factory: &Factory, env: &JniEnv) -> Result<&Members> {
        self.members
            .get_or_try_init(|| members::materialize(factory, env, self))
    }

    /// Looks up a member name on this wrapper, falling through to the
    /// superclass chain.
    pub fn property(
        &self,
        factory: &Factory,
        env: &JniEnv,
        name: &str,
    ) -> Result<(Option<Rc<OverloadGroup>>, Option<Rc<FieldDesc>>)> {
        let mut current = Some(self.id);
        while let Some(id) = current {
            let wrapper = factory.wrapper_by_id(id)?;
            let members = wrapper.members(factory, env)?;
            if let Some(prop) = members.properties.get(name) {
                return Ok((prop.method.clone(), prop.field.clone()));
            }
            current = wrapper.parent;
        }
        Err(BridgeError::NoSuchMember {
            class: self.name.clone(),
            name: name.into(),
        })
    }

    /// The method dispatcher for `name`.
    pub fn method(&self, factory: &Factory, env: &JniEnv, name: &str) -> Result<Rc<OverloadGroup>> {
        match self.property(factory, env, name)? {
            (Some(group), _) => {
                // A class-view toString reports the viewed class, so an
                // inherited group is re-homed before it is handed out.
                if name == "toString" && group.holder_name != self.name {
                    return Ok(Rc::new(OverloadGroup::new(
                        name.to_string(),
                        self.name.clone(),
                        None,
                        group.overloads().to_vec(),
                    )));
                }
                Ok(group)
            }
            _ => Err(BridgeError::NoSuchMember {
                class: self.name.clone(),
                name: name.into(),
            }),
        }
    }

    /// The field descriptor for `name`.
    pub fn field(&self, factory: &Factory, env: &JniEnv, name: &str) -> Result<Rc<FieldDesc>> {
        match self.property(factory, env, name)? {
            (_, Some(field)) => Ok(field),
            _ => Err(BridgeError::NoSuchMember {
                class: self.name.clone(),
                name: name.into(),
            }),
        }
    }

    /// `$new`: selects a constructor overload and builds an instance.
    pub fn new_instance(
        &self,
        factory: &Factory,
        env: &JniEnv,
        args: &[Value],
    ) -> Result<Rc<ClassInstance>> {
        let members = self.members(factory, env)?;
        match members.ctor_new.call(factory, env, None, args)? {
            Value::Object(instance) => Ok(instance),
            _ => Err(BridgeError::BadCast(self.name.clone())),
        }
    }

    /// `$alloc`: allocates without running any `<init>`.
    pub fn alloc(&self, factory: &Factory, env: &JniEnv) -> Result<Rc<ClassInstance>> {
        let frame = env.push_frame(2)?;
        let obj = match env.alloc_object(self.class_ref) {
            Some(obj) => obj,
            None => {
                let err = env
                    .check_exception()
                    .err()
                    .unwrap_or(BridgeError::OutOfMemory);
                return Err(crate::dispatch::escalate(env, frame, err));
            }
        };
        let instance = factory.cast_to_wrapper(env, obj, self);
        frame.pop();
        instance
    }

    /// `$init`: runs a constructor on an already-allocated instance.
    pub fn init(
        &self,
        factory: &Factory,
        env: &JniEnv,
        instance: &Rc<ClassInstance>,
        args: &[Value],
    ) -> Result<()> {
        let members = self.members(factory, env)?;
        members
            .ctor_init
            .call(factory, env, Some(instance), args)
            .map(|_| ())
    }

    /// `$isSameObject` for the class object itself.
    pub fn is_same_object(&self, env: &JniEnv, other: jni::jobject) -> bool {
        env.is_same_object(self.class_ref, other)
    }
}

impl std::fmt::Debug for ClassWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassWrapper")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

// =========================================================================
// ClassInstance
// =========================================================================

/// One pinned Java object, tied to the wrapper it was cast through.
pub struct ClassInstance {
    wrapper: Rc<ClassWrapper>,
    handle: Cell<jni::jobject>,
    class_ref: Cell<jni::jobject>,
}

impl ClassInstance {
    /// The pinned global reference, or null after disposal.
    pub fn handle(&self) -> jni::jobject {
        self.handle.get()
    }

    pub fn wrapper(&self) -> &Rc<ClassWrapper> {
        &self.wrapper
    }

    pub fn class_name(&self) -> &str {
        self.wrapper.name()
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.get().is_null()
    }

    pub fn is_same_object(&self, env: &JniEnv, other: &ClassInstance) -> bool {
        env.is_same_object(self.handle.get(), other.handle.get())
    }

    /// Reads the instance as a host string; `None` when it isn't one.
    pub fn as_string(&self, env: &JniEnv) -> Option<String> {
        env.get_string_utf(self.handle.get())
    }

    /// Releases both pinned globals. Safe to call more than once; later
    /// calls are no-ops.
    pub fn dispose(&self, env: &JniEnv) {
        let handle = self.handle.replace(std::ptr::null_mut());
        if !handle.is_null() {
            env.delete_global_ref(handle);
        }
        let class_ref = self.class_ref.replace(std::ptr::null_mut());
        if !class_ref.is_null() {
            env.delete_global_ref(class_ref);
        }
    }
}

impl std::fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassInstance")
            .field("class", &self.wrapper.name)
            .field("handle", &self.handle.get())
            .finish()
    }
}

// =========================================================================
// Factory
// =========================================================================

/// Process-wide bridge state: class cache, loader, hooks, instances.
pub struct Factory {
    api: Rc<VmApi>,
    adapters: AdapterRegistry,
    reflect: OnceCell<Reflect>,
    names: RefCell<HashMap<String, ClassId>>,
    arena: RefCell<Vec<Rc<ClassWrapper>>>,
    loader: Cell<jni::jobject>,
    loader_load_class: Cell<jni::jmethodID>,
    instances: RefCell<Vec<Weak<ClassInstance>>>,
    hooked: RefCell<Vec<Rc<MethodDesc>>>,
    dalvik_classes: RefCell<HashMap<usize, hook::dalvik::PatchedClass>>,
    disposed: Cell<bool>,
}

impl Factory {
    pub fn new(api: Rc<VmApi>) -> Factory {
        Factory {
            api,
            adapters: AdapterRegistry::new(),
            reflect: OnceCell::new(),
            names: RefCell::new(HashMap::new()),
            arena: RefCell::new(Vec::new()),
            loader: Cell::new(std::ptr::null_mut()),
            loader_load_class: Cell::new(std::ptr::null_mut()),
            instances: RefCell::new(Vec::new()),
            hooked: RefCell::new(Vec::new()),
            dalvik_classes: RefCell::new(HashMap::new()),
            disposed: Cell::new(false),
        }
    }

    pub fn api(&self) -> &VmApi {
        &self.api
    }

    pub fn flavor(&self) -> RuntimeFlavor {
        self.api.flavor
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// The reflective-ID cache, resolved on first use.
    pub fn reflect(&self, env: &JniEnv) -> Result<&Reflect> {
        self.reflect.get_or_try_init(|| Reflect::resolve(env))
    }

    // ---------------------------------------------------------------------
    // Class resolution
    // ---------------------------------------------------------------------

    /// `use(name)`: the cached wrapper for a fully-qualified class name,
    /// constructing it (and its superclass chain) on first sight.
    pub fn use_class(&self, env: &JniEnv, name: &str) -> Result<Rc<ClassWrapper>> {
        let canonical = name.replace('/', ".");
        if let Some(&id) = self.names.borrow().get(&canonical) {
            return self.wrapper_by_id(id);
        }

        let handle = self.resolve_class_handle(env, &canonical)?;
        let wrapper = self.ensure_wrapper(env, handle);
        env.delete_local_ref(handle);
        let wrapper = wrapper?;

        // Alias the requested spelling; the reflected name is cached by
        // ensure_wrapper itself.
        self.names.borrow_mut().insert(canonical, wrapper.id);
        Ok(wrapper)
    }

    pub fn wrapper_by_id(&self, id: ClassId) -> Result<Rc<ClassWrapper>> {
        self.arena
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::ClassNotFound(format!("#{id}")))
    }

    /// Resolves a class handle through the installed loader, or through
    /// `FindClass` when none is set. Returns a local reference.
    pub fn resolve_class_handle(&self, env: &JniEnv, dotted: &str) -> Result<jni::jclass> {
        let not_found = || BridgeError::ClassNotFound(dotted.to_string());

        let loader = self.loader.get();
        if !loader.is_null() {
            let load_class = self.loader_load_class_id(env)?;
            let jname = env.new_string_utf(&binary_name(dotted)).ok_or_else(not_found)?;
            let cls = env.call_object_method(loader, load_class, &[jvalue { l: jname }]);
            env.delete_local_ref(jname);
            if env.exception_check() {
                env.exception_clear();
                return Err(not_found());
            }
            if cls.is_null() {
                return Err(not_found());
            }
            return Ok(cls);
        }

        match env.find_class(&descriptor_name(dotted)) {
            Some(cls) => Ok(cls),
            None => {
                if env.exception_check() {
                    env.exception_clear();
                }
                Err(not_found())
            }
        }
    }

    fn loader_load_class_id(&self, env: &JniEnv) -> Result<jni::jmethodID> {
        let cached = self.loader_load_class.get();
        if !cached.is_null() {
            return Ok(cached);
        }
        let cls = env
            .find_class("java/lang/ClassLoader")
            .ok_or_else(|| BridgeError::ClassNotFound("java.lang.ClassLoader".into()))?;
        let mid = env
            .get_method_id(cls, "loadClass", "(Ljava/lang/String;)Ljava/lang/Class;")
            .ok_or_else(|| BridgeError::NoSuchMember {
                class: "java.lang.ClassLoader".into(),
                name: "loadClass".into(),
            })?;
        env.delete_local_ref(cls);
        self.loader_load_class.set(mid);
        Ok(mid)
    }

    /// Builds (or finds) the wrapper for a live class handle, parents first.
    fn ensure_wrapper(&self, env: &JniEnv, handle: jni::jclass) -> Result<Rc<ClassWrapper>> {
        let reflect = self.reflect(env)?;
        let name = {
            let jname = env.call_object_method(handle, reflect.class_get_name, &[]);
            env.check_exception()?;
            let name = env
                .get_string_utf(jname)
                .ok_or_else(|| BridgeError::ClassNotFound("<unnamed>".into()))?;
            env.delete_local_ref(jname);
            name
        };

        if let Some(&id) = self.names.borrow().get(&name) {
            return self.wrapper_by_id(id);
        }

        let parent = match env.get_superclass(handle) {
            Some(sup) => {
                let parent = self.ensure_wrapper(env, sup);
                env.delete_local_ref(sup);
                Some(parent?.id)
            }
            None => None,
        };

        let class_ref = env.new_global_ref(handle);
        if class_ref.is_null() {
            return Err(BridgeError::OutOfMemory);
        }

        let mut arena = self.arena.borrow_mut();
        let id = arena.len();
        let wrapper = Rc::new(ClassWrapper {
            id,
            name: name.clone(),
            class_ref,
            parent,
            members: OnceCell::new(),
        });
        arena.push(Rc::clone(&wrapper));
        drop(arena);
        self.names.borrow_mut().insert(name.clone(), id);
        debug!("cached class {name}");
        Ok(wrapper)
    }

    // ---------------------------------------------------------------------
    // Instances
    // ---------------------------------------------------------------------

    /// `cast(handle, wrapper)`: pins `handle` as an instance of `wrapper`.
    pub fn cast(
        &self,
        env: &JniEnv,
        handle: jni::jobject,
        wrapper: &Rc<ClassWrapper>,
    ) -> Result<Rc<ClassInstance>> {
        self.cast_to_wrapper(env, handle, wrapper)
    }

    pub(crate) fn cast_to_wrapper(
        &self,
        env: &JniEnv,
        handle: jni::jobject,
        wrapper: &ClassWrapper,
    ) -> Result<Rc<ClassInstance>> {
        if handle.is_null() || !env.is_instance_of(handle, wrapper.class_ref) {
            return Err(BridgeError::BadCast(wrapper.name.clone()));
        }
        let pinned = env.new_global_ref(handle);
        if pinned.is_null() {
            return Err(BridgeError::OutOfMemory);
        }
        let class_pin = env.new_global_ref(wrapper.class_ref);
        if class_pin.is_null() {
            env.delete_global_ref(pinned);
            return Err(BridgeError::OutOfMemory);
        }
        let instance = Rc::new(ClassInstance {
            wrapper: self.wrapper_by_id(wrapper.id)?,
            handle: Cell::new(pinned),
            class_ref: Cell::new(class_pin),
        });
        self.instances.borrow_mut().push(Rc::downgrade(&instance));
        Ok(instance)
    }

    /// Wraps a handle as an instance of the named (declared) class.
    pub fn wrap(
        &self,
        env: &JniEnv,
        class_name: &str,
        handle: jni::jobject,
    ) -> Result<Rc<ClassInstance>> {
        let wrapper = self.use_class(env, class_name)?;
        self.cast_to_wrapper(env, handle, &wrapper)
    }

    /// Like [`Factory::wrap`], for callers that already hold the pinned
    /// class object (the constructor path).
    pub fn wrap_class_ref(
        &self,
        env: &JniEnv,
        _holder_class: jni::jclass,
        holder_name: &str,
        handle: jni::jobject,
    ) -> Result<Rc<ClassInstance>> {
        self.wrap(env, holder_name, handle)
    }

    // ---------------------------------------------------------------------
    // Loader
    // ---------------------------------------------------------------------

    /// The user-installed class loader handle, if any.
    pub fn loader(&self) -> Option<jni::jobject> {
        let l = self.loader.get();
        if l.is_null() {
            None
        } else {
            Some(l)
        }
    }

    /// Installs (or clears) the class loader `use` resolves through.
    pub fn set_loader(&self, env: &JniEnv, loader: Option<jni::jobject>) {
        let old = self.loader.replace(std::ptr::null_mut());
        if !old.is_null() {
            env.delete_global_ref(old);
        }
        if let Some(handle) = loader {
            if !handle.is_null() {
                self.loader.set(env.new_global_ref(handle));
            }
        }
    }

    /// `openClassFile(path)`: the self-hosted DexFile facade.
    pub fn open_class_file(&self, path: &str) -> DexFile {
        DexFile {
            path: path.to_string(),
        }
    }

    // ---------------------------------------------------------------------
    // Hook bookkeeping
    // ---------------------------------------------------------------------

    pub(crate) fn note_hooked(&self, method: &Rc<MethodDesc>) {
        let mut hooked = self.hooked.borrow_mut();
        if !hooked.iter().any(|m| Rc::ptr_eq(m, method)) {
            hooked.push(Rc::clone(method));
        }
    }

    pub(crate) fn note_unhooked(&self, method: &Rc<MethodDesc>) {
        self.hooked.borrow_mut().retain(|m| !Rc::ptr_eq(m, method));
    }

    pub(crate) fn dalvik_classes(
        &self,
    ) -> &RefCell<HashMap<usize, hook::dalvik::PatchedClass>> {
        &self.dalvik_classes
    }

    // ---------------------------------------------------------------------
    // Disposal
    // ---------------------------------------------------------------------

    /// Restores every hook and patched vtable, releases every pinned
    /// global, and clears all caches. The factory is inert afterwards.
    pub fn dispose(&self, env: &JniEnv) {
        if self.disposed.replace(true) {
            return;
        }

        let hooked = self.hooked.take();
        for method in &hooked {
            let _ = hook::uninstall(self, method);
        }
        hook::dalvik::drain_overlays(self);

        for weak in self.instances.take() {
            if let Some(instance) = weak.upgrade() {
                instance.dispose(env);
            }
        }

        self.set_loader(env, None);
        self.loader_load_class.set(std::ptr::null_mut());

        let arena = self.arena.take();
        for wrapper in &arena {
            env.delete_global_ref(wrapper.class_ref);
        }
        self.names.take();

        info!(
            "bridge disposed: {} classes released, {} hooks restored",
            arena.len(),
            hooked.len()
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

// =========================================================================
// DexFile facade
// =========================================================================

/// A dex on disk, driven entirely through the factory's own reflective
/// surface (`java.io.File`, `dalvik.system.DexClassLoader`,
/// `dalvik.system.DexFile`, `android.app.ActivityThread`).
pub struct DexFile {
    path: String,
}

impl DexFile {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Installs a `DexClassLoader` over this file as the factory's loader.
    pub fn load(&self, factory: &Factory, env: &JniEnv) -> Result<()> {
        let cache = app_cache_dir(factory, env)?;

        let parent = match factory.loader() {
            Some(handle) => Value::Object(factory.wrap(env, "java.lang.ClassLoader", handle)?),
            None => Value::Null,
        };

        let loader_cls = factory.use_class(env, "dalvik.system.DexClassLoader")?;
        let loader = loader_cls.new_instance(
            factory,
            env,
            &[
                Value::Str(self.path.clone()),
                Value::Str(cache),
                Value::Null,
                parent,
            ],
        )?;
        factory.set_loader(env, Some(loader.handle()));
        info!("installed DexClassLoader over {}", self.path);
        Ok(())
    }

    /// Enumerates the class names inside this dex.
    pub fn get_class_names(&self, factory: &Factory, env: &JniEnv) -> Result<Vec<String>> {
        let cache = app_cache_dir(factory, env)?;
        let optimized = format!(
            "{}/{}.odex",
            cache,
            self.path.rsplit('/').next().unwrap_or("bridge")
        );

        let dexfile_cls = factory.use_class(env, "dalvik.system.DexFile")?;
        let dex = dexfile_cls.method(factory, env, "loadDex")?.call(
            factory,
            env,
            None,
            &[
                Value::Str(self.path.clone()),
                Value::Str(optimized),
                Value::Int(0),
            ],
        )?;
        let Value::Object(dex) = dex else {
            return Err(BridgeError::ClassNotFound("dalvik.system.DexFile".into()));
        };

        let entries = dex
            .wrapper()
            .method(factory, env, "entries")?
            .call(factory, env, Some(&dex), &[])?;
        let Value::Object(entries) = entries else {
            return Err(BridgeError::ClassNotFound("java.util.Enumeration".into()));
        };

        let has_more = entries.wrapper().method(factory, env, "hasMoreElements")?;
        let next = entries.wrapper().method(factory, env, "nextElement")?;

        let mut names = Vec::new();
        loop {
            match has_more.call(factory, env, Some(&entries), &[])? {
                Value::Boolean(true) => {}
                _ => break,
            }
            let element = next.call(factory, env, Some(&entries), &[])?;
            if let Value::Object(element) = element {
                if let Some(name) = element.as_string(env) {
                    names.push(name);
                }
                element.dispose(env);
            }
        }
        Ok(names)
    }
}

/// The application's cache directory, resolved through `ActivityThread`.
fn app_cache_dir(factory: &Factory, env: &JniEnv) -> Result<String> {
    let at = factory.use_class(env, "android.app.ActivityThread")?;
    let app = at
        .method(factory, env, "currentApplication")?
        .call(factory, env, None, &[])?;
    let Value::Object(app) = app else {
        return Err(BridgeError::ClassNotFound("android.app.Application".into()));
    };

    let dir = app
        .wrapper()
        .method(factory, env, "getCacheDir")?
        .call(factory, env, Some(&app), &[])?;
    let Value::Object(dir) = dir else {
        return Err(BridgeError::ClassNotFound("java.io.File".into()));
    };

    let path = dir
        .wrapper()
        .method(factory, env, "getCanonicalPath")?
        .call(factory, env, Some(&dir), &[])?;
    let path = match path {
        Value::Object(p) => p
            .as_string(env)
            .ok_or_else(|| BridgeError::ClassNotFound("java.lang.String".into()))?,
        Value::Str(p) => p,
        _ => return Err(BridgeError::ClassNotFound("java.lang.String".into())),
    };
    Ok(path)
}

/// `loadClass` wants the binary name (dots, `[L...;` arrays untouched).
fn binary_name(dotted: &str) -> String {
    if let Some(element) = dotted.strip_suffix("[]") {
        let inner = binary_name(element);
        if inner.len() == 1 && "ZBCSIJFD".contains(&inner) {
            return format!("[{inner}");
        }
        if inner.starts_with('[') {
            return format!("[{inner}");
        }
        return format!("[L{inner};");
    }
    match dotted {
        "boolean" => "Z".into(),
        "byte" => "B".into(),
        "char" => "C".into(),
        "short" => "S".into(),
        "int" => "I".into(),
        "long" => "J".into(),
        "float" => "F".into(),
        "double" => "D".into(),
        _ => dotted.to_string(),
    }
}

/// `FindClass` wants the slash form, descriptor-style for arrays.
fn descriptor_name(dotted: &str) -> String {
    if dotted.ends_with("[]") {
        return binary_name(dotted).replace('.', "/");
    }
    dotted.replace('.', "/")
}
