//! Safe wrapper around the JNI environment.
//!
//! [`JniEnv`] is the only way the bridge talks to the VM: every call goes
//! through the function table behind the raw `JNIEnv` pointer. Null-returning
//! JNI calls surface as `Option`; classification into [`BridgeError`]
//! variants happens in the layers above, which know what the null meant.
//!
//! The call and field surfaces are table-driven: rather than one wrapper per
//! `Call<Type>Method` entry point, [`JniEnv::invoke`] and the raw field
//! accessors take a [`JType`] tag and select the right slot in one match.
//! That is the shape the invocation dispatcher wants anyway.

use crate::error::{BridgeError, Result, ThrowableHandle};
use crate::sys::jni::{self, jvalue};
use std::ffi::{c_void, CStr, CString};
use std::ptr;

/// The JNI-level shape of a value: which function-table family moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JType {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Object,
}

/// Which invoker family a call goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeStyle {
    /// `Call<Type>Method`: virtual dispatch on the receiver.
    Virtual,
    /// `CallNonvirtual<Type>Method`: direct dispatch through a named class.
    Direct,
    /// `CallStatic<Type>Method`.
    Static,
}

/// Safe wrapper around a JNI environment pointer.
///
/// Tied to the thread that produced the raw pointer; never send it.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Wraps a raw environment pointer.
    ///
    /// # Safety
    /// The pointer must be a live `JNIEnv*` belonging to the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    /// The raw environment pointer.
    pub fn raw(&self) -> *mut jni::JNIEnv {
        self.env
    }

    // =========================================================================
    // Classes and identity
    // =========================================================================

    /// Looks up a class by slash-form name (`java/lang/String`).
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() {
                None
            } else {
                Some(cls)
            }
        }
    }

    pub fn get_superclass(&self, cls: jni::jclass) -> Option<jni::jclass> {
        unsafe {
            let vtable = *self.env;
            let sup = ((*vtable).GetSuperclass)(self.env, cls);
            if sup.is_null() {
                None
            } else {
                Some(sup)
            }
        }
    }

    pub fn get_object_class(&self, obj: jni::jobject) -> jni::jclass {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetObjectClass)(self.env, obj)
        }
    }

    pub fn is_instance_of(&self, obj: jni::jobject, cls: jni::jclass) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).IsInstanceOf)(self.env, obj, cls) != 0
        }
    }

    pub fn is_same_object(&self, a: jni::jobject, b: jni::jobject) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).IsSameObject)(self.env, a, b) != 0
        }
    }

    // =========================================================================
    // References and frames
    // =========================================================================

    pub fn new_global_ref(&self, obj: jni::jobject) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).NewGlobalRef)(self.env, obj)
        }
    }

    pub fn delete_global_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteGlobalRef)(self.env, obj);
        }
    }

    pub fn delete_local_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }

    pub fn new_weak_global_ref(&self, obj: jni::jobject) -> jni::jweak {
        unsafe {
            let vtable = *self.env;
            ((*vtable).NewWeakGlobalRef)(self.env, obj)
        }
    }

    pub fn delete_weak_global_ref(&self, obj: jni::jweak) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteWeakGlobalRef)(self.env, obj);
        }
    }

    /// Pushes a local reference frame, returning a guard that pops it on
    /// every exit path.
    pub fn push_frame(&self, capacity: usize) -> Result<FrameGuard<'_>> {
        unsafe {
            let vtable = *self.env;
            if ((*vtable).PushLocalFrame)(self.env, capacity as jni::jint) != jni::JNI_OK {
                return Err(BridgeError::OutOfMemory);
            }
        }
        Ok(FrameGuard {
            env: self,
            armed: true,
        })
    }

    fn pop_frame(&self, result: jni::jobject) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).PopLocalFrame)(self.env, result)
        }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != 0
        }
    }

    pub fn exception_occurred(&self) -> Option<jni::jthrowable> {
        unsafe {
            let vtable = *self.env;
            let exc = ((*vtable).ExceptionOccurred)(self.env);
            if exc.is_null() {
                None
            } else {
                Some(exc)
            }
        }
    }

    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    pub fn throw(&self, obj: jni::jthrowable) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).Throw)(self.env, obj) == jni::JNI_OK
        }
    }

    /// Converts a pending Java exception into a bridge error.
    ///
    /// Clears the pending state; the captured local reference rides in the
    /// error so the caller can re-throw it.
    pub fn check_exception(&self) -> Result<()> {
        if !self.exception_check() {
            return Ok(());
        }
        let exc = self.exception_occurred().unwrap_or(ptr::null_mut());
        self.exception_clear();
        Err(BridgeError::JavaException(ThrowableHandle(exc)))
    }

    // =========================================================================
    // Strings
    // =========================================================================

    pub fn new_string_utf(&self, s: &str) -> Option<jni::jstring> {
        let c_str = CString::new(s).ok()?;
        unsafe {
            let vtable = *self.env;
            let jstr = ((*vtable).NewStringUTF)(self.env, c_str.as_ptr());
            if jstr.is_null() {
                None
            } else {
                Some(jstr)
            }
        }
    }

    /// Reads a Java string through its modified-UTF-8 view.
    pub fn get_string_utf(&self, s: jni::jstring) -> Option<String> {
        if s.is_null() {
            return None;
        }
        unsafe {
            let vtable = *self.env;
            let chars = ((*vtable).GetStringUTFChars)(self.env, s, ptr::null_mut());
            if chars.is_null() {
                return None;
            }
            let result = CStr::from_ptr(chars).to_str().ok().map(str::to_string);
            ((*vtable).ReleaseStringUTFChars)(self.env, s, chars);
            result
        }
    }

    /// Reads a Java string through its UTF-16 view.
    pub fn get_string_chars(&self, s: jni::jstring) -> Option<Vec<u16>> {
        if s.is_null() {
            return None;
        }
        unsafe {
            let vtable = *self.env;
            let len = ((*vtable).GetStringLength)(self.env, s);
            let chars = ((*vtable).GetStringChars)(self.env, s, ptr::null_mut());
            if chars.is_null() {
                return None;
            }
            let out = std::slice::from_raw_parts(chars, len.max(0) as usize).to_vec();
            ((*vtable).ReleaseStringChars)(self.env, s, chars);
            Some(out)
        }
    }

    // =========================================================================
    // Member IDs
    // =========================================================================

    pub fn get_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() {
                None
            } else {
                Some(mid)
            }
        }
    }

    pub fn get_static_method_id(
        &self,
        cls: jni::jclass,
        name: &str,
        sig: &str,
    ) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetStaticMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() {
                None
            } else {
                Some(mid)
            }
        }
    }

    pub fn get_static_field_id(
        &self,
        cls: jni::jclass,
        name: &str,
        sig: &str,
    ) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetStaticFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() {
                None
            } else {
                Some(fid)
            }
        }
    }

    pub fn from_reflected_method(&self, method: jni::jobject) -> jni::jmethodID {
        unsafe {
            let vtable = *self.env;
            ((*vtable).FromReflectedMethod)(self.env, method)
        }
    }

    pub fn from_reflected_field(&self, field: jni::jobject) -> jni::jfieldID {
        unsafe {
            let vtable = *self.env;
            ((*vtable).FromReflectedField)(self.env, field)
        }
    }

    // =========================================================================
    // Object creation
    // =========================================================================

    /// Allocates an instance without running any constructor.
    pub fn alloc_object(&self, cls: jni::jclass) -> Option<jni::jobject> {
        unsafe {
            let vtable = *self.env;
            let obj = ((*vtable).AllocObject)(self.env, cls);
            if obj.is_null() {
                None
            } else {
                Some(obj)
            }
        }
    }

    pub fn new_object(
        &self,
        cls: jni::jclass,
        method_id: jni::jmethodID,
        args: &[jvalue],
    ) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).NewObjectA)(self.env, cls, method_id, args.as_ptr())
        }
    }

    // =========================================================================
    // Invocation (table-driven)
    // =========================================================================

    /// Calls a method through the family selected by `style` and `ret`.
    ///
    /// `clazz` is the dispatch class for [`InvokeStyle::Direct`] and the
    /// declaring class for [`InvokeStyle::Static`]; it is ignored for
    /// virtual calls. The returned `jvalue` is meaningful only in the lane
    /// `ret` names (`Void` returns a zeroed value).
    pub fn invoke(
        &self,
        style: InvokeStyle,
        ret: JType,
        target: jni::jobject,
        clazz: jni::jclass,
        method_id: jni::jmethodID,
        args: &[jvalue],
    ) -> jvalue {
        let e = self.env;
        let a = args.as_ptr();
        unsafe {
            let t = *e;
            match style {
                InvokeStyle::Virtual => match ret {
                    JType::Void => {
                        ((*t).CallVoidMethodA)(e, target, method_id, a);
                        jvalue::default()
                    }
                    JType::Boolean => jvalue {
                        z: ((*t).CallBooleanMethodA)(e, target, method_id, a),
                    },
                    JType::Byte => jvalue {
                        b: ((*t).CallByteMethodA)(e, target, method_id, a),
                    },
                    JType::Char => jvalue {
                        c: ((*t).CallCharMethodA)(e, target, method_id, a),
                    },
                    JType::Short => jvalue {
                        s: ((*t).CallShortMethodA)(e, target, method_id, a),
                    },
                    JType::Int => jvalue {
                        i: ((*t).CallIntMethodA)(e, target, method_id, a),
                    },
                    JType::Long => jvalue {
                        j: ((*t).CallLongMethodA)(e, target, method_id, a),
                    },
                    JType::Float => jvalue {
                        f: ((*t).CallFloatMethodA)(e, target, method_id, a),
                    },
                    JType::Double => jvalue {
                        d: ((*t).CallDoubleMethodA)(e, target, method_id, a),
                    },
                    JType::Object => jvalue {
                        l: ((*t).CallObjectMethodA)(e, target, method_id, a),
                    },
                },
                InvokeStyle::Direct => match ret {
                    JType::Void => {
                        ((*t).CallNonvirtualVoidMethodA)(e, target, clazz, method_id, a);
                        jvalue::default()
                    }
                    JType::Boolean => jvalue {
                        z: ((*t).CallNonvirtualBooleanMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Byte => jvalue {
                        b: ((*t).CallNonvirtualByteMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Char => jvalue {
                        c: ((*t).CallNonvirtualCharMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Short => jvalue {
                        s: ((*t).CallNonvirtualShortMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Int => jvalue {
                        i: ((*t).CallNonvirtualIntMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Long => jvalue {
                        j: ((*t).CallNonvirtualLongMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Float => jvalue {
                        f: ((*t).CallNonvirtualFloatMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Double => jvalue {
                        d: ((*t).CallNonvirtualDoubleMethodA)(e, target, clazz, method_id, a),
                    },
                    JType::Object => jvalue {
                        l: ((*t).CallNonvirtualObjectMethodA)(e, target, clazz, method_id, a),
                    },
                },
                InvokeStyle::Static => match ret {
                    JType::Void => {
                        ((*t).CallStaticVoidMethodA)(e, clazz, method_id, a);
                        jvalue::default()
                    }
                    JType::Boolean => jvalue {
                        z: ((*t).CallStaticBooleanMethodA)(e, clazz, method_id, a),
                    },
                    JType::Byte => jvalue {
                        b: ((*t).CallStaticByteMethodA)(e, clazz, method_id, a),
                    },
                    JType::Char => jvalue {
                        c: ((*t).CallStaticCharMethodA)(e, clazz, method_id, a),
                    },
                    JType::Short => jvalue {
                        s: ((*t).CallStaticShortMethodA)(e, clazz, method_id, a),
                    },
                    JType::Int => jvalue {
                        i: ((*t).CallStaticIntMethodA)(e, clazz, method_id, a),
                    },
                    JType::Long => jvalue {
                        j: ((*t).CallStaticLongMethodA)(e, clazz, method_id, a),
                    },
                    JType::Float => jvalue {
                        f: ((*t).CallStaticFloatMethodA)(e, clazz, method_id, a),
                    },
                    JType::Double => jvalue {
                        d: ((*t).CallStaticDoubleMethodA)(e, clazz, method_id, a),
                    },
                    JType::Object => jvalue {
                        l: ((*t).CallStaticObjectMethodA)(e, clazz, method_id, a),
                    },
                },
            }
        }
    }

    /// Shorthand for the object-returning virtual call the resolver leans on.
    pub fn call_object_method(
        &self,
        obj: jni::jobject,
        method_id: jni::jmethodID,
        args: &[jvalue],
    ) -> jni::jobject {
        unsafe {
            self.invoke(InvokeStyle::Virtual, JType::Object, obj, ptr::null_mut(), method_id, args)
                .l
        }
    }

    pub fn call_boolean_method(
        &self,
        obj: jni::jobject,
        method_id: jni::jmethodID,
        args: &[jvalue],
    ) -> bool {
        unsafe {
            self.invoke(InvokeStyle::Virtual, JType::Boolean, obj, ptr::null_mut(), method_id, args)
                .z
                != 0
        }
    }

    pub fn call_int_method(
        &self,
        obj: jni::jobject,
        method_id: jni::jmethodID,
        args: &[jvalue],
    ) -> jni::jint {
        unsafe {
            self.invoke(InvokeStyle::Virtual, JType::Int, obj, ptr::null_mut(), method_id, args)
                .i
        }
    }

    pub fn call_static_object_method(
        &self,
        cls: jni::jclass,
        method_id: jni::jmethodID,
        args: &[jvalue],
    ) -> jni::jobject {
        unsafe {
            self.invoke(InvokeStyle::Static, JType::Object, ptr::null_mut(), cls, method_id, args)
                .l
        }
    }

    // =========================================================================
    // Field access (table-driven)
    // =========================================================================

    pub fn get_field_raw(
        &self,
        is_static: bool,
        ty: JType,
        target: jni::jobject,
        field_id: jni::jfieldID,
    ) -> jvalue {
        let e = self.env;
        unsafe {
            let t = *e;
            if is_static {
                match ty {
                    JType::Boolean => jvalue { z: ((*t).GetStaticBooleanField)(e, target, field_id) },
                    JType::Byte => jvalue { b: ((*t).GetStaticByteField)(e, target, field_id) },
                    JType::Char => jvalue { c: ((*t).GetStaticCharField)(e, target, field_id) },
                    JType::Short => jvalue { s: ((*t).GetStaticShortField)(e, target, field_id) },
                    JType::Int => jvalue { i: ((*t).GetStaticIntField)(e, target, field_id) },
                    JType::Long => jvalue { j: ((*t).GetStaticLongField)(e, target, field_id) },
                    JType::Float => jvalue { f: ((*t).GetStaticFloatField)(e, target, field_id) },
                    JType::Double => jvalue { d: ((*t).GetStaticDoubleField)(e, target, field_id) },
                    JType::Object | JType::Void => {
                        jvalue { l: ((*t).GetStaticObjectField)(e, target, field_id) }
                    }
                }
            } else {
                match ty {
                    JType::Boolean => jvalue { z: ((*t).GetBooleanField)(e, target, field_id) },
                    JType::Byte => jvalue { b: ((*t).GetByteField)(e, target, field_id) },
                    JType::Char => jvalue { c: ((*t).GetCharField)(e, target, field_id) },
                    JType::Short => jvalue { s: ((*t).GetShortField)(e, target, field_id) },
                    JType::Int => jvalue { i: ((*t).GetIntField)(e, target, field_id) },
                    JType::Long => jvalue { j: ((*t).GetLongField)(e, target, field_id) },
                    JType::Float => jvalue { f: ((*t).GetFloatField)(e, target, field_id) },
                    JType::Double => jvalue { d: ((*t).GetDoubleField)(e, target, field_id) },
                    JType::Object | JType::Void => {
                        jvalue { l: ((*t).GetObjectField)(e, target, field_id) }
                    }
                }
            }
        }
    }

    pub fn set_field_raw(
        &self,
        is_static: bool,
        ty: JType,
        target: jni::jobject,
        field_id: jni::jfieldID,
        value: jvalue,
    ) {
        let e = self.env;
        unsafe {
            let t = *e;
            if is_static {
                match ty {
                    JType::Boolean => ((*t).SetStaticBooleanField)(e, target, field_id, value.z),
                    JType::Byte => ((*t).SetStaticByteField)(e, target, field_id, value.b),
                    JType::Char => ((*t).SetStaticCharField)(e, target, field_id, value.c),
                    JType::Short => ((*t).SetStaticShortField)(e, target, field_id, value.s),
                    JType::Int => ((*t).SetStaticIntField)(e, target, field_id, value.i),
                    JType::Long => ((*t).SetStaticLongField)(e, target, field_id, value.j),
                    JType::Float => ((*t).SetStaticFloatField)(e, target, field_id, value.f),
                    JType::Double => ((*t).SetStaticDoubleField)(e, target, field_id, value.d),
                    JType::Object | JType::Void => {
                        ((*t).SetStaticObjectField)(e, target, field_id, value.l)
                    }
                }
            } else {
                match ty {
                    JType::Boolean => ((*t).SetBooleanField)(e, target, field_id, value.z),
                    JType::Byte => ((*t).SetByteField)(e, target, field_id, value.b),
                    JType::Char => ((*t).SetCharField)(e, target, field_id, value.c),
                    JType::Short => ((*t).SetShortField)(e, target, field_id, value.s),
                    JType::Int => ((*t).SetIntField)(e, target, field_id, value.i),
                    JType::Long => ((*t).SetLongField)(e, target, field_id, value.j),
                    JType::Float => ((*t).SetFloatField)(e, target, field_id, value.f),
                    JType::Double => ((*t).SetDoubleField)(e, target, field_id, value.d),
                    JType::Object | JType::Void => ((*t).SetObjectField)(e, target, field_id, value.l),
                }
            }
        }
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    pub fn get_array_length(&self, array: jni::jarray) -> usize {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetArrayLength)(self.env, array).max(0) as usize
        }
    }

    pub fn new_object_array(
        &self,
        len: usize,
        cls: jni::jclass,
        init: jni::jobject,
    ) -> Option<jni::jobjectArray> {
        unsafe {
            let vtable = *self.env;
            let arr = ((*vtable).NewObjectArray)(self.env, len as jni::jsize, cls, init);
            if arr.is_null() {
                None
            } else {
                Some(arr)
            }
        }
    }

    pub fn get_object_array_element(&self, array: jni::jobjectArray, index: usize) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetObjectArrayElement)(self.env, array, index as jni::jsize)
        }
    }

    pub fn set_object_array_element(
        &self,
        array: jni::jobjectArray,
        index: usize,
        value: jni::jobject,
    ) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).SetObjectArrayElement)(self.env, array, index as jni::jsize, value);
        }
    }

    /// Allocates a primitive array of the lane selected by `ty`.
    pub fn new_primitive_array(&self, ty: JType, len: usize) -> Option<jni::jarray> {
        let n = len as jni::jsize;
        let arr = unsafe {
            let t = *self.env;
            match ty {
                JType::Boolean => ((*t).NewBooleanArray)(self.env, n),
                JType::Byte => ((*t).NewByteArray)(self.env, n),
                JType::Char => ((*t).NewCharArray)(self.env, n),
                JType::Short => ((*t).NewShortArray)(self.env, n),
                JType::Int => ((*t).NewIntArray)(self.env, n),
                JType::Long => ((*t).NewLongArray)(self.env, n),
                JType::Float => ((*t).NewFloatArray)(self.env, n),
                JType::Double => ((*t).NewDoubleArray)(self.env, n),
                JType::Object | JType::Void => return None,
            }
        };
        if arr.is_null() {
            None
        } else {
            Some(arr)
        }
    }

    /// Pins the elements of a primitive array; pair with
    /// [`JniEnv::release_primitive_array_elements`].
    pub fn get_primitive_array_elements(&self, ty: JType, array: jni::jarray) -> *mut c_void {
        unsafe {
            let t = *self.env;
            match ty {
                JType::Boolean => {
                    ((*t).GetBooleanArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Byte => {
                    ((*t).GetByteArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Char => {
                    ((*t).GetCharArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Short => {
                    ((*t).GetShortArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Int => {
                    ((*t).GetIntArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Long => {
                    ((*t).GetLongArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Float => {
                    ((*t).GetFloatArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Double => {
                    ((*t).GetDoubleArrayElements)(self.env, array, ptr::null_mut()) as *mut c_void
                }
                JType::Object | JType::Void => ptr::null_mut(),
            }
        }
    }

    pub fn release_primitive_array_elements(
        &self,
        ty: JType,
        array: jni::jarray,
        elems: *mut c_void,
        mode: jni::jint,
    ) {
        unsafe {
            let t = *self.env;
            match ty {
                JType::Boolean => {
                    ((*t).ReleaseBooleanArrayElements)(self.env, array, elems as _, mode)
                }
                JType::Byte => ((*t).ReleaseByteArrayElements)(self.env, array, elems as _, mode),
                JType::Char => ((*t).ReleaseCharArrayElements)(self.env, array, elems as _, mode),
                JType::Short => ((*t).ReleaseShortArrayElements)(self.env, array, elems as _, mode),
                JType::Int => ((*t).ReleaseIntArrayElements)(self.env, array, elems as _, mode),
                JType::Long => ((*t).ReleaseLongArrayElements)(self.env, array, elems as _, mode),
                JType::Float => ((*t).ReleaseFloatArrayElements)(self.env, array, elems as _, mode),
                JType::Double => {
                    ((*t).ReleaseDoubleArrayElements)(self.env, array, elems as _, mode)
                }
                JType::Object | JType::Void => {}
            }
        }
    }

    /// Copies `len` elements from a scratch buffer into a primitive array.
    ///
    /// # Safety
    /// `buf` must hold at least `len` elements of the lane's element type.
    pub unsafe fn set_primitive_array_region(
        &self,
        ty: JType,
        array: jni::jarray,
        len: usize,
        buf: *const c_void,
    ) {
        let n = len as jni::jsize;
        unsafe {
            let t = *self.env;
            match ty {
                JType::Boolean => ((*t).SetBooleanArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Byte => ((*t).SetByteArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Char => ((*t).SetCharArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Short => ((*t).SetShortArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Int => ((*t).SetIntArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Long => ((*t).SetLongArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Float => ((*t).SetFloatArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Double => ((*t).SetDoubleArrayRegion)(self.env, array, 0, n, buf as _),
                JType::Object | JType::Void => {}
            }
        }
    }

    // =========================================================================
    // VM access
    // =========================================================================

    pub fn get_java_vm(&self) -> Option<*mut jni::JavaVM> {
        let mut vm: *mut jni::JavaVM = ptr::null_mut();
        unsafe {
            let vtable = *self.env;
            if ((*vtable).GetJavaVM)(self.env, &mut vm) != jni::JNI_OK {
                return None;
            }
        }
        if vm.is_null() {
            None
        } else {
            Some(vm)
        }
    }
}

// =========================================================================
// Frame guard
// =========================================================================

/// Pops a pushed local frame on drop, so error paths can't leak the frame.
pub struct FrameGuard<'a> {
    env: &'a JniEnv,
    armed: bool,
}

impl<'a> FrameGuard<'a> {
    /// Pops the frame, dropping every local reference in it.
    pub fn pop(mut self) {
        self.armed = false;
        self.env.pop_frame(ptr::null_mut());
    }

    /// Pops the frame while carrying one reference into the caller's frame.
    pub fn pop_with(mut self, result: jni::jobject) -> jni::jobject {
        self.armed = false;
        self.env.pop_frame(result)
    }
}

impl<'a> Drop for FrameGuard<'a> {
    fn drop(&mut self) {
        if self.armed {
            self.env.pop_frame(ptr::null_mut());
        }
    }
}

// =========================================================================
// Reflection bootstrap
// =========================================================================

/// Cached method/field IDs on the `java.lang.reflect` surface.
///
/// Resolved once per factory; every member materialization goes through
/// these instead of re-running `GetMethodID`.
pub struct Reflect {
    pub class_get_name: jni::jmethodID,
    pub class_get_declared_methods: jni::jmethodID,
    pub class_get_declared_fields: jni::jmethodID,
    pub class_get_declared_constructors: jni::jmethodID,
    pub method_get_name: jni::jmethodID,
    pub method_get_generic_return_type: jni::jmethodID,
    pub method_get_generic_parameter_types: jni::jmethodID,
    pub method_get_modifiers: jni::jmethodID,
    pub method_is_var_args: jni::jmethodID,
    pub field_get_name: jni::jmethodID,
    pub field_get_generic_type: jni::jmethodID,
    pub field_get_modifiers: jni::jmethodID,
    pub ctor_get_generic_parameter_types: jni::jmethodID,
    pub ctor_is_var_args: jni::jmethodID,
    pub type_get_type_name: jni::jmethodID,
    /// `java.lang.reflect.Modifier.STATIC`, read once.
    pub modifier_static: i32,
}

impl Reflect {
    /// Resolves the reflective IDs. This only fails when the runtime is
    /// missing core reflection, which would make the whole bridge moot.
    pub fn resolve(env: &JniEnv) -> Result<Reflect> {
        let frame = env.push_frame(8)?;

        let class_cls = find(env, "java/lang/Class")?;
        let method_cls = find(env, "java/lang/reflect/Method")?;
        let field_cls = find(env, "java/lang/reflect/Field")?;
        let ctor_cls = find(env, "java/lang/reflect/Constructor")?;
        let modifier_cls = find(env, "java/lang/reflect/Modifier")?;
        let type_cls = find(env, "java/lang/reflect/Type")?;

        let reflect = Reflect {
            class_get_name: mid(env, class_cls, "Class", "getName", "()Ljava/lang/String;")?,
            class_get_declared_methods: mid(
                env,
                class_cls,
                "Class",
                "getDeclaredMethods",
                "()[Ljava/lang/reflect/Method;",
            )?,
            class_get_declared_fields: mid(
                env,
                class_cls,
                "Class",
                "getDeclaredFields",
                "()[Ljava/lang/reflect/Field;",
            )?,
            class_get_declared_constructors: mid(
                env,
                class_cls,
                "Class",
                "getDeclaredConstructors",
                "()[Ljava/lang/reflect/Constructor;",
            )?,
            method_get_name: mid(env, method_cls, "Method", "getName", "()Ljava/lang/String;")?,
            method_get_generic_return_type: mid(
                env,
                method_cls,
                "Method",
                "getGenericReturnType",
                "()Ljava/lang/reflect/Type;",
            )?,
            method_get_generic_parameter_types: mid(
                env,
                method_cls,
                "Method",
                "getGenericParameterTypes",
                "()[Ljava/lang/reflect/Type;",
            )?,
            method_get_modifiers: mid(env, method_cls, "Method", "getModifiers", "()I")?,
            method_is_var_args: mid(env, method_cls, "Method", "isVarArgs", "()Z")?,
            field_get_name: mid(env, field_cls, "Field", "getName", "()Ljava/lang/String;")?,
            field_get_generic_type: mid(
                env,
                field_cls,
                "Field",
                "getGenericType",
                "()Ljava/lang/reflect/Type;",
            )?,
            field_get_modifiers: mid(env, field_cls, "Field", "getModifiers", "()I")?,
            ctor_get_generic_parameter_types: mid(
                env,
                ctor_cls,
                "Constructor",
                "getGenericParameterTypes",
                "()[Ljava/lang/reflect/Type;",
            )?,
            ctor_is_var_args: mid(env, ctor_cls, "Constructor", "isVarArgs", "()Z")?,
            type_get_type_name: mid(env, type_cls, "Type", "getTypeName", "()Ljava/lang/String;")?,
            modifier_static: {
                let fid = env
                    .get_static_field_id(modifier_cls, "STATIC", "I")
                    .ok_or_else(|| BridgeError::NoSuchMember {
                        class: "java.lang.reflect.Modifier".into(),
                        name: "STATIC".into(),
                    })?;
                unsafe { env.get_field_raw(true, JType::Int, modifier_cls, fid).i }
            },
        };

        frame.pop();
        Ok(reflect)
    }
}

fn find(env: &JniEnv, name: &str) -> Result<jni::jclass> {
    env.find_class(name).ok_or_else(|| {
        env.exception_clear();
        BridgeError::ClassNotFound(name.replace('/', "."))
    })
}

fn mid(
    env: &JniEnv,
    cls: jni::jclass,
    class_name: &str,
    name: &str,
    sig: &str,
) -> Result<jni::jmethodID> {
    env.get_method_id(cls, name, sig).ok_or_else(|| {
        env.exception_clear();
        BridgeError::NoSuchMember {
            class: format!("java.lang.reflect.{class_name}"),
            name: name.into(),
        }
    })
}
