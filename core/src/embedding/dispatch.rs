//! Host functions and classes, and the bridge that runs a host callback on
//! behalf of the engine.

use crate::context::Context;
use crate::embedding::callback::{CallbackInfo, NativeFunctionBoxed};
use crate::embedding::class_builder::{ConstructorBinding, NativeClassDef};
use crate::embedding::external::HostData;
use crate::embedding::handle::Handle;
use crate::errors::Status;
use crate::runtime::ClassId;
use crate::runtime::value::object::{Finalize, prototype};
use crate::runtime::value::{JsObject, JsValue, ObjectClass, ObjectId, Property};

/// Native state of a host function object.
#[derive(Clone)]
pub(crate) struct FunctionBinding {
    callback: NativeFunctionBoxed,
    data: Option<HostData>,
}

impl Finalize for FunctionBinding {}

struct BoundClass {
    prototype: ObjectId,
    class_id: ClassId,
    callback: NativeFunctionBoxed,
    data: Option<HostData>,
}

enum Callable {
    Function(FunctionBinding),
    Constructor,
}

impl Context {
    pub fn create_function(
        &mut self,
        name: &str,
        callback: NativeFunctionBoxed,
        data: Option<HostData>,
    ) -> Result<Handle, Status> {
        self.preamble()?;
        let id = self.alloc_function(name, callback, data)?;
        self.root_or_release(JsValue::Object(id))
    }

    fn alloc_function(
        &mut self,
        name: &str,
        callback: NativeFunctionBoxed,
        data: Option<HostData>,
    ) -> Result<ObjectId, Status> {
        let mut function = JsObject::new(ObjectClass::Function)
            .with_native(FunctionBinding { callback, data });
        function.define_own("name", Property::frozen(JsValue::string(name)));
        self.runtime().alloc(function)
    }

    /// Calls `func` with `this` and `args`. A returned `None` means the
    /// callee produced `undefined`.
    pub fn call_function(
        &mut self,
        this: Handle,
        func: Handle,
        args: &[Handle],
    ) -> Result<Option<Handle>, Status> {
        self.preamble()?;
        let this = self.value(this)?.clone();
        let func = self.value(func)?.clone();
        let args = self.argument_values(args)?;
        let binding = match self.callable(&func)? {
            Callable::Function(binding) => binding,
            Callable::Constructor => {
                self.throw_type_error("class constructor cannot be invoked without 'new'")?;
                return Err(Status::PendingException);
            }
        };

        let result = self.invoke(&binding.callback, binding.data, this, &args, None)?;
        match result {
            JsValue::Undefined => Ok(None),
            value => self.root_or_release(value).map(Some),
        }
    }

    /// Defines a host class. The returned constructor carries a frozen
    /// `prototype` whose native state binds the constructor callback.
    pub fn define_class(&mut self, def: NativeClassDef) -> Result<Handle, Status> {
        self.preamble()?;
        let NativeClassDef {
            name,
            constructor,
            data,
            methods,
            static_methods,
        } = def;
        let class_id = self.runtime().new_class_id();
        tracing::debug!(%name, class_id, "defining class");

        let prototype = self.runtime().alloc(
            JsObject::new(ObjectClass::Ordinary).with_native(ConstructorBinding {
                class_id,
                callback: constructor,
                data,
            }),
        )?;
        // rooted so that a failure below leaves it to the caller's scope
        self.root_or_release(JsValue::Object(prototype))?;

        let mut class = JsObject::new(ObjectClass::Constructor);
        class.define_own("name", Property::frozen(JsValue::string(&name)));
        // the constructor's own edge to the prototype
        self.runtime().dup(&JsValue::Object(prototype));
        class.define_own("prototype", Property::frozen(JsValue::Object(prototype)));
        let class = self.runtime().alloc(class)?;
        let class_handle = self.root_or_release(JsValue::Object(class))?;

        self.install(prototype, "constructor", JsValue::Object(class), false)?;
        for (method, callback) in methods {
            let function = self.alloc_function(&method, callback, None)?;
            self.install(prototype, &method, JsValue::Object(function), true)?;
        }
        for (method, callback) in static_methods {
            let function = self.alloc_function(&method, callback, None)?;
            self.install(class, &method, JsValue::Object(function), true)?;
        }
        Ok(class_handle)
    }

    /// Stores `value` as an own property of `target`. With `owned` the caller
    /// hands over its reference; otherwise a new one is taken.
    fn install(
        &mut self,
        target: ObjectId,
        key: &str,
        value: JsValue,
        owned: bool,
    ) -> Result<(), Status> {
        if !owned {
            self.runtime().dup(&value);
        }
        let previous = {
            let mut heap = self.runtime().heap_mut();
            heap.get_mut(target)
                .map(|object| object.define_own(key, Property::new(value.clone())))
        };
        match previous {
            Some(previous) => {
                if let Some(previous) = previous {
                    self.runtime().release(&previous);
                }
                Ok(())
            }
            None => {
                self.runtime().release(&value);
                Err(Status::GenericFailure)
            }
        }
    }

    /// Constructs with `new`. Classes made by `define_class` get an instance
    /// of their class; a plain host function gets an ordinary object. A
    /// callback returning an object replaces the allocated `this`.
    pub fn new_instance(&mut self, constructor: Handle, args: &[Handle]) -> Result<Handle, Status> {
        self.preamble()?;
        let constructor = self.value(constructor)?.clone();
        let args = self.argument_values(args)?;
        let (callback, data, this) = match self.callable(&constructor)? {
            Callable::Function(binding) => {
                let this = self.runtime().alloc(JsObject::new(ObjectClass::Ordinary))?;
                (binding.callback, binding.data, JsValue::Object(this))
            }
            Callable::Constructor => {
                let class = constructor.as_object().ok_or(Status::FunctionExpected)?;
                let binding = self.constructor_binding(class)?;
                let this = self.alloc_instance(binding.prototype, binding.class_id)?;
                (binding.callback, binding.data, this)
            }
        };

        let result = self.invoke(&callback, data, this.clone(), &args, Some(constructor));
        let instance = match result {
            Ok(value) if value.is_object() => {
                self.runtime().release(&this);
                value
            }
            Ok(value) => {
                self.runtime().release(&value);
                this
            }
            Err(status) => {
                self.runtime().release(&this);
                return Err(status);
            }
        };
        self.root_or_release(instance)
    }

    /// Whether `constructor.prototype` is on the prototype chain of `object`.
    pub fn instance_of(&mut self, object: Handle, constructor: Handle) -> Result<bool, Status> {
        self.preamble()?;
        let object = self.value(object)?.clone();
        let constructor = self.value(constructor)?.clone();
        self.callable(&constructor)?;
        let (Some(object), Some(constructor)) = (object.as_object(), constructor.as_object())
        else {
            return Ok(false);
        };
        let heap = self.runtime().heap();
        let Some(prototype) = heap
            .get(constructor)
            .and_then(|object| object.get_own("prototype"))
            .and_then(|property| property.value.as_object())
        else {
            return Ok(false);
        };
        Ok(prototype::has_in_chain(&heap, object, prototype))
    }

    fn constructor_binding(&self, class: ObjectId) -> Result<BoundClass, Status> {
        let heap = self.runtime().heap();
        let prototype = heap
            .get(class)
            .and_then(|object| object.get_own("prototype"))
            .and_then(|property| property.value.as_object())
            .ok_or(Status::GenericFailure)?;
        let binding = heap
            .get(prototype)
            .and_then(|object| object.native::<ConstructorBinding>())
            .ok_or(Status::GenericFailure)?;
        Ok(BoundClass {
            prototype,
            class_id: binding.class_id,
            callback: binding.callback.clone(),
            data: binding.data.clone(),
        })
    }

    fn alloc_instance(&self, prototype: ObjectId, class_id: ClassId) -> Result<JsValue, Status> {
        self.runtime().dup(&JsValue::Object(prototype));
        let instance =
            JsObject::new(ObjectClass::Instance(class_id)).with_prototype(Some(prototype));
        match self.runtime().alloc(instance) {
            Ok(id) => Ok(JsValue::Object(id)),
            Err(status) => {
                self.runtime().release(&JsValue::Object(prototype));
                Err(status)
            }
        }
    }

    fn argument_values(&self, args: &[Handle]) -> Result<Vec<JsValue>, Status> {
        args.iter()
            .map(|handle| self.value(*handle).cloned())
            .collect()
    }

    fn callable(&self, value: &JsValue) -> Result<Callable, Status> {
        let id = value.as_object().ok_or(Status::FunctionExpected)?;
        let heap = self.runtime().heap();
        let object = heap.get(id).ok_or(Status::FunctionExpected)?;
        match object.class() {
            ObjectClass::Function => object
                .native::<FunctionBinding>()
                .cloned()
                .map(Callable::Function)
                .ok_or(Status::FunctionExpected),
            ObjectClass::Constructor => Ok(Callable::Constructor),
            _ => Err(Status::FunctionExpected),
        }
    }

    /// Runs `callback` inside a fresh scope holding its own references on
    /// `this` and the arguments. The return value is duplicated out before
    /// the scope closes and is owned by the caller. Scopes the callback left
    /// open are unwound with it.
    fn invoke(
        &mut self,
        callback: &NativeFunctionBoxed,
        data: Option<HostData>,
        this: JsValue,
        args: &[JsValue],
        new_target: Option<JsValue>,
    ) -> Result<JsValue, Status> {
        let scope = self.open_handle_scope()?;
        let info = match self.root_call_frame(this, args, new_target, data) {
            Ok(info) => info,
            Err(status) => {
                self.close_handle_scope(scope)?;
                return Err(status);
            }
        };

        let outcome = callback.call(self, &info);
        let returned = match outcome {
            Ok(Some(handle)) => match self.value(handle).cloned() {
                Ok(value) => Some(value),
                Err(status) => {
                    self.report_callback_error(status);
                    None
                }
            },
            Ok(None) => None,
            Err(status) => {
                self.report_callback_error(status);
                None
            }
        };
        let returned = returned.unwrap_or(JsValue::Undefined);
        self.runtime().dup(&returned);

        if let Some(values) = self.unwind_scopes_above(scope) {
            self.release_all(values);
        }
        if let Err(status) = self.close_handle_scope(scope) {
            self.runtime().release(&returned);
            return Err(status);
        }

        if self.is_exception_pending() {
            self.runtime().release(&returned);
            return Err(Status::PendingException);
        }
        Ok(returned)
    }

    fn root_call_frame(
        &mut self,
        this: JsValue,
        args: &[JsValue],
        new_target: Option<JsValue>,
        data: Option<HostData>,
    ) -> Result<CallbackInfo, Status> {
        let this = self.root_dup(this)?;
        let mut rooted = Vec::new();
        rooted
            .try_reserve(args.len())
            .map_err(|_| Status::OutOfMemory)?;
        for arg in args {
            rooted.push(self.root_dup(arg.clone())?);
        }
        let new_target = new_target
            .map(|target| self.root_dup(target))
            .transpose()?;
        let undefined = self.root_or_release(JsValue::Undefined)?;
        Ok(CallbackInfo::new(this, rooted, new_target, undefined, data))
    }

    /// A failing callback that left nothing pending throws an error carrying
    /// the status message.
    fn report_callback_error(&mut self, status: Status) {
        if self.is_exception_pending() {
            return;
        }
        tracing::debug!(%status, "host callback failed");
        if let Err(status) = self.throw_error(&status.to_string()) {
            tracing::warn!(%status, "could not raise callback error");
        }
    }
}
