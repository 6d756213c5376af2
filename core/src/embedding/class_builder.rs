use crate::context::Context;
use crate::embedding::callback::{CallbackInfo, NativeFunctionBoxed};
use crate::embedding::external::HostData;
use crate::embedding::handle::Handle;
use crate::errors::Status;
use crate::runtime::ClassId;
use crate::runtime::value::object::Finalize;

/// Description of a host class, consumed by `Context::define_class`.
pub struct NativeClassDef {
    pub name: String,
    pub constructor: NativeFunctionBoxed,
    pub data: Option<HostData>,
    pub methods: Vec<(String, NativeFunctionBoxed)>,
    pub static_methods: Vec<(String, NativeFunctionBoxed)>,
}

pub struct ClassBuilder {
    name: String,
    constructor: Option<NativeFunctionBoxed>,
    data: Option<HostData>,
    methods: Vec<(String, NativeFunctionBoxed)>,
    static_methods: Vec<(String, NativeFunctionBoxed)>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
            data: None,
            methods: Vec::new(),
            static_methods: Vec::new(),
        }
    }

    pub fn constructor<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Context, &CallbackInfo) -> Result<Option<Handle>, Status> + 'static,
    {
        self.constructor = Some(NativeFunctionBoxed::from_closure(callback));
        self
    }

    /// Data handed to the constructor through `CallbackInfo::data`.
    pub fn data(mut self, data: HostData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut Context, &CallbackInfo) -> Result<Option<Handle>, Status> + 'static,
    {
        self.methods
            .push((name.into(), NativeFunctionBoxed::from_closure(callback)));
        self
    }

    pub fn static_method<F>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut Context, &CallbackInfo) -> Result<Option<Handle>, Status> + 'static,
    {
        self.static_methods
            .push((name.into(), NativeFunctionBoxed::from_closure(callback)));
        self
    }

    /// Fails with `InvalidArgument` when no constructor was given.
    pub fn build(self) -> Result<NativeClassDef, Status> {
        Ok(NativeClassDef {
            name: self.name,
            constructor: self.constructor.ok_or(Status::InvalidArgument)?,
            data: self.data,
            methods: self.methods,
            static_methods: self.static_methods,
        })
    }
}

/// Native state of a class prototype: what `new_instance` needs to build and
/// initialize an instance.
#[derive(Clone)]
pub(crate) struct ConstructorBinding {
    pub class_id: ClassId,
    pub callback: NativeFunctionBoxed,
    pub data: Option<HostData>,
}

impl Finalize for ConstructorBinding {}
