use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::embedding::external::HostData;
use crate::embedding::handle::Handle;
use crate::errors::Status;

/// A host function callable from the engine. Returning `Ok(None)` yields
/// `undefined`; returning `Err` without a pending exception throws an error
/// carrying the status message.
pub trait NativeFunction {
    fn call(&self, cx: &mut Context, info: &CallbackInfo) -> Result<Option<Handle>, Status>;
}

#[derive(Clone)]
pub struct NativeFunctionBoxed {
    callback: Rc<dyn NativeFunction>,
}

impl fmt::Debug for NativeFunctionBoxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFunctionBoxed(..)")
    }
}

impl NativeFunctionBoxed {
    pub fn new<T: NativeFunction + 'static>(callback: T) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn from_closure<F>(callback: F) -> Self
    where
        F: Fn(&mut Context, &CallbackInfo) -> Result<Option<Handle>, Status> + 'static,
    {
        Self::new(ClosureFunction { callback })
    }

    pub fn call(&self, cx: &mut Context, info: &CallbackInfo) -> Result<Option<Handle>, Status> {
        self.callback.call(cx, info)
    }
}

struct ClosureFunction<F> {
    callback: F,
}

impl<F> NativeFunction for ClosureFunction<F>
where
    F: Fn(&mut Context, &CallbackInfo) -> Result<Option<Handle>, Status>,
{
    fn call(&self, cx: &mut Context, info: &CallbackInfo) -> Result<Option<Handle>, Status> {
        (self.callback)(cx, info)
    }
}

/// What a host callback sees of its invocation. Every handle is rooted in
/// the scope opened for the call and dies with it.
pub struct CallbackInfo {
    this: Handle,
    args: Vec<Handle>,
    new_target: Option<Handle>,
    undefined: Handle,
    data: Option<HostData>,
}

impl CallbackInfo {
    pub(crate) fn new(
        this: Handle,
        args: Vec<Handle>,
        new_target: Option<Handle>,
        undefined: Handle,
        data: Option<HostData>,
    ) -> Self {
        Self {
            this,
            args,
            new_target,
            undefined,
            data,
        }
    }

    pub fn this(&self) -> Handle {
        self.this
    }

    /// Number of arguments actually passed.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Argument `index`, or `undefined` past the end.
    pub fn arg(&self, index: usize) -> Handle {
        self.args.get(index).copied().unwrap_or(self.undefined)
    }

    /// The first `wanted` arguments, padded with `undefined`.
    pub fn args(&self, wanted: usize) -> Vec<Handle> {
        (0..wanted).map(|index| self.arg(index)).collect()
    }

    /// Set when invoked through `new_instance`.
    pub fn new_target(&self) -> Option<Handle> {
        self.new_target
    }

    pub fn data(&self) -> Option<&HostData> {
        self.data.as_ref()
    }
}

impl fmt::Debug for CallbackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackInfo")
            .field("this", &self.this)
            .field("args", &self.args)
            .field("new_target", &self.new_target)
            .field("data", &self.data.is_some())
            .finish()
    }
}
