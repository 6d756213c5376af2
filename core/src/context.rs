use std::rc::Rc;

use crate::embedding::handle::Handle;
use crate::embedding::reference::{self, Reference};
use crate::embedding::registry;
use crate::embedding::scope::{EscapableHandleScope, Escaped, HandleScope, ScopeStack};
use crate::engine::ContextLease;
use crate::errors::Status;
use crate::runtime::Runtime;
use crate::runtime::gc::{CollectStats, HeapStats};
use crate::runtime::value::{JsObject, JsValue, ObjectClass, ObjectId, Property};

/// Identifies a context within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub(crate) u64);

/// One embedding environment: a scope stack, a global object and a pending
/// exception slot, on top of the runtime shared with sibling contexts.
///
/// Every value a host sees is a [`Handle`] rooted in the innermost open
/// scope, so value-producing calls need a scope to be open.
pub struct Context {
    id: ContextId,
    runtime: Rc<Runtime>,
    scopes: ScopeStack,
    pending_exception: Option<JsValue>,
    global: ObjectId,
    _lease: ContextLease,
}

impl Context {
    pub(crate) fn new(
        id: ContextId,
        runtime: Rc<Runtime>,
        lease: ContextLease,
    ) -> Result<Self, Status> {
        let global = runtime.alloc(JsObject::new(ObjectClass::Ordinary))?;
        tracing::debug!(?id, "context created");
        Ok(Self {
            id,
            runtime,
            scopes: ScopeStack::new(id),
            pending_exception: None,
            global,
            _lease: lease,
        })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Fails fast when an exception is already pending.
    pub(crate) fn preamble(&self) -> Result<(), Status> {
        match self.pending_exception {
            Some(_) => Err(Status::PendingException),
            None => Ok(()),
        }
    }

    pub(crate) fn value(&self, handle: Handle) -> Result<&JsValue, Status> {
        self.scopes.value(handle)
    }

    /// Roots a value the caller already holds a reference on. On failure the
    /// reference is given back to the engine.
    pub(crate) fn root_or_release(&mut self, value: JsValue) -> Result<Handle, Status> {
        match self.scopes.root(value.clone()) {
            Ok(handle) => Ok(handle),
            Err(status) => {
                self.runtime.release(&value);
                Err(status)
            }
        }
    }

    /// Takes a fresh reference on `value` and roots it.
    pub(crate) fn root_dup(&mut self, value: JsValue) -> Result<Handle, Status> {
        self.runtime.dup(&value);
        self.root_or_release(value)
    }

    pub(crate) fn release_all(&self, values: Vec<JsValue>) {
        for value in &values {
            self.runtime.release(value);
        }
    }

    pub fn open_handle_scope(&mut self) -> Result<HandleScope, Status> {
        let scope = self.scopes.open()?;
        tracing::trace!(depth = self.scopes.depth(), "opened handle scope");
        Ok(scope)
    }

    /// Releases everything rooted in `scope`. Only the innermost scope can be
    /// closed.
    pub fn close_handle_scope(&mut self, scope: HandleScope) -> Result<(), Status> {
        let values = self.scopes.close(scope.id())?;
        tracing::trace!(released = values.len(), "closed handle scope");
        self.release_all(values);
        Ok(())
    }

    pub fn open_escapable_handle_scope(&mut self) -> Result<EscapableHandleScope, Status> {
        let scope = self.scopes.open_escapable()?;
        tracing::trace!(depth = self.scopes.depth(), "opened escapable handle scope");
        Ok(scope)
    }

    pub fn close_escapable_handle_scope(
        &mut self,
        scope: EscapableHandleScope,
    ) -> Result<(), Status> {
        let values = self.scopes.close(scope.id())?;
        self.release_all(values);
        Ok(())
    }

    /// Promotes `handle` into the scope below `scope`. Allowed once per
    /// escapable scope.
    pub fn escape_handle(
        &mut self,
        scope: &EscapableHandleScope,
        handle: Handle,
    ) -> Result<Handle, Status> {
        match self.scopes.escape(scope.id(), handle)? {
            Escaped::Moved(handle) => Ok(handle),
            Escaped::Shared(handle, value) => {
                self.runtime.dup(&value);
                Ok(handle)
            }
        }
    }

    /// Pops the scopes opened after `scope`, handing back what they rooted.
    pub(crate) fn unwind_scopes_above(&mut self, scope: HandleScope) -> Option<Vec<JsValue>> {
        let values = self.scopes.unwind_above(scope.id())?;
        if !values.is_empty() {
            tracing::debug!(released = values.len(), "unwound scopes left open by a callback");
        }
        Some(values)
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn live_handles(&self) -> usize {
        self.scopes.live_handles()
    }

    /// A positive `initial_count` holds the value strongly; zero holds an
    /// object weakly and a primitive not at all.
    pub fn create_reference(
        &mut self,
        value: Handle,
        initial_count: u32,
    ) -> Result<Reference, Status> {
        let value = self.value(value)?.clone();
        reference::create(&self.runtime, self.id, value, initial_count)
    }

    pub fn reference_ref(&mut self, reference: Reference) -> Result<u32, Status> {
        reference::add_ref(&self.runtime, reference)
    }

    pub fn reference_unref(&mut self, reference: Reference) -> Result<u32, Status> {
        reference::unref(&self.runtime, reference)
    }

    pub fn delete_reference(&mut self, reference: Reference) -> Result<(), Status> {
        reference::delete(&self.runtime, reference)
    }

    /// `None` once the target has been collected.
    pub fn get_reference_value(&mut self, reference: Reference) -> Result<Option<Handle>, Status> {
        match reference::value(&self.runtime, reference)? {
            Some(value) => self.root_dup(value).map(Some),
            None => Ok(None),
        }
    }

    pub fn reference_count(&self, reference: Reference) -> Result<u32, Status> {
        reference::count(&self.runtime, reference)
    }

    /// Whether weak references are currently watching the object.
    pub fn has_reference_registry(&self, value: Handle) -> Result<bool, Status> {
        Ok(match self.value(value)?.as_object() {
            Some(id) => registry::has_registry(&self.runtime, id),
            None => false,
        })
    }

    pub fn live_references(&self) -> usize {
        self.runtime.references().len()
    }

    pub fn throw(&mut self, error: Handle) -> Result<(), Status> {
        self.preamble()?;
        let error = self.value(error)?.clone();
        self.runtime.dup(&error);
        self.pending_exception = Some(error);
        Ok(())
    }

    /// Throws a fresh error object with `name` and `message` properties.
    pub fn throw_error(&mut self, message: &str) -> Result<(), Status> {
        self.preamble()?;
        let error = self.make_error("Error", message)?;
        self.pending_exception = Some(error);
        Ok(())
    }

    pub(crate) fn throw_type_error(&mut self, message: &str) -> Result<(), Status> {
        let error = self.make_error("TypeError", message)?;
        if let Some(previous) = self.pending_exception.replace(error) {
            self.runtime.release(&previous);
        }
        Ok(())
    }

    fn make_error(&self, name: &str, message: &str) -> Result<JsValue, Status> {
        let mut error = JsObject::new(ObjectClass::Ordinary);
        error.define_own("name", Property::new(JsValue::string(name)));
        error.define_own("message", Property::new(JsValue::string(message)));
        self.runtime.alloc(error).map(JsValue::Object)
    }

    pub fn is_exception_pending(&self) -> bool {
        self.pending_exception.is_some()
    }

    /// Hands the pending exception to the caller, or `undefined` when none
    /// is pending.
    pub fn get_and_clear_last_exception(&mut self) -> Result<Handle, Status> {
        let exception = self.pending_exception.take().unwrap_or(JsValue::Undefined);
        self.root_or_release(exception)
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.runtime.stats()
    }

    pub fn collect_garbage(&self) -> CollectStats {
        self.runtime.collect_garbage()
    }

    /// Engine reference count of the object behind `value`; `None` for
    /// primitives.
    pub fn refcount(&self, value: Handle) -> Result<Option<u32>, Status> {
        Ok(self
            .value(value)?
            .as_object()
            .and_then(|id| self.runtime.heap().refcount(id)))
    }

    pub(crate) fn global_id(&self) -> ObjectId {
        self.global
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let rooted = self.scopes.drain();
        tracing::debug!(id = ?self.id, rooted = rooted.len(), "dropping context");
        self.release_all(rooted);
        if let Some(exception) = self.pending_exception.take() {
            self.runtime.release(&exception);
        }
        let owned = self.runtime.references().owned_by(self.id);
        for reference in owned {
            if let Err(status) = reference::delete(&self.runtime, reference) {
                tracing::warn!(?reference, %status, "could not delete reference on teardown");
            }
        }
        self.runtime.release(&JsValue::Object(self.global));
    }
}
