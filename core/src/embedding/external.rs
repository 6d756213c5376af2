use std::any::Any;
use std::rc::Rc;

use crate::context::{Context, ContextId};
use crate::embedding::handle::Handle;
use crate::errors::Status;
use crate::runtime::Runtime;
use crate::runtime::value::object::Finalize;
use crate::runtime::value::{JsObject, JsValue, ObjectClass};

/// Opaque host data carried by externals, functions and classes.
pub type HostData = Rc<dyn Any>;

/// Runs once when the engine reclaims an external, with its data and hint.
pub type FinalizeCallback = Box<dyn FnOnce(HostData, Option<HostData>)>;

pub(crate) struct ExternalBinding {
    context: ContextId,
    data: HostData,
    hint: Option<HostData>,
    finalizer: Option<FinalizeCallback>,
}

impl Finalize for ExternalBinding {
    fn finalize(self: Box<Self>, _runtime: &Runtime) {
        let ExternalBinding {
            context,
            data,
            hint,
            finalizer,
        } = *self;
        if let Some(finalizer) = finalizer {
            tracing::debug!(?context, "running external finalizer");
            finalizer(data, hint);
        }
    }
}

impl Context {
    /// Wraps host `data` in an engine object. The finalizer is bound only once
    /// the object is rooted, so a failed creation never calls it.
    pub fn create_external(
        &mut self,
        data: HostData,
        finalizer: Option<FinalizeCallback>,
        hint: Option<HostData>,
    ) -> Result<Handle, Status> {
        self.preamble()?;
        let id = self.runtime().alloc(JsObject::new(ObjectClass::External))?;
        let handle = self.root_or_release(JsValue::Object(id))?;
        let binding = ExternalBinding {
            context: self.id(),
            data,
            hint,
            finalizer,
        };
        if let Some(object) = self.runtime().heap_mut().get_mut(id) {
            object.slots.native = Some(Box::new(binding));
        }
        Ok(handle)
    }

    /// `None` for anything that is not an external.
    pub fn get_value_external(&self, value: Handle) -> Result<Option<HostData>, Status> {
        let Some(id) = self.value(value)?.as_object() else {
            return Ok(None);
        };
        let heap = self.runtime().heap();
        Ok(heap
            .get(id)
            .and_then(|object| object.native::<ExternalBinding>())
            .map(|binding| Rc::clone(&binding.data)))
    }
}
