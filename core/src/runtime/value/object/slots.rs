use std::any::Any;
use std::fmt;

use crate::runtime::Runtime;
use crate::runtime::value::ObjectId;

/// Host-side state attached to an engine object.
///
/// `finalize` consumes the state, so the engine can run it at most once: when
/// the owning object is reclaimed or the runtime is torn down.
pub trait Finalize: Any {
    fn finalize(self: Box<Self>, _runtime: &Runtime) {}
}

pub trait NativeState: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn finalize_boxed(self: Box<Self>, runtime: &Runtime);
}

impl<T: Finalize> NativeState for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn finalize_boxed(self: Box<Self>, runtime: &Runtime) {
        Finalize::finalize(self, runtime);
    }
}

/// Slots invisible to property access: the native state and the hidden
/// companion that records weak references to this object.
#[derive(Default)]
pub struct InternalSlots {
    pub(crate) native: Option<Box<dyn NativeState>>,
    pub(crate) companion: Option<ObjectId>,
}

impl fmt::Debug for InternalSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalSlots")
            .field("native", &self.native.is_some())
            .field("companion", &self.companion)
            .finish()
    }
}
