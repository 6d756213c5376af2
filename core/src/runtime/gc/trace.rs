use crate::runtime::value::{JsValue, ObjectId};

/// Reports the heap edges held by a value.
pub trait Trace {
    fn trace(&self, tracer: &mut Tracer);
}

#[derive(Default)]
pub struct Tracer {
    discovered: Vec<ObjectId>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, id: ObjectId) {
        self.discovered.push(id);
    }

    pub(crate) fn take_discovered(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.discovered)
    }
}

impl Trace for ObjectId {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.mark(*self);
    }
}

impl Trace for JsValue {
    fn trace(&self, tracer: &mut Tracer) {
        if let JsValue::Object(id) = self {
            tracer.mark(*id);
        }
    }
}

impl<T: Trace> Trace for Option<T> {
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(value) = self {
            value.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, tracer: &mut Tracer) {
        for value in self {
            value.trace(tracer);
        }
    }
}
