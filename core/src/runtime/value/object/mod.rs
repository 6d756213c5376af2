mod property;
pub mod prototype;
pub mod slots;

pub use property::Property;
pub use slots::{Finalize, InternalSlots, NativeState};

use std::rc::Rc;

use super::{JsValue, ObjectId};
use crate::runtime::ClassId;
use crate::runtime::gc::{Trace, Tracer};

/// Engine-side classification of an object. `Instance` carries the class id
/// allocated when a host class was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Ordinary,
    Function,
    Constructor,
    External,
    ReferenceRegistry,
    Instance(ClassId),
}

/// Outcome of deleting an own property.
#[derive(Debug)]
pub enum Removal {
    Absent,
    Removed(JsValue),
    Locked,
}

#[derive(Debug)]
pub struct JsObject {
    class: ObjectClass,
    pub(crate) prototype: Option<ObjectId>,
    properties: Vec<(Rc<str>, Property)>,
    pub(crate) slots: InternalSlots,
}

impl JsObject {
    pub fn new(class: ObjectClass) -> Self {
        Self {
            class,
            prototype: None,
            properties: Vec::new(),
            slots: InternalSlots::default(),
        }
    }

    /// The caller must already hold a reference on `prototype` on behalf of
    /// the new object.
    pub fn with_prototype(mut self, prototype: Option<ObjectId>) -> Self {
        self.prototype = prototype;
        self
    }

    pub fn with_native<T: Finalize>(mut self, state: T) -> Self {
        self.slots.native = Some(Box::new(state));
        self
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn get_own(&self, key: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(name, _)| name.as_ref() == key)
            .map(|(_, property)| property)
    }

    /// Stores `value` under `key`. Returns the displaced value, which the
    /// caller must release, or gives `value` back if the property is
    /// read-only.
    pub fn set_own(&mut self, key: &str, value: JsValue) -> Result<Option<JsValue>, JsValue> {
        if let Some((_, existing)) = self
            .properties
            .iter_mut()
            .find(|(name, _)| name.as_ref() == key)
        {
            if !existing.writable {
                return Err(value);
            }
            return Ok(Some(std::mem::replace(&mut existing.value, value)));
        }
        self.properties.push((Rc::from(key), Property::new(value)));
        Ok(None)
    }

    pub fn define_own(&mut self, key: &str, property: Property) -> Option<JsValue> {
        if let Some((_, existing)) = self
            .properties
            .iter_mut()
            .find(|(name, _)| name.as_ref() == key)
        {
            return Some(std::mem::replace(existing, property).value);
        }
        self.properties.push((Rc::from(key), property));
        None
    }

    pub fn remove_own(&mut self, key: &str) -> Removal {
        let Some(position) = self
            .properties
            .iter()
            .position(|(name, _)| name.as_ref() == key)
        else {
            return Removal::Absent;
        };
        if !self.properties[position].1.configurable {
            return Removal::Locked;
        }
        Removal::Removed(self.properties.remove(position).1.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(_, property)| property.enumerable)
            .map(|(name, _)| name.as_ref())
    }

    pub fn native<T: 'static>(&self) -> Option<&T> {
        self.slots
            .native
            .as_ref()
            .and_then(|state| state.as_any().downcast_ref::<T>())
    }

    pub fn native_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .native
            .as_mut()
            .and_then(|state| state.as_any_mut().downcast_mut::<T>())
    }

    pub fn companion(&self) -> Option<ObjectId> {
        self.slots.companion
    }
}

impl Trace for JsObject {
    fn trace(&self, tracer: &mut Tracer) {
        for (_, property) in &self.properties {
            property.trace(tracer);
        }
        self.prototype.trace(tracer);
        self.slots.companion.trace(tracer);
    }
}
