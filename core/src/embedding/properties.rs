use crate::context::Context;
use crate::embedding::handle::Handle;
use crate::errors::Status;
use crate::runtime::value::object::prototype;
use crate::runtime::value::{JsValue, ObjectId, Removal};

impl Context {
    pub fn set_property(&mut self, object: Handle, key: Handle, value: Handle) -> Result<(), Status> {
        self.preamble()?;
        let key = self.display_string(key)?;
        self.set_named_property(object, &key, value)
    }

    /// Assignments to read-only properties are ignored.
    pub fn set_named_property(
        &mut self,
        object: Handle,
        key: &str,
        value: Handle,
    ) -> Result<(), Status> {
        self.preamble()?;
        let target = self.object_id(object)?;
        let value = self.value(value)?.clone();
        self.runtime().dup(&value);
        let outcome = {
            let mut heap = self.runtime().heap_mut();
            match heap.get_mut(target) {
                Some(object) => object.set_own(key, value.clone()),
                None => Err(value.clone()),
            }
        };
        match outcome {
            Ok(Some(previous)) => self.runtime().release(&previous),
            Ok(None) => {}
            Err(rejected) => self.runtime().release(&rejected),
        }
        Ok(())
    }

    pub fn get_property(&mut self, object: Handle, key: Handle) -> Result<Handle, Status> {
        self.preamble()?;
        let key = self.display_string(key)?;
        self.get_named_property(object, &key)
    }

    /// Looks along the prototype chain; a missing key reads as `undefined`.
    pub fn get_named_property(&mut self, object: Handle, key: &str) -> Result<Handle, Status> {
        self.preamble()?;
        let target = self.object_id(object)?;
        let found = prototype::find_property(&self.runtime().heap(), target, key)
            .unwrap_or(JsValue::Undefined);
        self.root_dup(found)
    }

    pub fn has_property(&mut self, object: Handle, key: Handle) -> Result<bool, Status> {
        self.preamble()?;
        let target = self.object_id(object)?;
        let key = self.display_string(key)?;
        Ok(prototype::find_property(&self.runtime().heap(), target, &key).is_some())
    }

    /// Removes an own property. Returns false only for a non-configurable
    /// property; deleting a missing key succeeds.
    pub fn delete_property(&mut self, object: Handle, key: Handle) -> Result<bool, Status> {
        self.preamble()?;
        let target = self.object_id(object)?;
        let key = self.display_string(key)?;
        let removal = {
            let mut heap = self.runtime().heap_mut();
            let object = heap.get_mut(target).ok_or(Status::InvalidArgument)?;
            object.remove_own(&key)
        };
        Ok(match removal {
            Removal::Removed(value) => {
                self.runtime().release(&value);
                true
            }
            Removal::Absent => true,
            Removal::Locked => false,
        })
    }

    /// Enumerable own keys, in insertion order.
    pub fn property_names(&self, object: Handle) -> Result<Vec<String>, Status> {
        let target = self.object_id(object)?;
        let heap = self.runtime().heap();
        let object = heap.get(target).ok_or(Status::InvalidArgument)?;
        Ok(object.keys().map(str::to_string).collect())
    }

    fn object_id(&self, value: Handle) -> Result<ObjectId, Status> {
        self.value(value)?.as_object().ok_or(Status::ObjectExpected)
    }
}
