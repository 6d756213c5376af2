//! Per-object record of the weak references watching it.
//!
//! The registry is a companion object hung off the target's internal slots.
//! It is invisible to property access and is released together with the
//! target, at which point its finalizer tombstones every listed reference.

use crate::embedding::reference::Reference;
use crate::errors::Status;
use crate::runtime::Runtime;
use crate::runtime::value::object::Finalize;
use crate::runtime::value::{JsObject, JsValue, ObjectClass, ObjectId};

#[derive(Debug, Default)]
pub(crate) struct ReferenceRegistry {
    entries: Vec<Reference>,
}

impl Finalize for ReferenceRegistry {
    fn finalize(self: Box<Self>, runtime: &Runtime) {
        let mut references = runtime.references_mut();
        for reference in self.entries {
            references.tombstone(reference);
        }
    }
}

pub(crate) fn attach_weak(
    runtime: &Runtime,
    target: ObjectId,
    reference: Reference,
) -> Result<(), Status> {
    let companion = runtime
        .heap()
        .get(target)
        .ok_or(Status::GenericFailure)?
        .companion();
    let companion = match companion {
        Some(companion) => companion,
        None => {
            let companion = runtime.alloc(
                JsObject::new(ObjectClass::ReferenceRegistry)
                    .with_native(ReferenceRegistry::default()),
            )?;
            // allocation can run a collection that reclaims the target
            let mut heap = runtime.heap_mut();
            match heap.get_mut(target) {
                Some(object) => {
                    object.slots.companion = Some(companion);
                }
                None => {
                    drop(heap);
                    runtime.release(&JsValue::Object(companion));
                    return Err(Status::GenericFailure);
                }
            }
            companion
        }
    };

    let mut heap = runtime.heap_mut();
    let registry = heap
        .get_mut(companion)
        .and_then(|object| object.native_mut::<ReferenceRegistry>())
        .ok_or(Status::GenericFailure)?;
    registry
        .entries
        .try_reserve(1)
        .map_err(|_| Status::OutOfMemory)?;
    registry.entries.push(reference);
    Ok(())
}

/// Removes `reference` from the target's registry. The registry itself is
/// dropped once it becomes empty. A target that is already gone is not an
/// error.
pub(crate) fn detach_weak(
    runtime: &Runtime,
    target: ObjectId,
    reference: Reference,
) -> Result<(), Status> {
    let emptied = {
        let mut heap = runtime.heap_mut();
        let Some(companion) = heap.get(target).and_then(JsObject::companion) else {
            return Ok(());
        };
        let Some(registry) = heap
            .get_mut(companion)
            .and_then(|object| object.native_mut::<ReferenceRegistry>())
        else {
            return Ok(());
        };
        registry.entries.retain(|entry| *entry != reference);
        if registry.entries.is_empty() {
            if let Some(object) = heap.get_mut(target) {
                object.slots.companion = None;
            }
            Some(companion)
        } else {
            None
        }
    };
    if let Some(companion) = emptied {
        runtime.release(&JsValue::Object(companion));
    }
    Ok(())
}

pub(crate) fn has_registry(runtime: &Runtime, target: ObjectId) -> bool {
    runtime
        .heap()
        .get(target)
        .and_then(JsObject::companion)
        .is_some()
}
