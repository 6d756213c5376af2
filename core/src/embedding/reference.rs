//! Host-owned references that outlive rooting scopes.
//!
//! A reference with a positive count holds the engine value strongly. At
//! count zero an object target is held weakly: the reference is listed in the
//! object's registry and is tombstoned when the engine reclaims the object.

use crate::context::ContextId;
use crate::embedding::registry;
use crate::errors::Status;
use crate::runtime::Runtime;
use crate::runtime::value::{JsValue, ObjectId};

/// Opaque token for a reference. Stays valid until `delete_reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum Hold {
    Strong(JsValue),
    Weak(ObjectId),
    Tombstoned,
}

#[derive(Debug)]
struct ReferenceSlot {
    hold: Hold,
    count: u32,
    owner: ContextId,
}

struct TableEntry {
    generation: u32,
    slot: Option<ReferenceSlot>,
}

/// Runtime-wide storage for references.
#[derive(Default)]
pub(crate) struct ReferenceTable {
    entries: Vec<TableEntry>,
    free: Vec<u32>,
    live: usize,
}

impl ReferenceTable {
    fn insert(&mut self, slot: ReferenceSlot) -> Result<Reference, Status> {
        let index = match self.free.pop() {
            Some(index) => {
                self.entries[index as usize].slot = Some(slot);
                index
            }
            None => {
                let index = u32::try_from(self.entries.len()).map_err(|_| Status::OutOfMemory)?;
                self.entries
                    .try_reserve(1)
                    .map_err(|_| Status::OutOfMemory)?;
                self.entries.push(TableEntry {
                    generation: 0,
                    slot: Some(slot),
                });
                index
            }
        };
        self.live += 1;
        Ok(Reference {
            index,
            generation: self.entries[index as usize].generation,
        })
    }

    fn get(&self, reference: Reference) -> Option<&ReferenceSlot> {
        self.entries
            .get(reference.index as usize)
            .filter(|entry| entry.generation == reference.generation)
            .and_then(|entry| entry.slot.as_ref())
    }

    fn get_mut(&mut self, reference: Reference) -> Option<&mut ReferenceSlot> {
        self.entries
            .get_mut(reference.index as usize)
            .filter(|entry| entry.generation == reference.generation)
            .and_then(|entry| entry.slot.as_mut())
    }

    fn remove(&mut self, reference: Reference) -> Option<ReferenceSlot> {
        let entry = self
            .entries
            .get_mut(reference.index as usize)
            .filter(|entry| entry.generation == reference.generation)?;
        let slot = entry.slot.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(reference.index);
        self.live -= 1;
        Some(slot)
    }

    /// Called by a registry finalizer once the watched object is gone.
    pub(crate) fn tombstone(&mut self, reference: Reference) {
        if let Some(slot) = self.get_mut(reference)
            && matches!(slot.hold, Hold::Weak(_))
        {
            tracing::trace!(?reference, "reference target collected");
            slot.hold = Hold::Tombstoned;
        }
    }

    pub(crate) fn owned_by(&self, owner: ContextId) -> Vec<Reference> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let slot = entry.slot.as_ref()?;
                (slot.owner == owner).then_some(Reference {
                    index: index as u32,
                    generation: entry.generation,
                })
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

pub(crate) fn create(
    runtime: &Runtime,
    owner: ContextId,
    value: JsValue,
    initial_count: u32,
) -> Result<Reference, Status> {
    let hold = match (&value, initial_count) {
        (JsValue::Object(id), 0) => Hold::Weak(*id),
        (_, 0) => Hold::Tombstoned,
        _ => Hold::Strong(value),
    };
    if let Hold::Strong(value) = &hold {
        runtime.dup(value);
    }
    let slot = ReferenceSlot {
        hold: hold.clone(),
        count: initial_count,
        owner,
    };
    let inserted = runtime.references_mut().insert(slot);
    let reference = match inserted {
        Ok(reference) => reference,
        Err(status) => {
            if let Hold::Strong(value) = &hold {
                runtime.release(value);
            }
            return Err(status);
        }
    };
    if let Hold::Weak(target) = hold
        && let Err(status) = registry::attach_weak(runtime, target, reference)
    {
        runtime.references_mut().remove(reference);
        return Err(status);
    }
    tracing::trace!(?reference, initial_count, "created reference");
    Ok(reference)
}

pub(crate) fn add_ref(runtime: &Runtime, reference: Reference) -> Result<u32, Status> {
    let (hold, count) = {
        let table = runtime.references();
        let slot = table.get(reference).ok_or(Status::InvalidArgument)?;
        (slot.hold.clone(), slot.count)
    };
    let count = match hold {
        Hold::Tombstoned => return Err(Status::GenericFailure),
        Hold::Strong(_) => count.checked_add(1).ok_or(Status::GenericFailure)?,
        Hold::Weak(target) => {
            if !runtime.heap().contains(target) {
                return Err(Status::GenericFailure);
            }
            registry::detach_weak(runtime, target, reference)?;
            let value = JsValue::Object(target);
            runtime.dup(&value);
            if let Some(slot) = runtime.references_mut().get_mut(reference) {
                slot.hold = Hold::Strong(value);
            }
            1
        }
    };
    if let Some(slot) = runtime.references_mut().get_mut(reference) {
        slot.count = count;
    }
    tracing::trace!(?reference, count, "reference ref");
    Ok(count)
}

pub(crate) fn unref(runtime: &Runtime, reference: Reference) -> Result<u32, Status> {
    let (hold, count) = {
        let table = runtime.references();
        let slot = table.get(reference).ok_or(Status::InvalidArgument)?;
        (slot.hold.clone(), slot.count)
    };
    if count == 0 {
        return Err(Status::GenericFailure);
    }
    if count > 1 {
        if let Some(slot) = runtime.references_mut().get_mut(reference) {
            slot.count = count - 1;
        }
        tracing::trace!(?reference, count = count - 1, "reference unref");
        return Ok(count - 1);
    }

    let Hold::Strong(value) = hold else {
        return Err(Status::GenericFailure);
    };
    match value {
        JsValue::Object(target) => {
            registry::attach_weak(runtime, target, reference)?;
            if let Some(slot) = runtime.references_mut().get_mut(reference) {
                slot.hold = Hold::Weak(target);
                slot.count = 0;
            }
            // may reclaim the target right away, which tombstones this reference
            runtime.release(&JsValue::Object(target));
        }
        _ => {
            if let Some(slot) = runtime.references_mut().get_mut(reference) {
                slot.hold = Hold::Tombstoned;
                slot.count = 0;
            }
        }
    }
    tracing::trace!(?reference, "reference became weak");
    Ok(0)
}

pub(crate) fn delete(runtime: &Runtime, reference: Reference) -> Result<(), Status> {
    let hold = runtime
        .references()
        .get(reference)
        .map(|slot| slot.hold.clone())
        .ok_or(Status::InvalidArgument)?;
    if let Hold::Weak(target) = hold {
        registry::detach_weak(runtime, target, reference)?;
    }
    runtime.references_mut().remove(reference);
    if let Hold::Strong(value) = hold {
        runtime.release(&value);
    }
    tracing::trace!(?reference, "deleted reference");
    Ok(())
}

/// `None` once the reference is tombstoned.
pub(crate) fn value(runtime: &Runtime, reference: Reference) -> Result<Option<JsValue>, Status> {
    let table = runtime.references();
    let slot = table.get(reference).ok_or(Status::InvalidArgument)?;
    Ok(match &slot.hold {
        Hold::Strong(value) => Some(value.clone()),
        Hold::Weak(target) => Some(JsValue::Object(*target)),
        Hold::Tombstoned => None,
    })
}

pub(crate) fn count(runtime: &Runtime, reference: Reference) -> Result<u32, Status> {
    runtime
        .references()
        .get(reference)
        .map(|slot| slot.count)
        .ok_or(Status::InvalidArgument)
}
