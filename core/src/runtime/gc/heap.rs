use serde::Serialize;

use super::marker;
use super::sweeper;
use super::trace::{Trace, Tracer};
use crate::errors::Status;
use crate::runtime::value::object::NativeState;
use crate::runtime::value::{JsObject, ObjectId};

const DEFAULT_COLLECTION_THRESHOLD: usize = 1024;

struct GcBox {
    refcount: u32,
    marked: bool,
    object: JsObject,
}

struct HeapSlot {
    generation: u32,
    cell: Option<GcBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    pub before: usize,
    pub after: usize,
    pub collected: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeapStats {
    pub live_objects: usize,
    pub total_allocated: u64,
    pub total_freed: u64,
    pub collections: u64,
    pub pending_finalizers: usize,
}

/// Reference-counted object heap with a backup cycle collector.
///
/// Objects are freed as soon as their count drops to zero. Cycles are found
/// by `collect`, which treats any object whose count exceeds the number of
/// heap edges pointing at it as externally held.
pub struct Heap {
    slots: Vec<HeapSlot>,
    free: Vec<u32>,
    live_count: usize,
    alloc_count: usize,
    collection_threshold: usize,
    base_threshold: usize,
    object_limit: Option<usize>,
    total_allocated: u64,
    total_freed: u64,
    collections: u64,
    pending: Vec<Box<dyn NativeState>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_COLLECTION_THRESHOLD, None)
    }

    pub fn with_limits(collection_threshold: usize, object_limit: Option<usize>) -> Self {
        let base_threshold = collection_threshold.max(1);
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live_count: 0,
            alloc_count: 0,
            collection_threshold: base_threshold,
            base_threshold,
            object_limit,
            total_allocated: 0,
            total_freed: 0,
            collections: 0,
            pending: Vec::new(),
        }
    }

    /// Allocates `object` with a reference count of one, owned by the caller.
    pub fn alloc(&mut self, object: JsObject) -> Result<ObjectId, Status> {
        if self
            .object_limit
            .is_some_and(|limit| self.live_count >= limit)
        {
            return Err(Status::OutOfMemory);
        }
        let cell = GcBox {
            refcount: 1,
            marked: false,
            object,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].cell = Some(cell);
                index
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| Status::OutOfMemory)?;
                self.slots
                    .try_reserve(1)
                    .map_err(|_| Status::OutOfMemory)?;
                self.slots.push(HeapSlot {
                    generation: 0,
                    cell: Some(cell),
                });
                index
            }
        };
        self.live_count += 1;
        self.alloc_count += 1;
        self.total_allocated += 1;
        Ok(ObjectId::new(index, self.slots[index as usize].generation))
    }

    pub fn get(&self, id: ObjectId) -> Option<&JsObject> {
        self.resolve(id)
            .and_then(|index| self.slots[index].cell.as_ref())
            .map(|cell| &cell.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        self.resolve(id)
            .and_then(|index| self.slots[index].cell.as_mut())
            .map(|cell| &mut cell.object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.resolve(id).is_some()
    }

    pub fn refcount(&self, id: ObjectId) -> Option<u32> {
        self.resolve(id)
            .and_then(|index| self.slots[index].cell.as_ref())
            .map(|cell| cell.refcount)
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Takes one more reference on `id`. Returns false for a dead object.
    pub fn dup(&mut self, id: ObjectId) -> bool {
        match self
            .resolve(id)
            .and_then(|index| self.slots[index].cell.as_mut())
        {
            Some(cell) => {
                cell.refcount = cell.refcount.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Drops one reference on `id`, freeing it and everything that becomes
    /// unreferenced as a result. Native state of freed objects is queued for
    /// finalization.
    pub fn release(&mut self, id: ObjectId) {
        let mut worklist = vec![id];
        let mut tracer = Tracer::new();
        while let Some(id) = worklist.pop() {
            let Some(index) = self.resolve(id) else {
                continue;
            };
            let Some(cell) = self.slots[index].cell.as_mut() else {
                continue;
            };
            cell.refcount = cell.refcount.saturating_sub(1);
            if cell.refcount > 0 {
                continue;
            }
            if let Some(object) = self.free_slot(index) {
                object.trace(&mut tracer);
                worklist.extend(tracer.take_discovered());
                self.queue_native(object);
            }
        }
    }

    pub fn should_collect(&self) -> bool {
        self.alloc_count >= self.collection_threshold
    }

    /// Reclaims unreachable cycles.
    pub fn collect(&mut self) -> CollectStats {
        let before = self.live_count;
        let roots = self.external_roots();
        marker::mark_from_roots(self, &roots);
        let collected = sweeper::sweep(self);
        self.collections += 1;
        self.alloc_count = 0;
        self.collection_threshold = (self.live_count * 2).max(self.base_threshold);
        tracing::debug!(before, after = self.live_count, collected, "cycle collection");
        CollectStats {
            before,
            after: self.live_count,
            collected,
        }
    }

    pub fn take_pending(&mut self) -> Vec<Box<dyn NativeState>> {
        std::mem::take(&mut self.pending)
    }

    /// Frees every remaining object; used when the runtime shuts down.
    pub fn drain_all(&mut self) -> Vec<Box<dyn NativeState>> {
        for index in 0..self.slots.len() {
            if let Some(object) = self.free_slot(index) {
                self.queue_native(object);
            }
        }
        self.take_pending()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.live_count,
            total_allocated: self.total_allocated,
            total_freed: self.total_freed,
            collections: self.collections,
            pending_finalizers: self.pending.len(),
        }
    }

    pub(crate) fn resolve(&self, id: ObjectId) -> Option<usize> {
        let index = id.index as usize;
        let slot = self.slots.get(index)?;
        (slot.generation == id.generation && slot.cell.is_some()).then_some(index)
    }

    pub(crate) fn is_marked(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .and_then(|slot| slot.cell.as_ref())
            .map(|cell| cell.marked)
            .unwrap_or(false)
    }

    pub(crate) fn exists(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .and_then(|slot| slot.cell.as_ref())
            .is_some()
    }

    pub(crate) fn mark(&mut self, index: usize) {
        if let Some(cell) = self.slots.get_mut(index).and_then(|slot| slot.cell.as_mut()) {
            cell.marked = true;
        }
    }

    pub(crate) fn trace_index(&self, index: usize, tracer: &mut Tracer) {
        if let Some(cell) = self.slots.get(index).and_then(|slot| slot.cell.as_ref()) {
            cell.object.trace(tracer);
        }
    }

    /// Returns the indices of unmarked objects and clears the mark on the
    /// rest.
    pub(crate) fn unmarked_indices(&mut self) -> Vec<usize> {
        let mut garbage = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(cell) = slot.cell.as_mut() {
                if cell.marked {
                    cell.marked = false;
                } else {
                    garbage.push(index);
                }
            }
        }
        garbage
    }

    pub(crate) fn free_slot(&mut self, index: usize) -> Option<JsObject> {
        let slot = self.slots.get_mut(index)?;
        let cell = slot.cell.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        self.live_count -= 1;
        self.total_freed += 1;
        Some(cell.object)
    }

    pub(crate) fn queue_native(&mut self, mut object: JsObject) {
        if let Some(native) = object.slots.native.take() {
            self.pending.push(native);
        }
    }

    /// Objects whose reference count is not explained by edges from other
    /// heap objects are held from outside the heap.
    fn external_roots(&self) -> Vec<usize> {
        let mut internal = vec![0u32; self.slots.len()];
        let mut tracer = Tracer::new();
        for slot in &self.slots {
            if let Some(cell) = &slot.cell {
                cell.object.trace(&mut tracer);
            }
        }
        for id in tracer.take_discovered() {
            if let Some(index) = self.resolve(id) {
                internal[index] += 1;
            }
        }
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let cell = slot.cell.as_ref()?;
                (cell.refcount > internal[index]).then_some(index)
            })
            .collect()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
