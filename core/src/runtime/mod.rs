pub mod gc;
pub mod value;

use std::cell::{Cell, Ref, RefCell, RefMut};

use crate::embedding::reference::ReferenceTable;
use crate::engine::EngineConfig;
use crate::errors::Status;
use gc::{CollectStats, Heap, HeapStats};
use value::{JsObject, JsValue, ObjectId};

/// Identifier handed out to host-defined classes.
pub type ClassId = u32;

/// The engine instance shared by every context of one `Engine`: the object
/// heap, the table of host references and class id allocation.
pub struct Runtime {
    heap: RefCell<Heap>,
    references: RefCell<ReferenceTable>,
    next_class_id: Cell<ClassId>,
    finalizing: Cell<bool>,
}

impl Runtime {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        tracing::debug!(?config, "creating runtime");
        Self {
            heap: RefCell::new(Heap::with_limits(config.gc_threshold, config.heap_limit)),
            references: RefCell::new(ReferenceTable::default()),
            next_class_id: Cell::new(1),
            finalizing: Cell::new(false),
        }
    }

    pub(crate) fn heap(&self) -> Ref<'_, Heap> {
        self.heap.borrow()
    }

    pub(crate) fn heap_mut(&self) -> RefMut<'_, Heap> {
        self.heap.borrow_mut()
    }

    pub(crate) fn references(&self) -> Ref<'_, ReferenceTable> {
        self.references.borrow()
    }

    pub(crate) fn references_mut(&self) -> RefMut<'_, ReferenceTable> {
        self.references.borrow_mut()
    }

    /// Allocates an object owned by the caller. May run a cycle collection
    /// (and therefore finalizers) first.
    pub(crate) fn alloc(&self, object: JsObject) -> Result<ObjectId, Status> {
        let id = {
            let mut heap = self.heap_mut();
            if heap.should_collect() {
                heap.collect();
            }
            heap.alloc(object)
        };
        self.run_finalizers();
        id
    }

    pub(crate) fn dup(&self, value: &JsValue) {
        if let JsValue::Object(id) = value {
            self.heap_mut().dup(*id);
        }
    }

    pub(crate) fn release(&self, value: &JsValue) {
        if let JsValue::Object(id) = value {
            self.heap_mut().release(*id);
            self.run_finalizers();
        }
    }

    pub(crate) fn collect_garbage(&self) -> CollectStats {
        let stats = self.heap_mut().collect();
        self.run_finalizers();
        stats
    }

    pub(crate) fn stats(&self) -> HeapStats {
        self.heap().stats()
    }

    pub(crate) fn new_class_id(&self) -> ClassId {
        let id = self.next_class_id.get();
        self.next_class_id.set(id.wrapping_add(1));
        id
    }

    /// Runs queued finalizers outside of any heap borrow. Nested calls (a
    /// finalizer releasing values) are absorbed by the outermost loop.
    fn run_finalizers(&self) {
        if self.finalizing.replace(true) {
            return;
        }
        loop {
            let pending = self.heap_mut().take_pending();
            if pending.is_empty() {
                break;
            }
            for state in pending {
                state.finalize_boxed(self);
            }
        }
        self.finalizing.set(false);
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let remaining = self.heap.get_mut().drain_all();
        tracing::debug!(finalizers = remaining.len(), "tearing down runtime");
        for state in remaining {
            state.finalize_boxed(self);
        }
    }
}
