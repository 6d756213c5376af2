use super::heap::Heap;
use super::trace::{Trace, Tracer};

/// Frees every unmarked object and drops the references they held on
/// surviving objects. Returns the number of objects freed.
pub fn sweep(heap: &mut Heap) -> usize {
    let garbage = heap.unmarked_indices();
    let mut tracer = Tracer::new();
    for &index in &garbage {
        if let Some(object) = heap.free_slot(index) {
            object.trace(&mut tracer);
            heap.queue_native(object);
        }
    }
    // edges into freed objects carry a stale generation and are skipped
    for child in tracer.take_discovered() {
        heap.release(child);
    }
    garbage.len()
}
