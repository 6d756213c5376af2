use crate::runtime::gc::Heap;
use crate::runtime::value::{JsValue, ObjectId};

/// Looks `key` up along the prototype chain starting at `id`.
pub fn find_property(heap: &Heap, id: ObjectId, key: &str) -> Option<JsValue> {
    let mut current = Some(id);
    while let Some(candidate) = current {
        let object = heap.get(candidate)?;
        if let Some(property) = object.get_own(key) {
            return Some(property.value.clone());
        }
        current = object.prototype;
    }
    None
}

/// Whether `prototype` appears on the prototype chain of `id` (excluding
/// `id` itself).
pub fn has_in_chain(heap: &Heap, id: ObjectId, prototype: ObjectId) -> bool {
    let mut current = heap.get(id).and_then(|object| object.prototype);
    while let Some(candidate) = current {
        if candidate == prototype {
            return true;
        }
        current = heap.get(candidate).and_then(|object| object.prototype);
    }
    false
}
