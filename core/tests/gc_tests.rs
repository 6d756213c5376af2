use napibridge::Value;
use napibridge::runtime::gc::Heap;
use napibridge::runtime::value::{JsObject, ObjectClass};

fn ordinary() -> JsObject {
    JsObject::new(ObjectClass::Ordinary)
}

#[test]
fn release_frees_an_object_and_its_children() {
    let mut heap = Heap::new();
    let parent = heap.alloc(ordinary()).expect("parent should allocate");
    let child = heap.alloc(ordinary()).expect("child should allocate");

    heap.get_mut(parent)
        .expect("parent should exist")
        .set_own("child", Value::Object(child))
        .expect("child property should be writable");
    assert_eq!(heap.refcount(child), Some(1), "ownership moved into the parent");

    heap.release(parent);
    assert!(!heap.contains(parent));
    assert!(!heap.contains(child));
    assert_eq!(heap.live_count(), 0);
}

#[test]
fn collect_keeps_externally_held_objects() {
    let mut heap = Heap::new();
    let held = heap.alloc(ordinary()).expect("object should allocate");

    let stats = heap.collect();
    assert_eq!(stats.collected, 0);
    assert!(heap.contains(held));
}

#[test]
fn collects_cycles_when_unreachable() {
    let mut heap = Heap::new();
    let a = heap.alloc(ordinary()).expect("node a should allocate");
    let b = heap.alloc(ordinary()).expect("node b should allocate");

    heap.dup(b);
    heap.get_mut(a)
        .expect("node a should exist")
        .set_own("next", Value::Object(b))
        .expect("a.next should be writable");
    heap.dup(a);
    heap.get_mut(b)
        .expect("node b should exist")
        .set_own("next", Value::Object(a))
        .expect("b.next should be writable");

    heap.release(a);
    heap.release(b);
    assert_eq!(heap.live_count(), 2, "reference counting alone leaks the cycle");

    let stats = heap.collect();
    assert_eq!(stats.collected, 2);
    assert!(!heap.contains(a));
    assert!(!heap.contains(b));
}

#[test]
fn collection_releases_edges_into_survivors() {
    let mut heap = Heap::new();
    let survivor = heap.alloc(ordinary()).expect("survivor should allocate");
    let cyclic = heap.alloc(ordinary()).expect("cyclic node should allocate");

    heap.dup(survivor);
    heap.dup(cyclic);
    let node = heap.get_mut(cyclic).expect("cyclic node should exist");
    node.set_own("self", Value::Object(cyclic))
        .expect("self link should be writable");
    node.set_own("survivor", Value::Object(survivor))
        .expect("survivor link should be writable");
    heap.release(cyclic);
    assert_eq!(heap.refcount(survivor), Some(2));

    heap.collect();
    assert!(!heap.contains(cyclic));
    assert_eq!(heap.refcount(survivor), Some(1));
}

#[test]
fn stale_ids_do_not_alias_reused_slots() {
    let mut heap = Heap::new();
    let first = heap.alloc(ordinary()).expect("first should allocate");
    heap.release(first);
    let second = heap.alloc(ordinary()).expect("second should allocate");

    assert_eq!(first.index(), second.index(), "the slot is reused");
    assert!(!heap.contains(first));
    assert!(heap.contains(second));
    assert!(!heap.dup(first));
}

#[test]
fn stats_track_allocation_and_collection() {
    let mut heap = Heap::with_limits(8, Some(2));
    let a = heap.alloc(ordinary()).expect("a should allocate");
    heap.alloc(ordinary()).expect("b should allocate");
    assert!(heap.alloc(ordinary()).is_err());

    heap.release(a);
    heap.collect();
    let stats = heap.stats();
    assert_eq!(stats.live_objects, 1);
    assert_eq!(stats.total_allocated, 2);
    assert_eq!(stats.total_freed, 1);
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.pending_finalizers, 0);
}
