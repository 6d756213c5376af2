use std::cell::{Cell, RefCell};
use std::rc::Rc;

use napibridge::{Engine, FinalizeCallback, HostData, ValueType};

fn counting_finalizer(calls: &Rc<Cell<u32>>) -> FinalizeCallback {
    let calls = Rc::clone(calls);
    Box::new(move |_: HostData, _: Option<HostData>| calls.set(calls.get() + 1))
}

#[test]
fn finalizer_runs_once_with_the_bound_data() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let seen: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

    let scope = ctx.open_handle_scope().expect("scope should open");
    let sink = Rc::clone(&seen);
    let external = ctx
        .create_external(
            Rc::new(42u32),
            Some(Box::new(move |data: HostData, _hint: Option<HostData>| {
                let value = data.downcast_ref::<u32>().copied().unwrap_or_default();
                sink.borrow_mut().push(value);
            })),
            None,
        )
        .expect("external should be created");
    assert_eq!(ctx.type_of(external), Ok(ValueType::External));
    assert!(seen.borrow().is_empty(), "finalizer must wait for collection");

    ctx.close_handle_scope(scope).expect("scope should close");
    ctx.collect_garbage();
    assert_eq!(*seen.borrow(), vec![42]);
}

#[test]
fn finalizer_receives_the_hint() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let hint_seen = Rc::new(Cell::new(false));

    let scope = ctx.open_handle_scope().expect("scope should open");
    let flag = Rc::clone(&hint_seen);
    let hint: HostData = Rc::new("hint");
    ctx.create_external(
        Rc::new(String::from("payload")),
        Some(Box::new(move |_data: HostData, hint: Option<HostData>| {
            let matches = hint
                .as_ref()
                .and_then(|hint| hint.downcast_ref::<&str>())
                .is_some_and(|hint| *hint == "hint");
            flag.set(matches);
        })),
        Some(hint),
    )
    .expect("external should be created");
    ctx.close_handle_scope(scope).expect("scope should close");

    assert!(hint_seen.get());
}

#[test]
fn external_kept_by_a_reference_is_not_finalized() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let calls = Rc::new(Cell::new(0u32));

    let scope = ctx.open_handle_scope().expect("scope should open");
    let external = ctx
        .create_external(
            Rc::new(()),
            Some(counting_finalizer(&calls)),
            None,
        )
        .expect("external should be created");
    let reference = ctx
        .create_reference(external, 1)
        .expect("reference should be created");
    ctx.close_handle_scope(scope).expect("scope should close");

    ctx.collect_garbage();
    assert_eq!(calls.get(), 0);

    ctx.delete_reference(reference)
        .expect("reference should delete");
    ctx.collect_garbage();
    assert_eq!(calls.get(), 1);
}

#[test]
fn external_data_probe() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let data: HostData = Rc::new(7i64);
    let external = ctx
        .create_external(Rc::clone(&data), None, None)
        .expect("external should be created");
    let plain = ctx.create_object().expect("object should be created");
    let number = ctx.create_double(1.0).expect("number should be created");

    let found = ctx
        .get_value_external(external)
        .expect("probe should succeed")
        .expect("external should carry data");
    assert!(Rc::ptr_eq(&found, &data));
    assert!(matches!(ctx.get_value_external(plain), Ok(None)));
    assert!(matches!(ctx.get_value_external(number), Ok(None)));

    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn failed_creation_never_finalizes() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let calls = Rc::new(Cell::new(0u32));
    let baseline = ctx.heap_stats().live_objects;

    let result = ctx.create_external(
        Rc::new(()),
        Some(counting_finalizer(&calls)),
        None,
    );
    assert!(result.is_err(), "no scope is open to root the external");
    assert_eq!(calls.get(), 0);
    assert_eq!(ctx.heap_stats().live_objects, baseline);
}

#[test]
fn remaining_externals_finalize_when_the_runtime_goes_away() {
    let calls = Rc::new(Cell::new(0u32));
    let engine = Engine::new();
    {
        let mut ctx = engine.new_context().expect("context should be created");
        let scope = ctx.open_handle_scope().expect("scope should open");
        let external = ctx
            .create_external(Rc::new(()), Some(counting_finalizer(&calls)), None)
            .expect("external should be created");
        let holder = ctx.create_object().expect("holder should be created");
        // a cycle through the external keeps it alive until teardown
        ctx.set_named_property(holder, "external", external)
            .expect("holder.external should be set");
        ctx.set_named_property(external, "holder", holder)
            .expect("external.holder should be set");
        ctx.close_handle_scope(scope).expect("scope should close");
        assert_eq!(calls.get(), 0);
    }
    assert!(!engine.has_runtime());
    assert_eq!(calls.get(), 1);
}
