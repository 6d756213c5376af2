use std::cell::Cell;
use std::rc::Rc;

use napibridge::{ClassBuilder, Engine, HostData, NativeFunctionBoxed, Status, ValueType};

#[test]
fn host_function_receives_arguments_and_returns_a_value() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let add = NativeFunctionBoxed::from_closure(|cx, info| {
        let a = cx.get_value_double(info.arg(0))?;
        let b = cx.get_value_double(info.arg(1))?;
        cx.create_double(a + b).map(Some)
    });
    let function = ctx
        .create_function("add", add, None)
        .expect("function should be created");
    assert_eq!(ctx.type_of(function), Ok(ValueType::Function));

    let this = ctx.get_undefined().expect("undefined should be available");
    let a = ctx.create_double(40.0).expect("a should be created");
    let b = ctx.create_double(2.0).expect("b should be created");
    let result = ctx
        .call_function(this, function, &[a, b])
        .expect("call should succeed")
        .expect("add returns a value");
    assert_eq!(ctx.get_value_double(result), Ok(42.0));
    assert_eq!(ctx.scope_depth(), 1, "the call scope is closed again");

    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn missing_arguments_read_as_undefined() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let describe = NativeFunctionBoxed::from_closure(|cx, info| {
        let args = info.args(3);
        assert_eq!(info.len(), 1);
        assert_eq!(cx.type_of(args[0]), Ok(ValueType::Number));
        assert_eq!(cx.type_of(args[1]), Ok(ValueType::Undefined));
        assert_eq!(cx.type_of(args[2]), Ok(ValueType::Undefined));
        Ok(None)
    });
    let function = ctx
        .create_function("describe", describe, None)
        .expect("function should be created");
    let this = ctx.get_undefined().expect("undefined should be available");
    let only = ctx.create_double(1.0).expect("argument should be created");
    let result = ctx
        .call_function(this, function, &[only])
        .expect("call should succeed");
    assert!(result.is_none());

    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn returned_object_outlives_the_call_scope() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let baseline = ctx.heap_stats().live_objects;
    let scope = ctx.open_handle_scope().expect("scope should open");

    let make = NativeFunctionBoxed::from_closure(|cx, _info| {
        for _ in 0..4 {
            cx.create_object()?;
        }
        cx.create_object().map(Some)
    });
    let function = ctx
        .create_function("make", make, None)
        .expect("function should be created");
    let this = ctx.get_undefined().expect("undefined should be available");
    let made = ctx
        .call_function(this, function, &[])
        .expect("call should succeed")
        .expect("make returns an object");

    assert_eq!(ctx.refcount(made), Ok(Some(1)));
    assert_eq!(
        ctx.heap_stats().live_objects,
        baseline + 2,
        "temporaries are released with the call scope"
    );
    ctx.close_handle_scope(scope).expect("scope should close");
    assert_eq!(ctx.heap_stats().live_objects, baseline);
}

#[test]
fn scopes_left_open_by_a_callback_are_unwound() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let baseline = ctx.heap_stats().live_objects;
    let scope = ctx.open_handle_scope().expect("scope should open");

    let leaky = NativeFunctionBoxed::from_closure(|cx, _info| {
        cx.open_handle_scope()?;
        cx.create_object()?;
        Ok(None)
    });
    let function = ctx
        .create_function("leaky", leaky, None)
        .expect("function should be created");
    let this = ctx.get_undefined().expect("undefined should be available");
    ctx.call_function(this, function, &[])
        .expect("call should succeed");

    assert_eq!(ctx.scope_depth(), 1);
    assert_eq!(ctx.heap_stats().live_objects, baseline + 1);
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn thrown_exception_surfaces_as_pending() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let fail = NativeFunctionBoxed::from_closure(|cx, _info| {
        let error = cx.create_string_utf8("boom")?;
        cx.throw(error)?;
        cx.create_object().map(Some)
    });
    let function = ctx
        .create_function("fail", fail, None)
        .expect("function should be created");
    let this = ctx.get_undefined().expect("undefined should be available");

    assert_eq!(
        ctx.call_function(this, function, &[]),
        Err(Status::PendingException)
    );
    assert!(ctx.is_exception_pending());
    assert_eq!(
        ctx.create_string_utf8("blocked"),
        Err(Status::PendingException),
        "calls with a pending exception fail fast"
    );

    let exception = ctx
        .get_and_clear_last_exception()
        .expect("exception should be taken");
    let mut buf = [0u8; 16];
    assert_eq!(ctx.get_value_string_utf8(exception, Some(&mut buf)), Ok(4));
    assert_eq!(&buf[..5], b"boom\0");
    assert!(!ctx.is_exception_pending());

    let cleared = ctx
        .get_and_clear_last_exception()
        .expect("nothing pending should read as undefined");
    assert_eq!(ctx.type_of(cleared), Ok(ValueType::Undefined));
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn callback_error_becomes_an_exception() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let picky = NativeFunctionBoxed::from_closure(|cx, info| {
        cx.get_value_double(info.arg(0))?;
        Ok(None)
    });
    let function = ctx
        .create_function("picky", picky, None)
        .expect("function should be created");
    let this = ctx.get_undefined().expect("undefined should be available");
    let text = ctx.create_string_utf8("nope").expect("string should be created");

    assert_eq!(
        ctx.call_function(this, function, &[text]),
        Err(Status::PendingException)
    );
    let error = ctx
        .get_and_clear_last_exception()
        .expect("exception should be taken");
    let message = ctx
        .get_named_property(error, "message")
        .expect("message should be readable");
    let mut buf = [0u8; 32];
    let written = ctx
        .get_value_string_utf8(message, Some(&mut buf))
        .expect("message should be a string");
    assert_eq!(&buf[..written], b"number expected");
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn function_data_is_passed_through() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");
    let hits = Rc::new(Cell::new(0u32));

    let bump = NativeFunctionBoxed::from_closure(|_cx, info| {
        let hits = info
            .data()
            .and_then(|data| data.downcast_ref::<Cell<u32>>())
            .ok_or(Status::InvalidArgument)?;
        hits.set(hits.get() + 1);
        Ok(None)
    });
    let data: HostData = Rc::clone(&hits) as HostData;
    let function = ctx
        .create_function("bump", bump, Some(data))
        .expect("function should be created");
    let this = ctx.get_undefined().expect("undefined should be available");
    for _ in 0..3 {
        ctx.call_function(this, function, &[])
            .expect("call should succeed");
    }
    assert_eq!(hits.get(), 3);
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn class_constructor_builds_instances() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let point = ClassBuilder::new("Point")
        .constructor(|cx, info| {
            assert!(info.new_target().is_some());
            let this = info.this();
            cx.set_named_property(this, "x", info.arg(0))?;
            cx.set_named_property(this, "y", info.arg(1))?;
            Ok(None)
        })
        .method("sum", |cx, info| {
            let this = info.this();
            let x = cx.get_named_property(this, "x")?;
            let y = cx.get_named_property(this, "y")?;
            let sum = cx.get_value_double(x)? + cx.get_value_double(y)?;
            cx.create_double(sum).map(Some)
        })
        .build()
        .expect("class definition should be complete");
    let class = ctx.define_class(point).expect("class should be defined");
    assert_eq!(ctx.type_of(class), Ok(ValueType::Function));

    let x = ctx.create_double(3.0).expect("x should be created");
    let y = ctx.create_double(4.0).expect("y should be created");
    let instance = ctx
        .new_instance(class, &[x, y])
        .expect("instance should be constructed");
    assert_eq!(ctx.type_of(instance), Ok(ValueType::Object));
    assert_eq!(ctx.instance_of(instance, class), Ok(true));

    let sum = ctx
        .get_named_property(instance, "sum")
        .expect("method should be inherited from the prototype");
    let result = ctx
        .call_function(instance, sum, &[])
        .expect("method call should succeed")
        .expect("sum returns a value");
    assert_eq!(ctx.get_value_double(result), Ok(7.0));

    let plain = ctx.create_object().expect("object should be created");
    assert_eq!(ctx.instance_of(plain, class), Ok(false));
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn constructor_returning_an_object_replaces_this() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let factory = ClassBuilder::new("Factory")
        .constructor(|cx, _info| cx.create_object().map(Some))
        .build()
        .expect("class definition should be complete");
    let class = ctx.define_class(factory).expect("class should be defined");
    let made = ctx
        .new_instance(class, &[])
        .expect("instance should be constructed");
    assert_eq!(ctx.instance_of(made, class), Ok(false));
    assert_eq!(ctx.refcount(made), Ok(Some(1)));
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn calling_a_class_without_new_throws() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");
    let constructed = Rc::new(Cell::new(false));

    let flag = Rc::clone(&constructed);
    let def = ClassBuilder::new("Strict")
        .constructor(move |_cx, _info| {
            flag.set(true);
            Ok(None)
        })
        .build()
        .expect("class definition should be complete");
    let class = ctx.define_class(def).expect("class should be defined");
    let this = ctx.get_undefined().expect("undefined should be available");

    assert_eq!(
        ctx.call_function(this, class, &[]),
        Err(Status::PendingException)
    );
    assert!(!constructed.get());
    ctx.get_and_clear_last_exception()
        .expect("exception should be taken");
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn class_prototype_cannot_be_replaced() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let def = ClassBuilder::new("Fixed")
        .constructor(|_cx, _info| Ok(None))
        .build()
        .expect("class definition should be complete");
    let class = ctx.define_class(def).expect("class should be defined");
    let replacement = ctx.create_object().expect("object should be created");
    ctx.set_named_property(class, "prototype", replacement)
        .expect("assignment to a read-only property is ignored");

    let instance = ctx
        .new_instance(class, &[])
        .expect("instance should be constructed");
    assert_eq!(ctx.instance_of(instance, class), Ok(true));
    assert_eq!(ctx.refcount(replacement), Ok(Some(1)));
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn classes_are_collected_once_unreachable() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let baseline = ctx.heap_stats().live_objects;

    let scope = ctx.open_handle_scope().expect("scope should open");
    let def = ClassBuilder::new("Temp")
        .constructor(|_cx, _info| Ok(None))
        .method("noop", |_cx, _info| Ok(None))
        .static_method("create", |_cx, _info| Ok(None))
        .build()
        .expect("class definition should be complete");
    let class = ctx.define_class(def).expect("class should be defined");
    ctx.new_instance(class, &[])
        .expect("instance should be constructed");
    ctx.close_handle_scope(scope).expect("scope should close");

    assert!(ctx.heap_stats().live_objects > baseline);
    ctx.collect_garbage();
    assert_eq!(ctx.heap_stats().live_objects, baseline);
}

#[test]
fn calling_a_non_function_is_rejected() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let this = ctx.get_undefined().expect("undefined should be available");
    let object = ctx.create_object().expect("object should be created");
    assert_eq!(
        ctx.call_function(this, object, &[]),
        Err(Status::FunctionExpected)
    );
    assert_eq!(ctx.new_instance(object, &[]), Err(Status::FunctionExpected));
    assert!(!ctx.is_exception_pending());
    ctx.close_handle_scope(scope).expect("scope should close");
}
