use napibridge::{Engine, Status, ValueType};

#[test]
fn singletons_and_primitives() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let undefined = ctx.get_undefined().expect("undefined should be available");
    let null = ctx.get_null().expect("null should be available");
    let truthy = ctx.get_boolean(true).expect("boolean should be available");
    let global = ctx.get_global().expect("global should be available");
    assert_eq!(ctx.type_of(undefined), Ok(ValueType::Undefined));
    assert_eq!(ctx.type_of(null), Ok(ValueType::Null));
    assert_eq!(ctx.type_of(truthy), Ok(ValueType::Boolean));
    assert_eq!(ctx.type_of(global), Ok(ValueType::Object));
    assert_eq!(ctx.get_value_bool(truthy), Ok(true));
    assert_eq!(ctx.get_value_bool(null), Err(Status::BooleanExpected));
    assert_eq!(ctx.refcount(undefined), Ok(None));

    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn numeric_readers() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let negative = ctx.create_int32(-7).expect("int32 should be created");
    let large = ctx.create_uint32(u32::MAX).expect("uint32 should be created");
    let wide = ctx.create_int64(1 << 40).expect("int64 should be created");
    let fraction = ctx.create_double(2.75).expect("double should be created");
    let nan = ctx.create_double(f64::NAN).expect("NaN should be created");

    assert_eq!(ctx.get_value_int32(negative), Ok(-7));
    assert_eq!(ctx.get_value_uint32(large), Ok(u32::MAX));
    assert_eq!(ctx.get_value_int64(wide), Ok(1 << 40));
    assert_eq!(ctx.get_value_int32(fraction), Ok(2));
    assert_eq!(ctx.get_value_int32(nan), Ok(0));
    assert_eq!(ctx.get_value_double(fraction), Ok(2.75));

    let text = ctx.create_string_utf8("12").expect("string should be created");
    assert_eq!(ctx.get_value_double(text), Err(Status::NumberExpected));
    assert_eq!(ctx.get_value_int64(text), Err(Status::NumberExpected));

    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn string_reader_truncates_on_character_boundaries() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");
    let text = ctx.create_string_utf8("naïve").expect("string should be created");

    assert_eq!(ctx.get_value_string_utf8(text, None), Ok(6));

    let mut exact = [0xffu8; 7];
    assert_eq!(ctx.get_value_string_utf8(text, Some(&mut exact)), Ok(6));
    assert_eq!(&exact, "naïve\0".as_bytes());

    let mut short = [0xffu8; 4];
    assert_eq!(ctx.get_value_string_utf8(text, Some(&mut short)), Ok(2));
    assert_eq!(&short[..3], b"na\0");

    let mut empty: [u8; 0] = [];
    assert_eq!(ctx.get_value_string_utf8(text, Some(&mut empty)), Ok(0));

    let number = ctx.create_double(1.0).expect("number should be created");
    assert_eq!(
        ctx.get_value_string_utf8(number, None),
        Err(Status::StringExpected)
    );
    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn coercions_follow_script_rules() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let scope = ctx.open_handle_scope().expect("scope should open");

    let empty = ctx.create_string_utf8("").expect("string should be created");
    let as_bool = ctx.coerce_to_bool(empty).expect("coercion should succeed");
    assert_eq!(ctx.get_value_bool(as_bool), Ok(false));

    let object = ctx.create_object().expect("object should be created");
    let as_bool = ctx.coerce_to_bool(object).expect("coercion should succeed");
    assert_eq!(ctx.get_value_bool(as_bool), Ok(true));

    let hex = ctx.create_string_utf8(" 0x1f ").expect("string should be created");
    let as_number = ctx.coerce_to_number(hex).expect("coercion should succeed");
    assert_eq!(ctx.get_value_double(as_number), Ok(31.0));

    let whole = ctx.create_double(42.0).expect("number should be created");
    let as_string = ctx.coerce_to_string(whole).expect("coercion should succeed");
    let mut buf = [0u8; 8];
    let written = ctx
        .get_value_string_utf8(as_string, Some(&mut buf))
        .expect("coerced value should be a string");
    assert_eq!(&buf[..written], b"42");

    let as_string = ctx.coerce_to_string(object).expect("coercion should succeed");
    let mut buf = [0u8; 32];
    let written = ctx
        .get_value_string_utf8(as_string, Some(&mut buf))
        .expect("coerced value should be a string");
    assert_eq!(&buf[..written], b"[object Object]");

    ctx.close_handle_scope(scope).expect("scope should close");
}

#[test]
fn property_access() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");
    let baseline = ctx.heap_stats().live_objects;
    let scope = ctx.open_handle_scope().expect("scope should open");

    let object = ctx.create_object().expect("object should be created");
    let child = ctx.create_object().expect("child should be created");
    let key = ctx.create_string_utf8("child").expect("key should be created");
    ctx.set_property(object, key, child)
        .expect("property should be set");
    assert_eq!(ctx.refcount(child), Ok(Some(2)));
    assert_eq!(ctx.has_property(object, key), Ok(true));

    let read = ctx.get_property(object, key).expect("property should be read");
    assert_eq!(ctx.refcount(read), Ok(Some(3)));

    let index = ctx.create_int32(3).expect("numeric key should be created");
    let value = ctx.get_boolean(false).expect("value should be created");
    ctx.set_property(object, index, value)
        .expect("numeric key should be coerced");
    assert_eq!(
        ctx.property_names(object),
        Ok(vec!["child".to_string(), "3".to_string()])
    );

    assert_eq!(ctx.delete_property(object, key), Ok(true));
    assert_eq!(ctx.has_property(object, key), Ok(false));
    assert_eq!(ctx.refcount(child), Ok(Some(2)));
    let missing = ctx.get_property(object, key).expect("missing key should read");
    assert_eq!(ctx.type_of(missing), Ok(ValueType::Undefined));

    let number = ctx.create_double(1.0).expect("number should be created");
    assert_eq!(
        ctx.set_property(number, key, value),
        Err(Status::ObjectExpected)
    );

    ctx.close_handle_scope(scope).expect("scope should close");
    assert_eq!(ctx.heap_stats().live_objects, baseline);
}

#[test]
fn global_object_is_shared_across_calls() {
    let engine = Engine::new();
    let mut ctx = engine.new_context().expect("context should be created");

    let scope = ctx.open_handle_scope().expect("scope should open");
    let global = ctx.get_global().expect("global should be available");
    let answer = ctx.create_double(42.0).expect("number should be created");
    ctx.set_named_property(global, "answer", answer)
        .expect("global property should be set");
    ctx.close_handle_scope(scope).expect("scope should close");

    let scope = ctx.open_handle_scope().expect("scope should reopen");
    let global = ctx.get_global().expect("global should be available");
    let read = ctx
        .get_named_property(global, "answer")
        .expect("global property should be read");
    assert_eq!(ctx.get_value_double(read), Ok(42.0));
    ctx.close_handle_scope(scope).expect("scope should close");
}
