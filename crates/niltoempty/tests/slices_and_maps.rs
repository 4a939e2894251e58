#![cfg(feature = "json")]
use niltoempty::{Key, Record, Type, Value, normalize, to_json_string};

fn nil_any_map() -> Value {
    Value::nil_map(Type::String, Type::Any)
}

fn t_record() -> Value {
    Value::from(
        Record::new("T")
            .field("m", nil_any_map())
            .field("s", Value::nil_slice(Type::Any)),
    )
}

#[test]
fn slice_as_root() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::nil_slice(Type::Any));
    assert_eq!(to_json_string(normalize(&mut v))?, "[]");
    Ok(())
}

#[test]
fn slice_and_map_in_record() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(t_record());
    assert_eq!(to_json_string(&v)?, r#"{"m":null,"s":null}"#);
    assert_eq!(to_json_string(normalize(&mut v))?, r#"{"m":{},"s":[]}"#);
    Ok(())
}

#[test]
fn slice_in_slice() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::slice(
        Type::slice(Type::Any),
        vec![Value::nil_slice(Type::Any); 3],
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, "[[],[],[]]");
    Ok(())
}

#[test]
fn slice_in_map() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::map(
        Type::String,
        Type::slice(Type::Any),
        [
            ("a", Value::nil_slice(Type::Any)),
            ("b", Value::nil_slice(Type::Any)),
        ],
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, r#"{"a":[],"b":[]}"#);
    Ok(())
}

#[test]
fn slice_in_array() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::array(
        Type::slice(Type::Any),
        vec![Value::nil_slice(Type::Any); 2],
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, "[[],[]]");
    Ok(())
}

#[test]
fn map_as_root() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::nil_map(Type::String, Type::String));
    assert_eq!(to_json_string(normalize(&mut v))?, "{}");
    Ok(())
}

#[test]
fn map_in_slice() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::slice(
        Type::map(Type::String, Type::Any),
        vec![nil_any_map(); 3],
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, "[{},{},{}]");
    Ok(())
}

#[test]
fn map_in_map() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::map(
        Type::String,
        Type::map(Type::String, Type::Any),
        [("a", nil_any_map()), ("b", nil_any_map())],
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, r#"{"a":{},"b":{}}"#);
    Ok(())
}

#[test]
fn map_in_array() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::array(
        Type::map(Type::String, Type::Any),
        vec![nil_any_map(); 2],
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, "[{},{}]");
    Ok(())
}

#[test]
fn map_values_keep_their_keys() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::map(
        Type::Int,
        Type::slice(Type::String),
        [
            (3, Value::nil_slice(Type::String)),
            (-1, Value::nil_slice(Type::String)),
            (10, Value::nil_slice(Type::String)),
        ],
    ));
    normalize(&mut v);

    let target = v.as_ptr().and_then(|p| p.target()).ok_or("nil root")?;
    let map = target.borrow().as_map().cloned().ok_or("not a map")?;
    let entries = map.entries().ok_or("nil map")?.borrow();
    let keys: Vec<&Key> = entries.keys().collect();
    assert_eq!(keys, [&Key::Int(-1), &Key::Int(3), &Key::Int(10)]);
    for value in entries.values() {
        let slice = value.as_slice().ok_or("not a slice")?;
        assert!(!slice.is_nil());
        assert!(slice.is_empty());
        assert_eq!(slice.elem(), &Type::String);
    }
    Ok(())
}

#[test]
fn mixed_nested_slices() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::slice(
        Type::Any,
        vec![
            Value::untyped_nil(),
            Value::dynamic(Value::nil_slice(Type::Any)),
            Value::dynamic(nil_any_map()),
            Value::dynamic(Value::array(
                Type::slice(Type::Any),
                vec![
                    Value::nil_slice(Type::Any),
                    Value::slice(
                        Type::Any,
                        vec![
                            Value::dynamic(Value::slice(Type::String, vec![Value::from("a")])),
                            Value::dynamic(Value::nil_slice(Type::Any)),
                            Value::dynamic(nil_any_map()),
                        ],
                    ),
                ],
            )),
        ],
    ));
    assert_eq!(
        to_json_string(&v)?,
        r#"[null,null,null,[null,[["a"],null,null]]]"#
    );
    assert_eq!(
        to_json_string(normalize(&mut v))?,
        r#"[null,[],{},[[],[["a"],[],{}]]]"#
    );
    Ok(())
}

#[test]
fn untyped_nil_map_values_are_preserved() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::map(
        Type::String,
        Type::Any,
        [
            ("valid", Value::dynamic(Value::slice(Type::String, vec![]))),
            ("nil", Value::untyped_nil()),
        ],
    ));
    normalize(&mut v);

    let target = v.as_ptr().and_then(|p| p.target()).ok_or("nil root")?;
    let map = target.borrow().as_map().cloned().ok_or("not a map")?;
    assert!(map.contains_key("nil"));
    assert!(map.get("nil").ok_or("missing")?.is_untyped_nil());
    assert!(!map.get("valid").ok_or("missing")?.is_nil());
    assert_eq!(to_json_string(&v)?, r#"{"nil":null,"valid":[]}"#);
    Ok(())
}

#[test]
fn mixed_nil_map_values() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::map(
        Type::String,
        Type::Any,
        [
            ("untyped_nil", Value::untyped_nil()),
            ("nil_slice", Value::dynamic(Value::nil_slice(Type::Int))),
            ("nil_map", Value::dynamic(Value::nil_map(Type::String, Type::Int))),
            ("nil_ptr", Value::dynamic(Value::nil_ptr(Type::String))),
        ],
    ));
    normalize(&mut v);

    let target = v.as_ptr().and_then(|p| p.target()).ok_or("nil root")?;
    let map = target.borrow().as_map().cloned().ok_or("not a map")?;

    assert!(map.get("untyped_nil").ok_or("missing")?.is_untyped_nil());

    let nil_slice = map.get("nil_slice").ok_or("missing")?;
    let slice = nil_slice.as_dynamic().and_then(Value::as_slice).ok_or("not a slice")?;
    assert!(!slice.is_nil());
    assert!(slice.is_empty());

    let nil_map = map.get("nil_map").ok_or("missing")?;
    let inner = nil_map.as_dynamic().and_then(Value::as_map).ok_or("not a map")?;
    assert!(!inner.is_nil());
    assert!(inner.is_empty());

    let nil_ptr = map.get("nil_ptr").ok_or("missing")?;
    assert!(nil_ptr.as_dynamic().ok_or("untyped")?.is_nil());
    assert_eq!(nil_ptr.concrete_type(), Some(Type::ptr(Type::String)));
    Ok(())
}

#[test]
fn empty_slices_and_maps_stay_empty() -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::ptr(Value::from(
        Record::new("Event")
            .field("items", Value::slice(Type::ptr(Type::named("Item")), vec![]))
            .field("meta", Value::map(Type::String, Type::Any, Vec::<(String, Value)>::new())),
    ));
    assert_eq!(to_json_string(normalize(&mut v))?, r#"{"items":[],"meta":{}}"#);
    Ok(())
}
