#![allow(missing_docs)]

//! The round-trip law, exercised at the value level against every adapter:
//! `decode(T, encode(T, v)) == v` for each supported value shape.

use wireform::formats::{bytes, json, json_stream, msgpack, xml};
use wireform::formats::bytes::BytesSink;
use wireform::formats::json::JsonSink;
use wireform::formats::json_stream::JsonStreamSink;
use wireform::formats::msgpack::MsgPackSink;
use wireform::formats::xml::XmlSink;
use wireform::{TypeDescriptorBuilder, TypeKey, Value, Wireform};

/// Encode and decode `value` under `key` through every adapter, asserting
/// value equality each time.
fn roundtrip_all(engine: &Wireform, key: &TypeKey, value: &Value) -> wireform::Result<()> {
    // JSON document
    let mut sink = JsonSink::new();
    engine.encode_value(key, value, &mut sink)?;
    let document = sink.into_value()?;
    let decoded = engine.decode_value(key, &mut json::source(&document))?;
    assert_eq!(&decoded, value, "JSON document adapter, key {key}");

    // JSON event stream
    let mut buffer = Vec::new();
    let mut sink = JsonStreamSink::new(&mut buffer);
    engine.encode_value(key, value, &mut sink)?;
    sink.finish()?;
    let text = String::from_utf8(buffer).expect("JSON writer emits UTF-8");
    let decoded = engine.decode_value(key, &mut json_stream::source(&text))?;
    assert_eq!(&decoded, value, "JSON stream adapter, key {key}, wire {text}");

    // XML
    let mut sink = XmlSink::new("root");
    engine.encode_value(key, value, &mut sink)?;
    let text = sink.finish()?;
    let decoded = engine.decode_value(key, &mut xml::source(&text)?)?;
    assert_eq!(&decoded, value, "XML adapter, key {key}, wire {text}");

    // Tagged binary
    let mut sink = BytesSink::new();
    engine.encode_value(key, value, &mut sink)?;
    let data = sink.into_vec();
    let decoded = engine.decode_value(key, &mut bytes::source(&data))?;
    assert_eq!(&decoded, value, "bytes adapter, key {key}");

    // MessagePack
    let mut sink = MsgPackSink::new();
    engine.encode_value(key, value, &mut sink)?;
    let data = sink.into_vec()?;
    let decoded = engine.decode_value(key, &mut msgpack::source(&data)?)?;
    assert_eq!(&decoded, value, "MessagePack adapter, key {key}");

    Ok(())
}

// --- TESTS ---

#[test]
fn primitives() -> wireform::Result<()> {
    let engine = Wireform::new();
    roundtrip_all(&engine, &TypeKey::boolean(), &Value::Bool(true))?;
    roundtrip_all(&engine, &TypeKey::byte(), &Value::I8(-12))?;
    roundtrip_all(&engine, &TypeKey::short(), &Value::I16(-3000))?;
    roundtrip_all(&engine, &TypeKey::int(), &Value::I32(1_000_000))?;
    roundtrip_all(&engine, &TypeKey::long(), &Value::I64(i64::MIN))?;
    roundtrip_all(&engine, &TypeKey::float(), &Value::F32(0.25))?;
    roundtrip_all(&engine, &TypeKey::double(), &Value::F64(-1.5e300))?;
    roundtrip_all(&engine, &TypeKey::char(), &Value::Char('λ'))?;
    Ok(())
}

#[test]
fn strings() -> wireform::Result<()> {
    let engine = Wireform::new();
    roundtrip_all(&engine, &TypeKey::string(), &Value::Str(String::new()))?;
    roundtrip_all(
        &engine,
        &TypeKey::string(),
        &Value::Str("plain ascii".to_string()),
    )?;
    roundtrip_all(
        &engine,
        &TypeKey::string(),
        &Value::Str("escapes \" \\ \n \t and unicode ⊕λ".to_string()),
    )?;
    roundtrip_all(&engine, &TypeKey::string(), &Value::Null)?;
    Ok(())
}

#[test]
fn optionals() -> wireform::Result<()> {
    let engine = Wireform::new();
    let key = TypeKey::optional(TypeKey::int());
    roundtrip_all(&engine, &key, &Value::I32(9))?;
    roundtrip_all(&engine, &key, &Value::Null)?;
    Ok(())
}

#[test]
fn arrays_and_lists() -> wireform::Result<()> {
    let engine = Wireform::new();
    roundtrip_all(
        &engine,
        &TypeKey::array(TypeKey::int()),
        &Value::Array(vec![Value::I32(1), Value::I32(2), Value::I32(3)]),
    )?;
    roundtrip_all(
        &engine,
        &TypeKey::list(TypeKey::string()),
        &Value::Array(vec![
            Value::Str("a".to_string()),
            Value::Null,
            Value::Str("c".to_string()),
        ]),
    )?;
    roundtrip_all(&engine, &TypeKey::list(TypeKey::boolean()), &Value::Array(vec![]))?;
    // Nested lists
    roundtrip_all(
        &engine,
        &TypeKey::list(TypeKey::list(TypeKey::int())),
        &Value::Array(vec![
            Value::Array(vec![Value::I32(1)]),
            Value::Array(vec![]),
        ]),
    )?;
    Ok(())
}

#[test]
fn string_keyed_maps() -> wireform::Result<()> {
    let engine = Wireform::new();
    let key = TypeKey::map(TypeKey::string(), TypeKey::int());
    roundtrip_all(
        &engine,
        &key,
        &Value::Map(vec![
            (Value::Str("zebra".to_string()), Value::I32(1)),
            (Value::Str("aardvark".to_string()), Value::I32(2)),
        ]),
    )?;
    roundtrip_all(&engine, &key, &Value::Map(vec![]))?;
    Ok(())
}

#[test]
fn non_string_keyed_maps() -> wireform::Result<()> {
    let engine = Wireform::new();
    let key = TypeKey::map(TypeKey::int(), TypeKey::string());
    roundtrip_all(
        &engine,
        &key,
        &Value::Map(vec![
            (Value::I32(1), Value::Str("a".to_string())),
            (Value::I32(2), Value::Str("b".to_string())),
        ]),
    )?;
    Ok(())
}

#[test]
fn enums() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        wireform::TypeDescriptor::enumeration("Color", vec!["RED", "GREEN", "BLUE"]),
    );
    roundtrip_all(
        &engine,
        &TypeKey::named("Color"),
        &Value::enumeration("Color", "GREEN"),
    )?;
    roundtrip_all(&engine, &TypeKey::named("Color"), &Value::Null)?;
    Ok(())
}

#[test]
fn objects() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Inner")
            .field("label", TypeKey::string())
            .build(),
    );
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Outer")
            .field("inner", TypeKey::named("Inner"))
            .field("count", TypeKey::int())
            .field("tags", TypeKey::list(TypeKey::string()))
            .build(),
    );

    let value = Value::object(
        "Outer",
        vec![
            (
                "inner".to_string(),
                Value::object(
                    "Inner",
                    vec![("label".to_string(), Value::Str("x".to_string()))],
                ),
            ),
            ("count".to_string(), Value::I32(3)),
            (
                "tags".to_string(),
                Value::Array(vec![Value::Str("t1".to_string())]),
            ),
        ],
    );
    roundtrip_all(&engine, &TypeKey::named("Outer"), &value)?;

    // Null nested object
    let value = Value::object(
        "Outer",
        vec![
            ("inner".to_string(), Value::Null),
            ("count".to_string(), Value::I32(0)),
            ("tags".to_string(), Value::Array(vec![])),
        ],
    );
    roundtrip_all(&engine, &TypeKey::named("Outer"), &value)?;
    Ok(())
}

#[test]
fn field_order_is_stable() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Ordered")
            .field("f1", TypeKey::int())
            .field("f2", TypeKey::int())
            .field("f3", TypeKey::int())
            .build(),
    );
    let value = Value::object(
        "Ordered",
        vec![
            ("f1".to_string(), Value::I32(1)),
            ("f2".to_string(), Value::I32(2)),
            ("f3".to_string(), Value::I32(3)),
        ],
    );

    let mut first = None;
    for _ in 0..3 {
        let mut buffer = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buffer);
        engine.encode_value(&TypeKey::named("Ordered"), &value, &mut sink)?;
        sink.finish()?;
        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(text, r#"{"f1":1,"f2":2,"f3":3}"#);
        if let Some(previous) = first.replace(text.clone()) {
            assert_eq!(previous, text);
        }
    }
    Ok(())
}

#[test]
fn map_entry_wire_form() -> wireform::Result<()> {
    let engine = Wireform::new();
    let key = TypeKey::map(TypeKey::int(), TypeKey::string());
    let value = Value::Map(vec![
        (Value::I32(1), Value::Str("a".to_string())),
        (Value::I32(2), Value::Str("b".to_string())),
    ]);

    let mut buffer = Vec::new();
    let mut sink = JsonStreamSink::new(&mut buffer);
    engine.encode_value(&key, &value, &mut sink)?;
    sink.finish()?;
    let text = String::from_utf8(buffer).expect("utf8");
    assert_eq!(
        text,
        r#"[{"@key":1,"@value":"a"},{"@key":2,"@value":"b"}]"#
    );

    // Entry fields are accepted in either order.
    let reordered = r#"[{"@value":"a","@key":1},{"@key":2,"@value":"b"}]"#;
    let decoded = engine.decode_value(&key, &mut json_stream::source(reordered))?;
    assert_eq!(decoded, value);
    Ok(())
}

#[test]
fn non_finite_floats_fail_in_text_formats() -> wireform::Result<()> {
    let engine = Wireform::new();

    let mut sink = JsonSink::new();
    assert!(matches!(
        engine.encode_value(&TypeKey::double(), &Value::F64(f64::INFINITY), &mut sink),
        Err(wireform::WireformError::MalformedScalar(_))
    ));

    // The binary adapters carry them bit-exact.
    let mut sink = BytesSink::new();
    engine.encode_value(&TypeKey::double(), &Value::F64(f64::INFINITY), &mut sink)?;
    let decoded = engine.decode_value(&TypeKey::double(), &mut bytes::source(&sink.into_vec()))?;
    assert_eq!(decoded, Value::F64(f64::INFINITY));
    Ok(())
}
