#![allow(missing_docs)]

//! Registry behavior: cyclic synthesis, registration precedence, proxies,
//! constructors, wire-name collisions, tolerant decoding.

use std::sync::Arc;
use wireform::formats::json_stream::{self, JsonStreamSink};
use wireform::{
    CustomCodec, Sink, Source, TypeDescriptorBuilder, TypeKey, Value, Wireform, WireformError,
};

fn to_json_text(engine: &Wireform, key: &TypeKey, value: &Value) -> wireform::Result<String> {
    let mut buffer = Vec::new();
    let mut sink = JsonStreamSink::new(&mut buffer);
    engine.encode_value(key, value, &mut sink)?;
    sink.finish()?;
    Ok(String::from_utf8(buffer).expect("utf8"))
}

fn json_roundtrip(
    engine: &Wireform,
    key: &TypeKey,
    value: &Value,
) -> wireform::Result<Value> {
    let text = to_json_text(engine, key, value)?;
    engine.decode_value(key, &mut json_stream::source(&text))
}

// --- TESTS ---

/// Self-recursive type: the first encode synthesises through a forwarding
/// reference without deadlock or unbounded recursion.
#[test]
fn self_recursive_type() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Node")
            .field("next", TypeKey::named("Node"))
            .field("v", TypeKey::int())
            .build(),
    );

    let chain = Value::object(
        "Node",
        vec![
            (
                "next".to_string(),
                Value::object(
                    "Node",
                    vec![
                        ("next".to_string(), Value::Null),
                        ("v".to_string(), Value::I32(2)),
                    ],
                ),
            ),
            ("v".to_string(), Value::I32(1)),
        ],
    );

    let decoded = json_roundtrip(&engine, &TypeKey::named("Node"), &chain)?;
    assert_eq!(decoded, chain);
    Ok(())
}

/// Mutually recursive types synthesise from either entry point.
#[test]
fn mutually_recursive_types() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("A")
            .field("b", TypeKey::named("B"))
            .build(),
    );
    engine.register_descriptor(
        TypeDescriptorBuilder::new("B")
            .field("a", TypeKey::named("A"))
            .build(),
    );

    let value = Value::object(
        "A",
        vec![(
            "b".to_string(),
            Value::object("B", vec![("a".to_string(), Value::Null)]),
        )],
    );
    let decoded = json_roundtrip(&engine, &TypeKey::named("A"), &value)?;
    assert_eq!(decoded, value);
    Ok(())
}

struct CommaPairCodec;

impl CustomCodec for CommaPairCodec {
    fn encode(
        &self,
        _engine: &Wireform,
        value: &Value,
        out: &mut dyn Sink,
    ) -> wireform::Result<()> {
        let x = value.field("x").and_then(Value::as_i32).ok_or_else(|| {
            WireformError::StructuralMismatch("Pair requires an int field 'x'".to_string())
        })?;
        let y = value.field("y").and_then(Value::as_i32).ok_or_else(|| {
            WireformError::StructuralMismatch("Pair requires an int field 'y'".to_string())
        })?;
        out.write_str(&format!("{x},{y}"))
    }

    fn decode(&self, _engine: &Wireform, input: &mut dyn Source) -> wireform::Result<Value> {
        let text = input.read_str()?;
        let (x, y) = text.split_once(',').ok_or_else(|| {
            WireformError::MalformedScalar(format!("'{text}' is not an x,y pair"))
        })?;
        let parse = |s: &str| {
            s.parse::<i32>().map_err(|_| {
                WireformError::MalformedScalar(format!("'{s}' is not an int"))
            })
        };
        Ok(Value::object(
            "Pair",
            vec![
                ("x".to_string(), Value::I32(parse(x)?)),
                ("y".to_string(), Value::I32(parse(y)?)),
            ],
        ))
    }
}

fn pair(x: i32, y: i32) -> Value {
    Value::object(
        "Pair",
        vec![
            ("x".to_string(), Value::I32(x)),
            ("y".to_string(), Value::I32(y)),
        ],
    )
}

/// An explicit codec registration wins over synthesis.
#[test]
fn custom_codec_overrides_synthesis() -> wireform::Result<()> {
    let engine = Wireform::new();
    // A descriptor exists, but the custom codec takes precedence.
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Pair")
            .field("x", TypeKey::int())
            .field("y", TypeKey::int())
            .build(),
    );
    engine.register_codec(TypeKey::named("Pair"), Arc::new(CommaPairCodec))?;

    let key = TypeKey::named("Pair");
    let text = to_json_text(&engine, &key, &pair(3, -4))?;
    assert_eq!(text, r#""3,-4""#);
    assert_eq!(
        engine.decode_value(&key, &mut json_stream::source(&text))?,
        pair(3, -4)
    );
    Ok(())
}

/// Registering the same codec twice does not invalidate a dependent codec
/// synthesised in between.
#[test]
fn idempotent_registration() -> wireform::Result<()> {
    let engine = Wireform::new();
    let codec: Arc<dyn CustomCodec> = Arc::new(CommaPairCodec);
    engine.register_codec(TypeKey::named("Pair"), codec.clone())?;

    // Synthesise a dependent codec between the two registrations.
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Wrapper")
            .field("p", TypeKey::named("Pair"))
            .build(),
    );
    let wrapper = Value::object("Wrapper", vec![("p".to_string(), pair(1, 2))]);
    let first = json_roundtrip(&engine, &TypeKey::named("Wrapper"), &wrapper)?;
    assert_eq!(first, wrapper);

    engine.register_codec(TypeKey::named("Pair"), codec)?;
    let second = json_roundtrip(&engine, &TypeKey::named("Wrapper"), &wrapper)?;
    assert_eq!(second, wrapper);
    Ok(())
}

/// A string proxy switches maps keyed on that type to the object schema,
/// while the two-field entry schema stays readable.
#[test]
fn string_proxy_map_keys() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_string_proxy(
        TypeKey::long(),
        |value| {
            value
                .as_i64()
                .map(|v| v.to_string())
                .ok_or_else(|| WireformError::StructuralMismatch("expected a long".to_string()))
        },
        |text| {
            text.parse::<i64>().map(Value::I64).map_err(|_| {
                WireformError::MalformedScalar(format!("'{text}' is not a long"))
            })
        },
    )?;

    let key = TypeKey::map(TypeKey::long(), TypeKey::string());
    let value = Value::Map(vec![
        (Value::I64(1), Value::Str("a".to_string())),
        (Value::I64(2), Value::Str("b".to_string())),
    ]);

    let text = to_json_text(&engine, &key, &value)?;
    assert_eq!(text, r#"{"1":"a","2":"b"}"#);
    assert_eq!(
        engine.decode_value(&key, &mut json_stream::source(&text))?,
        value
    );

    // Proxied keys still accept the entry schema.
    let entries = r#"[{"@key":"1","@value":"a"},{"@key":"2","@value":"b"}]"#;
    assert_eq!(
        engine.decode_value(&key, &mut json_stream::source(entries))?,
        value
    );
    Ok(())
}

/// Without a string proxy, non-string keys accept only the entry schema.
#[test]
fn entry_schema_is_mandatory_without_proxy() {
    let engine = Wireform::new();
    let key = TypeKey::map(TypeKey::long(), TypeKey::string());
    assert!(
        engine
            .decode_value(&key, &mut json_stream::source(r#"{"1":"a"}"#))
            .is_err()
    );
}

/// Type proxies reroute lookups once, at entry.
#[test]
fn type_proxy_rewrites_lookup() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Circle")
            .field("r", TypeKey::double())
            .build(),
    );
    engine.register_type_proxy(TypeKey::named("IShape"), TypeKey::named("Circle"))?;

    let circle = Value::object("Circle", vec![("r".to_string(), Value::F64(1.0))]);
    // Encoding under the interface name uses the concrete codec with no
    // envelope, because the proxied static type matches the value.
    let text = to_json_text(&engine, &TypeKey::named("IShape"), &circle)?;
    assert_eq!(text, r#"{"r":1.0}"#);
    assert_eq!(
        engine.decode_value(&TypeKey::named("IShape"), &mut json_stream::source(&text))?,
        circle
    );
    Ok(())
}

/// A registered constructor pre-populates decode accumulators.
#[test]
fn constructor_supplies_defaults() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Config")
            .field("host", TypeKey::string())
            .field("port", TypeKey::int())
            .build(),
    );
    engine.register_constructor(TypeKey::named("Config"), || {
        Value::object(
            "Config",
            vec![
                ("host".to_string(), Value::Str("localhost".to_string())),
                ("port".to_string(), Value::I32(8080)),
            ],
        )
    })?;

    // A wire form missing `port` keeps the constructor's default.
    let decoded = engine.decode_value(
        &TypeKey::named("Config"),
        &mut json_stream::source(r#"{"host":"example.com"}"#),
    )?;
    assert_eq!(
        decoded,
        Value::object(
            "Config",
            vec![
                ("host".to_string(), Value::Str("example.com".to_string())),
                ("port".to_string(), Value::I32(8080)),
            ],
        )
    );
    Ok(())
}

/// Duplicate declared names are starred on the wire and round-trip.
#[test]
fn field_name_collisions() -> wireform::Result<()> {
    let engine = Wireform::new();
    // Base-class field first, then the derived one with the same name.
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Sub")
            .field("x", TypeKey::int())
            .field("x", TypeKey::int())
            .build(),
    );
    let key = TypeKey::named("Sub");
    let value = Value::object(
        "Sub",
        vec![
            ("x".to_string(), Value::I32(1)),
            ("x".to_string(), Value::I32(2)),
        ],
    );

    let text = to_json_text(&engine, &key, &value)?;
    assert_eq!(text, r#"{"x":1,"*x":2}"#);
    assert_eq!(
        engine.decode_value(&key, &mut json_stream::source(&text))?,
        value
    );
    Ok(())
}

/// Skipping an unknown field between two known ones yields the same value
/// as decoding the form with that field removed.
#[test]
fn unknown_field_skip_equivalence() -> wireform::Result<()> {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Pairish")
            .field("a", TypeKey::int())
            .field("b", TypeKey::int())
            .build(),
    );
    let key = TypeKey::named("Pairish");

    let with_extra = r#"{"a":1,"zzz":{"nested":[1,2,{"deep":null}]},"b":2}"#;
    let without = r#"{"a":1,"b":2}"#;
    assert_eq!(
        engine.decode_value(&key, &mut json_stream::source(with_extra))?,
        engine.decode_value(&key, &mut json_stream::source(without))?
    );
    Ok(())
}

/// Error taxonomy spot checks.
#[test]
fn error_taxonomy() {
    let engine = Wireform::new();

    // char decode with a multi-character string
    assert!(matches!(
        engine.decode_value(&TypeKey::char(), &mut json_stream::source(r#""ab""#)),
        Err(WireformError::MalformedScalar(_))
    ));

    // scalar where an object was declared
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Solo")
            .field("v", TypeKey::int())
            .build(),
    );
    assert!(matches!(
        engine.decode_value(&TypeKey::named("Solo"), &mut json_stream::source("17")),
        Err(WireformError::MalformedInput(_))
    ));

    // unknown enum constant
    engine.register_descriptor(wireform::TypeDescriptor::enumeration(
        "Color",
        vec!["RED", "GREEN"],
    ));
    assert!(matches!(
        engine.decode_value(&TypeKey::named("Color"), &mut json_stream::source(r#""BLUE""#)),
        Err(WireformError::UnknownEnumConstant(_))
    ));

    // unregistered type
    assert!(matches!(
        engine.decode_value(&TypeKey::named("Ghost"), &mut json_stream::source("{}")),
        Err(WireformError::UnknownType(_))
    ));

    // a failed synthesis does not poison later lookups
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Ghost")
            .field("v", TypeKey::int())
            .build(),
    );
    assert!(
        engine
            .decode_value(&TypeKey::named("Ghost"), &mut json_stream::source(r#"{"v":3}"#))
            .is_ok()
    );
}

/// Encoding a value that lacks a declared field is a structural mismatch,
/// never silent data loss.
#[test]
fn missing_field_on_encode() {
    let engine = Wireform::new();
    engine.register_descriptor(
        TypeDescriptorBuilder::new("Two")
            .field("a", TypeKey::int())
            .field("b", TypeKey::int())
            .build(),
    );
    let incomplete = Value::object("Two", vec![("a".to_string(), Value::I32(1))]);
    assert!(matches!(
        to_json_text(&engine, &TypeKey::named("Two"), &incomplete),
        Err(WireformError::StructuralMismatch(_))
    ));
}
