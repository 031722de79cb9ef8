#![allow(missing_docs)]

use wireform::{Config, Wireform, WireformObject};

#[derive(WireformObject, PartialEq, Debug, Clone)]
struct SensorReading {
    sensor: String,
    celsius: f64,
    samples: Vec<i32>,
    note: Option<String>,
}

fn reading() -> SensorReading {
    SensorReading {
        sensor: "bay-3".to_string(),
        celsius: 21.5,
        samples: vec![20, 21, 22],
        note: None,
    }
}

// --- TESTS ---

/// Primitive wire form
/// Validate that `encode(int, 42)` is exactly `42` against the JSON adapter.
#[test]
fn test_primitive_wire_form() -> wireform::Result<()> {
    let engine = Wireform::new();
    assert_eq!(engine.to_json_string(&42i32)?, "42");
    assert_eq!(engine.from_json_str::<i32>("42")?, 42);
    Ok(())
}

/// One value, every adapter
/// Validate the typed façade across all five wire formats.
#[test]
fn test_all_formats_roundtrip() -> wireform::Result<()> {
    let engine = Wireform::new();
    let value = reading();

    let document = engine.to_json(&value)?;
    assert_eq!(engine.from_json::<SensorReading>(&document)?, value);

    let text = engine.to_json_string(&value)?;
    assert_eq!(engine.from_json_str::<SensorReading>(&text)?, value);

    let xml = engine.to_xml_string(&value, "reading")?;
    assert_eq!(engine.from_xml_str::<SensorReading>(&xml)?, value);

    let packed = engine.to_bytes(&value)?;
    assert_eq!(engine.from_bytes::<SensorReading>(&packed)?, value);

    let msgpack = engine.to_msgpack(&value)?;
    assert_eq!(engine.from_msgpack::<SensorReading>(&msgpack)?, value);

    Ok(())
}

/// JSON text shape
/// Validate field order and null representation in the stream writer.
#[test]
fn test_json_text_shape() -> wireform::Result<()> {
    let engine = Wireform::new();
    let text = engine.to_json_string(&reading())?;
    assert_eq!(
        text,
        r#"{"sensor":"bay-3","celsius":21.5,"samples":[20,21,22],"note":null}"#
    );
    Ok(())
}

/// Writer/reader streaming entry points
/// Validate `write_json` / `read_json` over in-memory buffers.
#[test]
fn test_stream_io() -> wireform::Result<()> {
    let engine = Wireform::new();
    let value = reading();

    let mut buffer = Vec::new();
    engine.write_json(&value, &mut buffer)?;
    assert!(!buffer.is_empty());

    let loaded: SensorReading = engine.read_json(buffer.as_slice())?;
    assert_eq!(loaded, value);
    Ok(())
}

/// File round trip
/// Validate `save_json` / `load_json`.
#[test]
fn test_file_io() -> wireform::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reading.json");
    let engine = Wireform::new();
    let value = reading();

    engine.save_json(&path, &value)?;
    let loaded: SensorReading = engine.load_json(&path)?;

    assert_eq!(loaded, value);
    Ok(())
}

/// XML root element naming
#[test]
fn test_xml_root_name() -> wireform::Result<()> {
    let engine = Wireform::new();
    let xml = engine.to_xml_string(&reading(), "reading")?;
    assert!(xml.starts_with("<reading>"));
    assert!(xml.ends_with("</reading>"));
    Ok(())
}

/// Strict unknown-field mode
/// Validate `fail_on_unknown_fields` flips skipping into failure.
#[test]
fn test_strict_unknown_fields() -> wireform::Result<()> {
    let tolerant = Wireform::new();
    let strict = Wireform::with_config(Config::new().with_fail_on_unknown_fields(true));

    let text =
        r#"{"sensor":"a","celsius":1.0,"extra":{"deep":[1,2]},"samples":[],"note":null}"#;

    let loaded: SensorReading = tolerant.from_json_str(text)?;
    assert_eq!(loaded.sensor, "a");

    assert!(matches!(
        strict.from_json_str::<SensorReading>(text),
        Err(wireform::WireformError::MalformedInput(_))
    ));
    Ok(())
}

/// Independent engines
/// Validate that configuration is per instance, not process-wide.
#[test]
fn test_engines_are_independent() -> wireform::Result<()> {
    let plain = Wireform::new();
    let custom = Wireform::with_config(
        Config::new()
            .with_type_field("!t")
            .with_value_field("!v"),
    );

    #[derive(WireformObject, PartialEq, Debug)]
    struct Holder {
        value: wireform::Value,
    }

    let holder = Holder {
        value: wireform::Value::Str("hi".to_string()),
    };

    assert_eq!(
        plain.to_json_string(&holder)?,
        r#"{"value":{"@type":"string","@value":"hi"}}"#
    );
    assert_eq!(
        custom.to_json_string(&holder)?,
        r#"{"value":{"!t":"string","!v":"hi"}}"#
    );

    let back: Holder = custom.from_json_str(r#"{"value":{"!t":"string","!v":"hi"}}"#)?;
    assert_eq!(back, holder);
    Ok(())
}
