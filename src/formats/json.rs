//! JSON document adapter.
//!
//! The sink assembles a [`serde_json::Value`] in memory; the source walks an
//! existing document into events up front. `serde_json` is built with
//! `preserve_order`, so object fields survive in insertion order; the
//! field-order guarantee depends on it.

use crate::adapter::{Event, EventSource, ListProducer, Sink};
use crate::error::{Result, WireformError};
use serde_json::{Map, Number};

enum Frame {
    Object {
        map: Map<String, serde_json::Value>,
        pending: Option<String>,
    },
    Array(Vec<serde_json::Value>),
}

/// Builds a JSON document from sink calls.
pub struct JsonSink {
    stack: Vec<Frame>,
    root: Option<serde_json::Value>,
}

impl JsonSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            root: None,
        }
    }

    /// The finished document.
    pub fn into_value(self) -> Result<serde_json::Value> {
        if !self.stack.is_empty() {
            return Err(WireformError::Internal(
                "unbalanced object or array in JSON sink".to_string(),
            ));
        }
        self.root.ok_or_else(|| {
            WireformError::Internal("no value was written to the JSON sink".to_string())
        })
    }

    fn attach(&mut self, value: serde_json::Value) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { map, pending }) => {
                let name = pending.take().ok_or_else(|| {
                    WireformError::Internal(
                        "value written into an object without a field name".to_string(),
                    )
                })?;
                map.insert(name, value);
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            None => {
                if self.root.is_some() {
                    return Err(WireformError::Internal(
                        "more than one root value written".to_string(),
                    ));
                }
                self.root = Some(value);
                Ok(())
            }
        }
    }

    fn number(&mut self, v: f64) -> Result<()> {
        let number = Number::from_f64(v).ok_or_else(|| {
            WireformError::MalformedScalar(format!(
                "{v} is not representable in JSON"
            ))
        })?;
        self.attach(serde_json::Value::Number(number))
    }
}

impl Default for JsonSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for JsonSink {
    fn write_null(&mut self) -> Result<()> {
        self.attach(serde_json::Value::Null)
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.attach(serde_json::Value::Bool(v))
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.attach(serde_json::Value::Number(Number::from(v)))
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.attach(serde_json::Value::Number(Number::from(v)))
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.attach(serde_json::Value::Number(Number::from(v)))
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.attach(serde_json::Value::Number(Number::from(v)))
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.number(f64::from(v))
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.number(v)
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        self.attach(serde_json::Value::String(v.to_string()))
    }

    fn start_object(&mut self) -> Result<()> {
        self.stack.push(Frame::Object {
            map: Map::new(),
            pending: None,
        });
        Ok(())
    }

    fn field(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { pending, .. }) => {
                *pending = Some(name.to_string());
                Ok(())
            }
            _ => Err(WireformError::Internal(
                "field name written outside an object".to_string(),
            )),
        }
    }

    fn end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Object { map, .. }) => self.attach(serde_json::Value::Object(map)),
            _ => Err(WireformError::Internal(
                "object closed without a matching open".to_string(),
            )),
        }
    }

    fn start_array(&mut self) -> Result<()> {
        self.stack.push(Frame::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array(items)) => self.attach(serde_json::Value::Array(items)),
            _ => Err(WireformError::Internal(
                "array closed without a matching open".to_string(),
            )),
        }
    }
}

/// Event source over an existing JSON document.
pub type JsonSource = EventSource<ListProducer>;

/// Walk a document into an event source.
pub fn source(document: &serde_json::Value) -> JsonSource {
    let mut events = Vec::new();
    push_events(document, &mut events);
    EventSource::new(ListProducer::new(events))
}

fn push_events(value: &serde_json::Value, out: &mut Vec<Event>) {
    match value {
        serde_json::Value::Null => out.push(Event::Null),
        serde_json::Value::Bool(v) => out.push(Event::Bool(*v)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => out.push(Event::Int(i)),
            None => out.push(Event::Float(n.as_f64().unwrap_or(f64::NAN))),
        },
        serde_json::Value::String(s) => out.push(Event::Str(s.clone())),
        serde_json::Value::Array(items) => {
            out.push(Event::StartArray);
            for item in items {
                push_events(item, out);
            }
            out.push(Event::EndArray);
        }
        serde_json::Value::Object(map) => {
            out.push(Event::StartObject);
            for (name, item) in map {
                out.push(Event::Field(name.clone()));
                push_events(item, out);
            }
            out.push(Event::EndObject);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Source;

    #[test]
    fn sink_builds_nested_document() -> Result<()> {
        let mut sink = JsonSink::new();
        sink.start_object()?;
        sink.field("a")?;
        sink.write_i32(1)?;
        sink.field("b")?;
        sink.start_array()?;
        sink.write_str("x")?;
        sink.write_null()?;
        sink.end_array()?;
        sink.end_object()?;
        let value = sink.into_value()?;
        assert_eq!(value, serde_json::json!({"a": 1, "b": ["x", null]}));
        Ok(())
    }

    #[test]
    fn sink_rejects_non_finite_floats() {
        let mut sink = JsonSink::new();
        assert!(matches!(
            sink.write_f64(f64::NAN),
            Err(WireformError::MalformedScalar(_))
        ));
    }

    #[test]
    fn source_preserves_field_order() -> Result<()> {
        let document = serde_json::json!({"z": 1, "a": 2});
        let mut src = source(&document);
        src.start_object()?;
        assert_eq!(src.read_field_name()?, "z");
        src.skip_node()?;
        assert_eq!(src.read_field_name()?, "a");
        Ok(())
    }
}
