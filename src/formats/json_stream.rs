//! JSON event-stream adapter.
//!
//! The sink writes JSON text incrementally with a small separator state
//! machine; the source is a pull tokenizer over the input text. String
//! escaping in both directions is delegated to `serde_json`: the tokenizer
//! finds the quoted slice and `serde_json` decodes it.

use crate::adapter::{Event, EventProducer, EventSource, Sink};
use crate::error::{Result, WireformError};
use std::io;

#[derive(Clone, Copy, PartialEq)]
enum Container {
    Object,
    Array,
}

struct Frame {
    container: Container,
    count: usize,
}

/// Writes JSON text onto an [`io::Write`].
pub struct JsonStreamSink<W> {
    writer: W,
    stack: Vec<Frame>,
}

impl<W: io::Write> JsonStreamSink<W> {
    /// A sink writing onto `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            stack: Vec::new(),
        }
    }

    /// Check balance and flush the writer.
    pub fn finish(mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(WireformError::Internal(
                "unbalanced object or array in JSON writer".to_string(),
            ));
        }
        self.writer.flush()?;
        Ok(())
    }

    fn before_value(&mut self) -> Result<()> {
        if let Some(frame) = self.stack.last_mut()
            && frame.container == Container::Array
        {
            if frame.count > 0 {
                self.writer.write_all(b",")?;
            }
            frame.count += 1;
        }
        Ok(())
    }

    fn quoted(&mut self, text: &str) -> Result<()> {
        serde_json::to_writer(&mut self.writer, text)
            .map_err(|e| WireformError::Io(std::sync::Arc::new(io::Error::other(e))))
    }
}

impl<W: io::Write> Sink for JsonStreamSink<W> {
    fn write_null(&mut self) -> Result<()> {
        self.before_value()?;
        self.writer.write_all(b"null")?;
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.before_value()?;
        self.writer
            .write_all(if v { b"true" } else { b"false" })?;
        Ok(())
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_i64(i64::from(v))
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_i64(i64::from(v))
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_i64(i64::from(v))
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.before_value()?;
        write!(self.writer, "{v}")?;
        Ok(())
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        if !v.is_finite() {
            return Err(WireformError::MalformedScalar(format!(
                "{v} is not representable in JSON"
            )));
        }
        self.before_value()?;
        write!(self.writer, "{v:?}")?;
        Ok(())
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        if !v.is_finite() {
            return Err(WireformError::MalformedScalar(format!(
                "{v} is not representable in JSON"
            )));
        }
        self.before_value()?;
        write!(self.writer, "{v:?}")?;
        Ok(())
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        self.before_value()?;
        self.quoted(v)
    }

    fn start_object(&mut self) -> Result<()> {
        self.before_value()?;
        self.writer.write_all(b"{")?;
        self.stack.push(Frame {
            container: Container::Object,
            count: 0,
        });
        Ok(())
    }

    fn field(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(frame) if frame.container == Container::Object => {
                if frame.count > 0 {
                    self.writer.write_all(b",")?;
                }
                frame.count += 1;
            }
            _ => {
                return Err(WireformError::Internal(
                    "field name written outside an object".to_string(),
                ));
            }
        }
        self.quoted(name)?;
        self.writer.write_all(b":")?;
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(frame) if frame.container == Container::Object => {
                self.writer.write_all(b"}")?;
                Ok(())
            }
            _ => Err(WireformError::Internal(
                "object closed without a matching open".to_string(),
            )),
        }
    }

    fn start_array(&mut self) -> Result<()> {
        self.before_value()?;
        self.writer.write_all(b"[")?;
        self.stack.push(Frame {
            container: Container::Array,
            count: 0,
        });
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(frame) if frame.container == Container::Array => {
                self.writer.write_all(b"]")?;
                Ok(())
            }
            _ => Err(WireformError::Internal(
                "array closed without a matching open".to_string(),
            )),
        }
    }
}

enum Ctx {
    Object { expect_key: bool },
    Array,
}

/// Pull tokenizer over JSON text.
pub struct JsonTokenProducer {
    text: String,
    pos: usize,
    stack: Vec<Ctx>,
    root_done: bool,
}

impl JsonTokenProducer {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            pos: 0,
            stack: Vec::new(),
            root_done: false,
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek_byte(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        let bytes = self.text.as_bytes();
        while let Some(b) = bytes.get(self.pos) {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn bad(&self, message: &str) -> WireformError {
        WireformError::MalformedInput(format!("{message} at {}", self.location()))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.peek_byte() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.bad(&format!("expected '{}'", expected as char)))
        }
    }

    fn expect_literal(&mut self, literal: &str) -> Result<()> {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.bad(&format!("expected '{literal}'")))
        }
    }

    /// Scan a quoted string and decode its escapes through `serde_json`.
    fn parse_string(&mut self) -> Result<String> {
        let bytes = self.text.as_bytes();
        if bytes.get(self.pos) != Some(&b'"') {
            return Err(self.bad("expected '\"'"));
        }
        let start = self.pos;
        let mut i = self.pos + 1;
        loop {
            match bytes.get(i) {
                Some(b'\\') => i += 2,
                Some(b'"') => break,
                Some(_) => i += 1,
                None => return Err(self.bad("unterminated string")),
            }
        }
        let slice = &self.text[start..=i];
        let decoded: String = serde_json::from_str(slice)
            .map_err(|e| self.bad(&format!("invalid string literal ({e})")))?;
        self.pos = i + 1;
        Ok(decoded)
    }

    fn parse_number(&mut self) -> Result<Event> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        while let Some(b) = bytes.get(self.pos) {
            if matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let slice = &self.text[start..self.pos];
        if slice.is_empty() {
            return Err(self.bad("expected a value"));
        }
        if slice.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
            let v: f64 = slice
                .parse()
                .map_err(|_| self.bad(&format!("invalid number '{slice}'")))?;
            Ok(Event::Float(v))
        } else {
            match slice.parse::<i64>() {
                Ok(v) => Ok(Event::Int(v)),
                // Magnitude beyond i64: surface as a float.
                Err(_) => slice
                    .parse::<f64>()
                    .map(Event::Float)
                    .map_err(|_| self.bad(&format!("invalid number '{slice}'"))),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Event> {
        match self.peek_byte() {
            Some(b'{') => {
                self.pos += 1;
                self.stack.push(Ctx::Object { expect_key: true });
                Ok(Event::StartObject)
            }
            Some(b'[') => {
                self.pos += 1;
                self.stack.push(Ctx::Array);
                Ok(Event::StartArray)
            }
            Some(b'"') => {
                let s = self.parse_string()?;
                self.scalar_done();
                Ok(Event::Str(s))
            }
            Some(b't') => {
                self.expect_literal("true")?;
                self.scalar_done();
                Ok(Event::Bool(true))
            }
            Some(b'f') => {
                self.expect_literal("false")?;
                self.scalar_done();
                Ok(Event::Bool(false))
            }
            Some(b'n') => {
                self.expect_literal("null")?;
                self.scalar_done();
                Ok(Event::Null)
            }
            Some(_) => {
                let event = self.parse_number()?;
                self.scalar_done();
                Ok(event)
            }
            None => Err(self.bad("unexpected end of input")),
        }
    }

    fn scalar_done(&mut self) {
        match self.stack.last_mut() {
            Some(Ctx::Object { expect_key }) => *expect_key = true,
            Some(Ctx::Array) => {}
            None => self.root_done = true,
        }
    }

    fn container_closed(&mut self) {
        match self.stack.last_mut() {
            Some(Ctx::Object { expect_key }) => *expect_key = true,
            Some(Ctx::Array) => {}
            None => self.root_done = true,
        }
    }
}

impl EventProducer for JsonTokenProducer {
    fn next_event(&mut self) -> Result<Option<Event>> {
        self.skip_ws();
        match self.stack.last() {
            None => {
                if self.root_done || self.peek_byte().is_none() {
                    return Ok(None);
                }
                self.parse_value().map(Some)
            }
            Some(Ctx::Array) => {
                if self.peek_byte() == Some(b']') {
                    self.pos += 1;
                    self.stack.pop();
                    self.container_closed();
                    return Ok(Some(Event::EndArray));
                }
                if self.peek_byte() == Some(b',') {
                    self.pos += 1;
                    self.skip_ws();
                }
                self.parse_value().map(Some)
            }
            Some(Ctx::Object { expect_key: true }) => {
                if self.peek_byte() == Some(b'}') {
                    self.pos += 1;
                    self.stack.pop();
                    self.container_closed();
                    return Ok(Some(Event::EndObject));
                }
                if self.peek_byte() == Some(b',') {
                    self.pos += 1;
                    self.skip_ws();
                }
                let name = self.parse_string()?;
                self.skip_ws();
                self.expect_byte(b':')?;
                if let Some(Ctx::Object { expect_key }) = self.stack.last_mut() {
                    *expect_key = false;
                }
                Ok(Some(Event::Field(name)))
            }
            Some(Ctx::Object { expect_key: false }) => self.parse_value().map(Some),
        }
    }

    fn location(&self) -> String {
        let consumed = &self.text[..self.pos.min(self.text.len())];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rfind('\n')
            .map_or(self.pos, |n| self.pos - n - 1)
            + 1;
        format!("line {line}, column {column}")
    }
}

/// Event source over JSON text.
pub type JsonStreamSource = EventSource<JsonTokenProducer>;

/// Tokenize JSON text into an event source.
pub fn source(text: &str) -> JsonStreamSource {
    EventSource::new(JsonTokenProducer::new(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Source;

    fn events(text: &str) -> Result<Vec<Event>> {
        let mut producer = JsonTokenProducer::new(text);
        let mut out = Vec::new();
        while let Some(event) = producer.next_event()? {
            out.push(event);
        }
        Ok(out)
    }

    #[test]
    fn tokenizes_scalars() -> Result<()> {
        assert_eq!(events("42")?, vec![Event::Int(42)]);
        assert_eq!(events("-1.5")?, vec![Event::Float(-1.5)]);
        assert_eq!(events("true")?, vec![Event::Bool(true)]);
        assert_eq!(events("null")?, vec![Event::Null]);
        assert_eq!(
            events(r#""a\nb""#)?,
            vec![Event::Str("a\nb".to_string())]
        );
        Ok(())
    }

    #[test]
    fn tokenizes_nested_structure() -> Result<()> {
        let got = events(r#"{"a": [1, {"b": "x"}], "c": null}"#)?;
        assert_eq!(
            got,
            vec![
                Event::StartObject,
                Event::Field("a".to_string()),
                Event::StartArray,
                Event::Int(1),
                Event::StartObject,
                Event::Field("b".to_string()),
                Event::Str("x".to_string()),
                Event::EndObject,
                Event::EndArray,
                Event::Field("c".to_string()),
                Event::Null,
                Event::EndObject,
            ]
        );
        Ok(())
    }

    #[test]
    fn writer_and_tokenizer_roundtrip() -> Result<()> {
        let mut buffer = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buffer);
        sink.start_object()?;
        sink.field("names")?;
        sink.start_array()?;
        sink.write_str("a\"b")?;
        sink.write_i32(-7)?;
        sink.end_array()?;
        sink.end_object()?;
        sink.finish()?;

        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(text, r#"{"names":["a\"b",-7]}"#);

        let mut src = source(&text);
        src.start_object()?;
        assert_eq!(src.read_field_name()?, "names");
        src.start_array()?;
        assert_eq!(src.read_str()?, "a\"b");
        assert_eq!(src.read_i32()?, -7);
        src.end_array()?;
        src.end_object()?;
        assert!(!src.has_more()?);
        Ok(())
    }

    #[test]
    fn lookahead_supports_envelope_detection() -> Result<()> {
        let text = r#"{"@type":"Circle","@value":{"r":1.0}}"#;
        let mut src = source(text);
        assert_eq!(src.event(0)?, &Event::StartObject);
        assert_eq!(src.event(1)?, &Event::Field("@type".to_string()));
        assert_eq!(src.event(2)?, &Event::Str("Circle".to_string()));
        assert_eq!(src.event(3)?, &Event::Field("@value".to_string()));
        // Nothing consumed.
        src.start_object()?;
        assert_eq!(src.read_field_name()?, "@type");
        Ok(())
    }
}
