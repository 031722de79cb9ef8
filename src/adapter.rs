//! The format adapter contract.
//!
//! A format adapter is the only place where format-specific concerns live.
//! It exposes two capabilities the codec core drives:
//!
//! - an **output surface** ([`Sink`], push style): typed scalar writes plus
//!   object/array bracketing. The core is responsible for well-bracketed
//!   call sequences.
//! - an **input surface** ([`Source`], pull style): typed scalar reads,
//!   bracketing reads, structural skip, and *lookahead*: [`Source::event`]
//!   peeks the `k`-th upcoming event without consuming it. Adapters must
//!   honour at least the configured minimum lookahead (3); every adapter in
//!   this crate peeks without bound. Dynamic-envelope detection inspects
//!   events 0 through 3.
//!
//! Adapters surface only typed [`Event`]s; lexical concerns (whitespace,
//! escaping, quoting, markers) stay inside the adapter.
//!
//! [`EventSource`] is the shared pull-side implementation: each adapter
//! supplies an [`EventProducer`] (incremental tokenizer or a pre-walked
//! document) and inherits buffering, lookahead, skipping and the typed reads.

use crate::error::{Result, WireformError};
use std::collections::VecDeque;

/// A single structural event on the input surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Object opens.
    StartObject,
    /// Object closes.
    EndObject,
    /// Array opens.
    StartArray,
    /// Array closes.
    EndArray,
    /// A field name inside an object.
    Field(String),
    /// The null value.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar, widened to 64 bits; typed reads narrow-check.
    Int(i64),
    /// A floating-point scalar, widened to 64 bits.
    Float(f64),
    /// A string scalar. Text formats without native numbers (XML) surface
    /// every scalar this way and the cursor coerces lexically.
    Str(String),
    /// End of input.
    Eof,
}

static EOF_EVENT: Event = Event::Eof;

/// The push-style output surface of a format adapter.
pub trait Sink {
    /// Write the null value.
    fn write_null(&mut self) -> Result<()>;
    /// Write a boolean.
    fn write_bool(&mut self, v: bool) -> Result<()>;
    /// Write a `byte`.
    fn write_i8(&mut self, v: i8) -> Result<()>;
    /// Write a `short`.
    fn write_i16(&mut self, v: i16) -> Result<()>;
    /// Write an `int`.
    fn write_i32(&mut self, v: i32) -> Result<()>;
    /// Write a `long`.
    fn write_i64(&mut self, v: i64) -> Result<()>;
    /// Write a `float`.
    fn write_f32(&mut self, v: f32) -> Result<()>;
    /// Write a `double`.
    fn write_f64(&mut self, v: f64) -> Result<()>;
    /// Write a `char`. Defaults to a one-character string.
    fn write_char(&mut self, v: char) -> Result<()> {
        self.write_str(v.encode_utf8(&mut [0u8; 4]))
    }
    /// Write a string.
    fn write_str(&mut self, v: &str) -> Result<()>;
    /// Open an object.
    fn start_object(&mut self) -> Result<()>;
    /// Announce the next field of the current object.
    fn field(&mut self, name: &str) -> Result<()>;
    /// Close the current object.
    fn end_object(&mut self) -> Result<()>;
    /// Open an array.
    fn start_array(&mut self) -> Result<()>;
    /// Close the current array.
    fn end_array(&mut self) -> Result<()>;
}

/// The pull-style input surface of a format adapter.
pub trait Source {
    /// Peek the `lookahead`-th upcoming event without consuming anything.
    /// `event(0)` is the current event; past the end it is [`Event::Eof`].
    fn event(&mut self, lookahead: usize) -> Result<&Event>;

    /// Consume a null.
    fn read_null(&mut self) -> Result<()>;
    /// Consume a boolean.
    fn read_bool(&mut self) -> Result<bool>;
    /// Consume a `byte`.
    fn read_i8(&mut self) -> Result<i8>;
    /// Consume a `short`.
    fn read_i16(&mut self) -> Result<i16>;
    /// Consume an `int`.
    fn read_i32(&mut self) -> Result<i32>;
    /// Consume a `long`.
    fn read_i64(&mut self) -> Result<i64>;
    /// Consume a `float`.
    fn read_f32(&mut self) -> Result<f32>;
    /// Consume a `double`.
    fn read_f64(&mut self) -> Result<f64>;
    /// Consume a `char`; fails with `MalformedScalar` unless the underlying
    /// string is exactly one character.
    fn read_char(&mut self) -> Result<char>;
    /// Consume a string.
    fn read_str(&mut self) -> Result<String>;

    /// Consume an object opening.
    fn start_object(&mut self) -> Result<()>;
    /// Consume and return the next field name.
    fn read_field_name(&mut self) -> Result<String>;
    /// Consume the next field name and require it to equal `expected`.
    fn expect_field(&mut self, expected: &str) -> Result<()> {
        let name = self.read_field_name()?;
        if name == expected {
            Ok(())
        } else {
            Err(WireformError::MalformedInput(format!(
                "expected field '{expected}', found '{name}' at {}",
                self.location()
            )))
        }
    }
    /// Consume an object closing.
    fn end_object(&mut self) -> Result<()>;
    /// Consume an array opening.
    fn start_array(&mut self) -> Result<()>;
    /// Consume an array closing.
    fn end_array(&mut self) -> Result<()>;

    /// Consume exactly one structural unit: a scalar, a balanced object, or
    /// a balanced array.
    fn skip_node(&mut self) -> Result<()>;

    /// Whether any event other than [`Event::Eof`] remains.
    fn has_more(&mut self) -> Result<bool> {
        Ok(!matches!(self.event(0)?, Event::Eof))
    }

    /// A human-readable position for error messages.
    fn location(&self) -> String;
}

/// Supplies events to an [`EventSource`], one at a time.
pub trait EventProducer {
    /// Produce the next event, or `None` at end of input.
    fn next_event(&mut self) -> Result<Option<Event>>;
    /// Current position for diagnostics.
    fn location(&self) -> String;
}

/// A producer over an already-linearised event list.
///
/// DOM-shaped adapters (JSON document, XML, MessagePack) walk their input
/// up front and serve events from the resulting list.
#[derive(Debug)]
pub struct ListProducer {
    events: VecDeque<Event>,
    served: usize,
}

impl ListProducer {
    /// Wrap a pre-walked event list.
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
            served: 0,
        }
    }
}

impl EventProducer for ListProducer {
    fn next_event(&mut self) -> Result<Option<Event>> {
        match self.events.pop_front() {
            Some(e) => {
                self.served += 1;
                Ok(Some(e))
            }
            None => Ok(None),
        }
    }

    fn location(&self) -> String {
        format!("event #{}", self.served)
    }
}

/// Shared pull-side cursor: buffering, unbounded lookahead, typed reads.
///
/// `lexical` marks producers whose format has no native scalar types (XML):
/// their string events coerce to numbers and booleans on typed reads.
#[derive(Debug)]
pub struct EventSource<P> {
    producer: P,
    queue: VecDeque<Event>,
    lexical: bool,
    exhausted: bool,
}

impl<P: EventProducer> EventSource<P> {
    /// Build a cursor over a typed producer.
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            queue: VecDeque::new(),
            lexical: false,
            exhausted: false,
        }
    }

    /// Build a cursor whose string events coerce lexically on typed reads.
    pub fn lexical(producer: P) -> Self {
        Self {
            producer,
            queue: VecDeque::new(),
            lexical: true,
            exhausted: false,
        }
    }

    fn fill(&mut self, upto: usize) -> Result<()> {
        while self.queue.len() <= upto && !self.exhausted {
            match self.producer.next_event()? {
                Some(e) => self.queue.push_back(e),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Event> {
        self.fill(0)?;
        self.queue.pop_front().ok_or_else(|| {
            WireformError::MalformedInput(format!(
                "unexpected end of input at {}",
                self.producer.location()
            ))
        })
    }

    fn unexpected(&self, expected: &str, found: &Event) -> WireformError {
        WireformError::MalformedInput(format!(
            "expected {expected}, found {found:?} at {}",
            self.producer.location()
        ))
    }

    fn pop_int(&mut self) -> Result<i64> {
        match self.pop()? {
            Event::Int(v) => Ok(v),
            Event::Str(s) if self.lexical => s.trim().parse().map_err(|_| {
                WireformError::MalformedScalar(format!(
                    "'{s}' is not an integer at {}",
                    self.producer.location()
                ))
            }),
            other => Err(self.unexpected("integer", &other)),
        }
    }

    fn pop_float(&mut self) -> Result<f64> {
        match self.pop()? {
            Event::Float(v) => Ok(v),
            Event::Int(v) => Ok(v as f64),
            Event::Str(s) if self.lexical => s.trim().parse().map_err(|_| {
                WireformError::MalformedScalar(format!(
                    "'{s}' is not a number at {}",
                    self.producer.location()
                ))
            }),
            other => Err(self.unexpected("number", &other)),
        }
    }

    fn narrow<T: TryFrom<i64>>(&self, v: i64, width: &str) -> Result<T> {
        T::try_from(v).map_err(|_| {
            WireformError::MalformedScalar(format!(
                "{v} does not fit in {width} at {}",
                self.producer.location()
            ))
        })
    }
}

impl<P: EventProducer> Source for EventSource<P> {
    fn event(&mut self, lookahead: usize) -> Result<&Event> {
        self.fill(lookahead)?;
        Ok(self.queue.get(lookahead).unwrap_or(&EOF_EVENT))
    }

    fn read_null(&mut self) -> Result<()> {
        match self.pop()? {
            Event::Null => Ok(()),
            other => Err(self.unexpected("null", &other)),
        }
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.pop()? {
            Event::Bool(v) => Ok(v),
            Event::Str(s) if self.lexical => match s.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(WireformError::MalformedScalar(format!(
                    "'{s}' is not a boolean at {}",
                    self.producer.location()
                ))),
            },
            other => Err(self.unexpected("boolean", &other)),
        }
    }

    fn read_i8(&mut self) -> Result<i8> {
        let v = self.pop_int()?;
        self.narrow(v, "byte")
    }

    fn read_i16(&mut self) -> Result<i16> {
        let v = self.pop_int()?;
        self.narrow(v, "short")
    }

    fn read_i32(&mut self) -> Result<i32> {
        let v = self.pop_int()?;
        self.narrow(v, "int")
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.pop_int()
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(self.pop_float()? as f32)
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.pop_float()
    }

    fn read_char(&mut self) -> Result<char> {
        let s = self.read_str()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(WireformError::MalformedScalar(format!(
                "char must be exactly one character, got '{s}' at {}",
                self.producer.location()
            ))),
        }
    }

    fn read_str(&mut self) -> Result<String> {
        match self.pop()? {
            Event::Str(s) => Ok(s),
            other => Err(self.unexpected("string", &other)),
        }
    }

    fn start_object(&mut self) -> Result<()> {
        match self.pop()? {
            Event::StartObject => Ok(()),
            other => Err(self.unexpected("object start", &other)),
        }
    }

    fn read_field_name(&mut self) -> Result<String> {
        match self.pop()? {
            Event::Field(name) => Ok(name),
            other => Err(self.unexpected("field name", &other)),
        }
    }

    fn end_object(&mut self) -> Result<()> {
        match self.pop()? {
            Event::EndObject => Ok(()),
            other => Err(self.unexpected("object end", &other)),
        }
    }

    fn start_array(&mut self) -> Result<()> {
        match self.pop()? {
            Event::StartArray => Ok(()),
            other => Err(self.unexpected("array start", &other)),
        }
    }

    fn end_array(&mut self) -> Result<()> {
        match self.pop()? {
            Event::EndArray => Ok(()),
            other => Err(self.unexpected("array end", &other)),
        }
    }

    fn skip_node(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            let event = self.pop()?;
            match event {
                Event::StartObject | Event::StartArray => depth += 1,
                Event::EndObject | Event::EndArray => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        WireformError::MalformedInput(format!(
                            "unbalanced close while skipping at {}",
                            self.producer.location()
                        ))
                    })?;
                }
                Event::Field(_) if depth > 0 => {}
                Event::Eof => {
                    return Err(WireformError::MalformedInput(format!(
                        "unexpected end of input while skipping at {}",
                        self.producer.location()
                    )));
                }
                // Scalar or stray field name.
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn location(&self) -> String {
        self.producer.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(events: Vec<Event>) -> EventSource<ListProducer> {
        EventSource::new(ListProducer::new(events))
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut src = source(vec![Event::Int(1), Event::Int(2)]);
        assert_eq!(src.event(1).expect("peek"), &Event::Int(2));
        assert_eq!(src.event(0).expect("peek"), &Event::Int(1));
        assert_eq!(src.read_i32().expect("read"), 1);
        assert_eq!(src.read_i32().expect("read"), 2);
        assert_eq!(src.event(0).expect("peek"), &Event::Eof);
    }

    #[test]
    fn narrowing_checks_width() {
        let mut src = source(vec![Event::Int(1000)]);
        assert!(matches!(
            src.read_i8(),
            Err(WireformError::MalformedScalar(_))
        ));
    }

    #[test]
    fn skip_node_consumes_one_unit() {
        let mut src = source(vec![
            Event::StartObject,
            Event::Field("a".into()),
            Event::StartArray,
            Event::Int(1),
            Event::EndArray,
            Event::EndObject,
            Event::Int(7),
        ]);
        src.skip_node().expect("skip");
        assert_eq!(src.read_i32().expect("read"), 7);
    }

    #[test]
    fn lexical_coercion() {
        let mut src = EventSource::lexical(ListProducer::new(vec![
            Event::Str("42".into()),
            Event::Str("true".into()),
            Event::Str("2.5".into()),
        ]));
        assert_eq!(src.read_i32().expect("int"), 42);
        assert!(src.read_bool().expect("bool"));
        assert_eq!(src.read_f64().expect("float"), 2.5);
    }
}
