//! Compact tagged binary adapter.
//!
//! Every structural unit is prefixed with a one-byte tag; multi-byte
//! payloads are little-endian, strings and field names are length-prefixed
//! UTF-8. The framing is self-describing, so lookahead and `skip_node` work
//! without any type knowledge, and the uniform two-field envelope detection
//! applies to this format exactly as it does to JSON.

use crate::adapter::{Event, EventProducer, EventSource, Sink};
use crate::error::{Result, WireformError};

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_I8: u8 = 0x03;
const TAG_I16: u8 = 0x04;
const TAG_I32: u8 = 0x05;
const TAG_I64: u8 = 0x06;
const TAG_F32: u8 = 0x07;
const TAG_F64: u8 = 0x08;
const TAG_CHAR: u8 = 0x09;
const TAG_STR: u8 = 0x0A;
const TAG_OBJ_START: u8 = 0x0B;
const TAG_FIELD: u8 = 0x0C;
const TAG_OBJ_END: u8 = 0x0D;
const TAG_ARR_START: u8 = 0x0E;
const TAG_ARR_END: u8 = 0x0F;

/// Writes the tagged binary form into a buffer.
pub struct BytesSink {
    buffer: Vec<u8>,
}

impl BytesSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// The finished buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    fn push_str(&mut self, tag: u8, text: &str) -> Result<()> {
        let len = u32::try_from(text.len()).map_err(|_| {
            WireformError::MalformedScalar("string longer than u32::MAX bytes".to_string())
        })?;
        self.buffer.push(tag);
        self.buffer.extend_from_slice(&len.to_le_bytes());
        self.buffer.extend_from_slice(text.as_bytes());
        Ok(())
    }
}

impl Default for BytesSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for BytesSink {
    fn write_null(&mut self) -> Result<()> {
        self.buffer.push(TAG_NULL);
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.buffer.push(if v { TAG_TRUE } else { TAG_FALSE });
        Ok(())
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.buffer.push(TAG_I8);
        self.buffer.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.buffer.push(TAG_I16);
        self.buffer.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.buffer.push(TAG_I32);
        self.buffer.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.buffer.push(TAG_I64);
        self.buffer.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.buffer.push(TAG_F32);
        self.buffer.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.buffer.push(TAG_F64);
        self.buffer.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn write_char(&mut self, v: char) -> Result<()> {
        self.buffer.push(TAG_CHAR);
        self.buffer.extend_from_slice(&(v as u32).to_le_bytes());
        Ok(())
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        self.push_str(TAG_STR, v)
    }

    fn start_object(&mut self) -> Result<()> {
        self.buffer.push(TAG_OBJ_START);
        Ok(())
    }

    fn field(&mut self, name: &str) -> Result<()> {
        self.push_str(TAG_FIELD, name)
    }

    fn end_object(&mut self) -> Result<()> {
        self.buffer.push(TAG_OBJ_END);
        Ok(())
    }

    fn start_array(&mut self) -> Result<()> {
        self.buffer.push(TAG_ARR_START);
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.buffer.push(TAG_ARR_END);
        Ok(())
    }
}

/// Incremental reader over the tagged binary form.
pub struct ByteProducer {
    data: Vec<u8>,
    pos: usize,
}

impl ByteProducer {
    fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
        }
    }

    fn truncated(&self, what: &str) -> WireformError {
        WireformError::MalformedInput(format!(
            "truncated {what} at byte offset {}",
            self.pos
        ))
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.truncated("payload"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.take(N)?
            .try_into()
            .map_err(|_| self.truncated("payload"))
    }

    fn take_string(&mut self) -> Result<String> {
        let len = u32::from_le_bytes(self.take_array::<4>()?) as usize;
        let bytes = self.take(len)?.to_vec();
        String::from_utf8(bytes).map_err(|_| {
            WireformError::MalformedInput(format!(
                "invalid UTF-8 string at byte offset {}",
                self.pos
            ))
        })
    }
}

impl EventProducer for ByteProducer {
    fn next_event(&mut self) -> Result<Option<Event>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let tag = self.data[self.pos];
        self.pos += 1;
        let event = match tag {
            TAG_NULL => Event::Null,
            TAG_FALSE => Event::Bool(false),
            TAG_TRUE => Event::Bool(true),
            TAG_I8 => Event::Int(i64::from(i8::from_le_bytes(self.take_array::<1>()?))),
            TAG_I16 => Event::Int(i64::from(i16::from_le_bytes(self.take_array::<2>()?))),
            TAG_I32 => Event::Int(i64::from(i32::from_le_bytes(self.take_array::<4>()?))),
            TAG_I64 => Event::Int(i64::from_le_bytes(self.take_array::<8>()?)),
            TAG_F32 => Event::Float(f64::from(f32::from_le_bytes(self.take_array::<4>()?))),
            TAG_F64 => Event::Float(f64::from_le_bytes(self.take_array::<8>()?)),
            TAG_CHAR => {
                let code = u32::from_le_bytes(self.take_array::<4>()?);
                let c = char::from_u32(code).ok_or_else(|| {
                    WireformError::MalformedScalar(format!(
                        "{code:#x} is not a valid char at byte offset {}",
                        self.pos
                    ))
                })?;
                Event::Str(c.to_string())
            }
            TAG_STR => Event::Str(self.take_string()?),
            TAG_FIELD => Event::Field(self.take_string()?),
            TAG_OBJ_START => Event::StartObject,
            TAG_OBJ_END => Event::EndObject,
            TAG_ARR_START => Event::StartArray,
            TAG_ARR_END => Event::EndArray,
            other => {
                return Err(WireformError::MalformedInput(format!(
                    "unknown tag {other:#04x} at byte offset {}",
                    self.pos - 1
                )));
            }
        };
        Ok(Some(event))
    }

    fn location(&self) -> String {
        format!("byte offset {}", self.pos)
    }
}

/// Event source over the tagged binary form.
pub type BytesSource = EventSource<ByteProducer>;

/// Read a buffer as an event source.
pub fn source(data: &[u8]) -> BytesSource {
    EventSource::new(ByteProducer::new(data))
}
