//! MessagePack adapter.
//!
//! Standard MessagePack markers, big-endian payloads, minimal integer
//! encodings. MessagePack maps and arrays are length-prefixed while the
//! sink contract announces no sizes, so each open container buffers its
//! payload and the header is emitted when it closes. Objects become maps
//! with string keys; the engine's non-string-keyed maps arrive as arrays of
//! two-field entry maps, so every map this adapter writes has string keys.
//!
//! The source materialises the input into events up front, which makes
//! lookahead and `skip_node` trivial.

use crate::adapter::{Event, EventSource, ListProducer, Sink};
use crate::error::{Result, WireformError};

#[derive(PartialEq)]
enum MpKind {
    Map,
    Array,
}

struct MpFrame {
    kind: MpKind,
    count: u32,
    buf: Vec<u8>,
}

/// Writes MessagePack into a buffer.
pub struct MsgPackSink {
    root: Vec<u8>,
    frames: Vec<MpFrame>,
}

impl MsgPackSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self {
            root: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// The finished buffer.
    pub fn into_vec(self) -> Result<Vec<u8>> {
        if !self.frames.is_empty() {
            return Err(WireformError::Internal(
                "unbalanced object or array in MessagePack sink".to_string(),
            ));
        }
        Ok(self.root)
    }

    fn buf(&mut self) -> &mut Vec<u8> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.buf,
            None => &mut self.root,
        }
    }

    /// Arrays count their elements as they arrive; maps count pairs in
    /// `field`.
    fn note_value(&mut self) {
        if let Some(frame) = self.frames.last_mut()
            && frame.kind == MpKind::Array
        {
            frame.count += 1;
        }
    }

    fn put_int(&mut self, v: i64) {
        let buf = self.buf();
        match v {
            0..=0x7f => buf.push(v as u8),
            -32..=-1 => buf.push((v as i8) as u8),
            _ if i8::try_from(v).is_ok() => {
                buf.push(0xd0);
                buf.extend_from_slice(&(v as i8).to_be_bytes());
            }
            _ if i16::try_from(v).is_ok() => {
                buf.push(0xd1);
                buf.extend_from_slice(&(v as i16).to_be_bytes());
            }
            _ if i32::try_from(v).is_ok() => {
                buf.push(0xd2);
                buf.extend_from_slice(&(v as i32).to_be_bytes());
            }
            _ => {
                buf.push(0xd3);
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
    }

    fn put_str(&mut self, text: &str) -> Result<()> {
        let len = text.len();
        let buf = self.buf();
        match len {
            0..=31 => buf.push(0xa0 | len as u8),
            32..=0xff => {
                buf.push(0xd9);
                buf.push(len as u8);
            }
            0x100..=0xffff => {
                buf.push(0xda);
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                let len = u32::try_from(len).map_err(|_| {
                    WireformError::MalformedScalar(
                        "string longer than u32::MAX bytes".to_string(),
                    )
                })?;
                buf.push(0xdb);
                buf.extend_from_slice(&len.to_be_bytes());
            }
        }
        self.buf().extend_from_slice(text.as_bytes());
        Ok(())
    }
}

impl Default for MsgPackSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MsgPackSink {
    fn write_null(&mut self) -> Result<()> {
        self.note_value();
        self.buf().push(0xc0);
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.note_value();
        self.buf().push(if v { 0xc3 } else { 0xc2 });
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
        self.note_value();
        self.put_int(v);
        Ok(())
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.note_value();
        let buf = self.buf();
        buf.push(0xca);
        buf.extend_from_slice(&v.to_be_bytes());
        Ok(())
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.note_value();
        let buf = self.buf();
        buf.push(0xcb);
        buf.extend_from_slice(&v.to_be_bytes());
        Ok(())
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        self.note_value();
        self.put_str(v)
    }

    fn start_object(&mut self) -> Result<()> {
        self.note_value();
        self.frames.push(MpFrame {
            kind: MpKind::Map,
            count: 0,
            buf: Vec::new(),
        });
        Ok(())
    }

    fn field(&mut self, name: &str) -> Result<()> {
        match self.frames.last_mut() {
            Some(frame) if frame.kind == MpKind::Map => frame.count += 1,
            _ => {
                return Err(WireformError::Internal(
                    "field name written outside an object".to_string(),
                ));
            }
        }
        self.put_str(name)
    }

    fn end_object(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(frame) if frame.kind == MpKind::Map => {
                let buf = self.buf();
                match frame.count {
                    0..=15 => buf.push(0x80 | frame.count as u8),
                    16..=0xffff => {
                        buf.push(0xde);
                        buf.extend_from_slice(&(frame.count as u16).to_be_bytes());
                    }
                    _ => {
                        buf.push(0xdf);
                        buf.extend_from_slice(&frame.count.to_be_bytes());
                    }
                }
                self.buf().extend_from_slice(&frame.buf);
                Ok(())
            }
            _ => Err(WireformError::Internal(
                "object closed without a matching open".to_string(),
            )),
        }
    }

    fn start_array(&mut self) -> Result<()> {
        self.note_value();
        self.frames.push(MpFrame {
            kind: MpKind::Array,
            count: 0,
            buf: Vec::new(),
        });
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(frame) if frame.kind == MpKind::Array => {
                let buf = self.buf();
                match frame.count {
                    0..=15 => buf.push(0x90 | frame.count as u8),
                    16..=0xffff => {
                        buf.push(0xdc);
                        buf.extend_from_slice(&(frame.count as u16).to_be_bytes());
                    }
                    _ => {
                        buf.push(0xdd);
                        buf.extend_from_slice(&frame.count.to_be_bytes());
                    }
                }
                self.buf().extend_from_slice(&frame.buf);
                Ok(())
            }
            _ => Err(WireformError::Internal(
                "array closed without a matching open".to_string(),
            )),
        }
    }
}

struct MpReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MpReader<'a> {
    fn bad(&self, message: &str) -> WireformError {
        WireformError::MalformedInput(format!("{message} at byte offset {}", self.pos))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.bad("truncated MessagePack payload"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.take(N)?
            .try_into()
            .map_err(|_| self.bad("truncated MessagePack payload"))
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    fn take_str(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| self.bad("invalid UTF-8 string"))
    }

    fn str_len(&mut self, marker: u8) -> Result<Option<usize>> {
        Ok(match marker {
            0xa0..=0xbf => Some((marker & 0x1f) as usize),
            0xd9 => Some(self.take_u8()? as usize),
            0xda => Some(u16::from_be_bytes(self.take_array::<2>()?) as usize),
            0xdb => Some(u32::from_be_bytes(self.take_array::<4>()?) as usize),
            _ => None,
        })
    }

    fn value_events(&mut self, out: &mut Vec<Event>) -> Result<()> {
        let marker = self.take_u8()?;
        if let Some(len) = self.str_len(marker)? {
            out.push(Event::Str(self.take_str(len)?));
            return Ok(());
        }
        match marker {
            0x00..=0x7f => out.push(Event::Int(i64::from(marker))),
            0xe0..=0xff => out.push(Event::Int(i64::from(marker as i8))),
            0xc0 => out.push(Event::Null),
            0xc2 => out.push(Event::Bool(false)),
            0xc3 => out.push(Event::Bool(true)),
            0xcc => out.push(Event::Int(i64::from(self.take_u8()?))),
            0xcd => out.push(Event::Int(i64::from(u16::from_be_bytes(
                self.take_array::<2>()?,
            )))),
            0xce => out.push(Event::Int(i64::from(u32::from_be_bytes(
                self.take_array::<4>()?,
            )))),
            0xcf => {
                let v = u64::from_be_bytes(self.take_array::<8>()?);
                let v = i64::try_from(v)
                    .map_err(|_| self.bad("unsigned integer beyond i64 range"))?;
                out.push(Event::Int(v));
            }
            0xd0 => out.push(Event::Int(i64::from(i8::from_be_bytes(
                self.take_array::<1>()?,
            )))),
            0xd1 => out.push(Event::Int(i64::from(i16::from_be_bytes(
                self.take_array::<2>()?,
            )))),
            0xd2 => out.push(Event::Int(i64::from(i32::from_be_bytes(
                self.take_array::<4>()?,
            )))),
            0xd3 => out.push(Event::Int(i64::from_be_bytes(self.take_array::<8>()?))),
            0xca => out.push(Event::Float(f64::from(f32::from_be_bytes(
                self.take_array::<4>()?,
            )))),
            0xcb => out.push(Event::Float(f64::from_be_bytes(self.take_array::<8>()?))),
            0x90..=0x9f => self.array_events((marker & 0x0f) as usize, out)?,
            0xdc => {
                let n = u16::from_be_bytes(self.take_array::<2>()?) as usize;
                self.array_events(n, out)?;
            }
            0xdd => {
                let n = u32::from_be_bytes(self.take_array::<4>()?) as usize;
                self.array_events(n, out)?;
            }
            0x80..=0x8f => self.map_events((marker & 0x0f) as usize, out)?,
            0xde => {
                let n = u16::from_be_bytes(self.take_array::<2>()?) as usize;
                self.map_events(n, out)?;
            }
            0xdf => {
                let n = u32::from_be_bytes(self.take_array::<4>()?) as usize;
                self.map_events(n, out)?;
            }
            other => {
                return Err(self.bad(&format!("unsupported MessagePack marker {other:#04x}")));
            }
        }
        Ok(())
    }

    fn array_events(&mut self, n: usize, out: &mut Vec<Event>) -> Result<()> {
        out.push(Event::StartArray);
        for _ in 0..n {
            self.value_events(out)?;
        }
        out.push(Event::EndArray);
        Ok(())
    }

    fn map_events(&mut self, n: usize, out: &mut Vec<Event>) -> Result<()> {
        out.push(Event::StartObject);
        for _ in 0..n {
            let marker = self.take_u8()?;
            let len = self
                .str_len(marker)?
                .ok_or_else(|| self.bad("map key must be a string"))?;
            out.push(Event::Field(self.take_str(len)?));
            self.value_events(out)?;
        }
        out.push(Event::EndObject);
        Ok(())
    }
}

/// Event source over MessagePack bytes.
pub type MsgPackSource = EventSource<ListProducer>;

/// Decode a buffer into an event source.
pub fn source(data: &[u8]) -> Result<MsgPackSource> {
    let mut reader = MpReader { data, pos: 0 };
    let mut events = Vec::new();
    reader.value_events(&mut events)?;
    Ok(EventSource::new(ListProducer::new(events)))
}
