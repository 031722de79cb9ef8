//! The bundled format adapters.
//!
//! Each adapter pairs a [`Sink`](crate::adapter::Sink) implementation with a
//! source constructor producing an [`EventSource`](crate::adapter::EventSource)
//! over format-specific events. Lexical concerns (whitespace, escaping,
//! quoting, markers) never leave these modules.

pub mod bytes;
pub mod json;
pub mod json_stream;
pub mod msgpack;
pub mod xml;
