//! # Wireform
//!
//! A format-pluggable object serialization engine. One format-independent
//! codec core encodes and decodes dynamic value trees into multiple wire
//! representations (JSON documents, JSON event streams, XML, a compact
//! tagged binary form, and MessagePack) while preserving enough type
//! information to reconstruct the original dynamic types on the decoding
//! side.
//!
//! ## Overview
//!
//! Callers declare a *static type* when encoding or decoding. The engine
//! bridges the gap between the static type and the value's actual *dynamic*
//! type by embedding a two-field `{"@type": …, "@value": …}` envelope when,
//! and only when, the two differ. A value whose runtime type matches its
//! declared type costs nothing extra on the wire.
//!
//! The core is built from a handful of cooperating pieces:
//!
//! * A **registry** of per-type codecs, keyed by structural
//!   [`TypeKey`]s. Codecs for user types are synthesised on first use from
//!   [`TypeDescriptor`] metadata and cached; cyclic type graphs terminate
//!   through lazy forwarding references.
//! * **Shape codec families** for the eight primitives, strings, enums,
//!   arrays, collections, and maps (string-keyed maps encode as objects,
//!   other key types as arrays of two-field entries).
//! * A **dynamic-type dispatcher** that emits and recognises envelopes.
//! * **Format adapters** ([`Sink`]/[`Source`]), the only place where
//!   format-specific concerns live. The bundled adapters are in
//!   [`formats`]; third parties can implement their own.
//!
//! Type metadata comes from `#[derive(WireformObject)]` at compile time or
//! from [`TypeDescriptorBuilder`] at runtime; both feed the same oracle.
//!
//! ## Usage
//!
//! ```rust
//! use wireform::{Wireform, WireformObject};
//!
//! #[derive(WireformObject, Debug, PartialEq, Clone)]
//! struct Reading {
//!     sensor: String,
//!     celsius: f64,
//!     flags: Vec<bool>,
//! }
//!
//! let engine = Wireform::new();
//! let reading = Reading {
//!     sensor: "bay-3".to_string(),
//!     celsius: 21.5,
//!     flags: vec![true, false],
//! };
//!
//! // Same value, three wire forms.
//! let json = engine.to_json_string(&reading)?;
//! let packed = engine.to_bytes(&reading)?;
//! let msgpack = engine.to_msgpack(&reading)?;
//!
//! assert_eq!(engine.from_json_str::<Reading>(&json)?, reading);
//! assert_eq!(engine.from_bytes::<Reading>(&packed)?, reading);
//! assert_eq!(engine.from_msgpack::<Reading>(&msgpack)?, reading);
//! # Ok::<(), wireform::WireformError>(())
//! ```
//!
//! ## Dynamic types
//!
//! A field declared as [`Value`] accepts any supported value; its encoded
//! form carries an envelope naming the runtime type so decoding restores it
//! exactly. Abstract types registered with
//! [`TypeDescriptor::abstract_type`] behave the same way for named
//! hierarchies, and [`Config`] controls the envelope field names.
//!
//! ## Concurrency
//!
//! Encode and decode calls are synchronous and blocking with no internal
//! parallelism. A [`Wireform`] engine is `Send + Sync`; registrations take
//! `&self` and follow insert-only discipline, so adding a new type while
//! another thread encodes a different one is safe.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod adapter;
pub mod api;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod formats;
pub mod key;
pub mod reflect;
mod registry;
pub mod value;

pub use adapter::{Event, EventProducer, EventSource, ListProducer, Sink, Source};
pub use api::Wireform;
pub use codec::CustomCodec;
pub use config::Config;
pub use descriptor::{
    FieldDescriptor, PrimitiveKind, TypeDescriptor, TypeDescriptorBuilder, TypeKind,
};
pub use error::{Result, WireformError};
pub use key::TypeKey;
pub use reflect::Reflect;
pub use value::Value;

// Re-export the derive macro so it is accessible as `wireform::WireformObject`.
pub use wireform_derive::WireformObject;
