//! The public façade.
//!
//! A [`Wireform`] instance owns a configuration, a descriptor table, a codec
//! registry, a type-proxy table and a constructor table. Engines are
//! independent: two instances with different envelope field names never
//! interact. Registration methods take `&self` and are safe to call
//! concurrently with encode/decode under insert-only discipline; the engine
//! needs no freeze step.

use crate::adapter::{Sink, Source};
use crate::codec::{Codec, CustomCodec, StringProxyPlan, ValueCtor};
use crate::config::Config;
use crate::descriptor::TypeDescriptor;
use crate::error::{Result, WireformError};
use crate::formats::bytes::BytesSink;
use crate::formats::json::JsonSink;
use crate::formats::json_stream::JsonStreamSink;
use crate::formats::msgpack::MsgPackSink;
use crate::formats::xml::XmlSink;
use crate::formats::{bytes, json, json_stream, msgpack, xml};
use crate::key::TypeKey;
use crate::reflect::Reflect;
use crate::registry::{slot_codec, CodecRegistry};
use crate::value::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// A format-pluggable serialization engine.
///
/// ```rust
/// use wireform::{Wireform, WireformObject};
///
/// #[derive(WireformObject, Debug, PartialEq)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// let engine = Wireform::new();
/// let text = engine.to_json_string(&Point { x: 1.0, y: 2.0 })?;
/// assert_eq!(text, r#"{"x":1.0,"y":2.0}"#);
/// let back: Point = engine.from_json_str(&text)?;
/// assert_eq!(back, Point { x: 1.0, y: 2.0 });
/// # Ok::<(), wireform::WireformError>(())
/// ```
pub struct Wireform {
    config: Config,
    descriptors: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
    constructors: RwLock<HashMap<TypeKey, Arc<ValueCtor>>>,
    proxies: RwLock<HashMap<TypeKey, TypeKey>>,
    registry: CodecRegistry,
}

impl Default for Wireform {
    fn default() -> Self {
        Self::new()
    }
}

impl Wireform {
    /// An engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// An engine with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            descriptors: RwLock::new(HashMap::new()),
            constructors: RwLock::new(HashMap::new()),
            proxies: RwLock::new(HashMap::new()),
            registry: CodecRegistry::new(),
        }
    }

    /// This engine's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- REGISTRATION ---

    /// Register a reflected type and its field types.
    ///
    /// The typed encode/decode entry points do this implicitly; an explicit
    /// call is only needed when a type participates purely dynamically
    /// (e.g. as an envelope target).
    pub fn register<T: Reflect>(&self) {
        T::register(self);
    }

    /// Register a runtime-built type descriptor under its name.
    ///
    /// The registry caches the first synthesised view of a type; replacing a
    /// descriptor after its codec has been synthesised has no effect on that
    /// codec.
    pub fn register_descriptor(&self, descriptor: TypeDescriptor) {
        log::debug!("registering descriptor for {}", descriptor.name);
        if let Ok(mut descriptors) = self.descriptors.write() {
            descriptors.insert(descriptor.name.clone(), Arc::new(descriptor));
        }
    }

    /// Whether a descriptor is registered under `name`.
    pub fn has_descriptor(&self, name: &str) -> bool {
        self.descriptors
            .read()
            .map(|d| d.contains_key(name))
            .unwrap_or(false)
    }

    pub(crate) fn descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.descriptors.read().ok()?.get(name).cloned()
    }

    /// Place a caller-supplied codec under `key`.
    ///
    /// An explicit registration wins over synthesis, and a repeat
    /// registration replaces the previous one without invalidating codecs
    /// already composed against it.
    pub fn register_codec(&self, key: TypeKey, codec: Arc<dyn CustomCodec>) -> Result<()> {
        log::debug!("registering custom codec for {key}");
        self.registry.install(key, Arc::new(Codec::Custom(codec)))
    }

    /// Route lookups of `from` to `to`. Applied exactly once at lookup
    /// entry, never recursively.
    pub fn register_type_proxy(&self, from: TypeKey, to: TypeKey) -> Result<()> {
        self.proxies
            .write()
            .map_err(|_| WireformError::Internal("type proxy lock poisoned".to_string()))?
            .insert(from, to);
        Ok(())
    }

    /// Register a codec that round-trips `key` through a string
    /// representation. Maps keyed on such a type use the readable
    /// object schema instead of two-field entries.
    pub fn register_string_proxy(
        &self,
        key: TypeKey,
        to_text: impl Fn(&Value) -> Result<String> + Send + Sync + 'static,
        from_text: impl Fn(&str) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<()> {
        let plan = StringProxyPlan {
            to_text: Box::new(to_text),
            from_text: Box::new(from_text),
        };
        self.registry
            .install(key, Arc::new(Codec::StringProxy(Arc::new(plan))))
    }

    /// Override the decode accumulator for `key`.
    ///
    /// Object constructors must produce a `Value::Object`, collection
    /// constructors a `Value::Array`, map constructors a `Value::Map`;
    /// pre-populated entries act as defaults.
    pub fn register_constructor(
        &self,
        key: TypeKey,
        constructor: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Result<()> {
        self.constructors
            .write()
            .map_err(|_| WireformError::Internal("constructor lock poisoned".to_string()))?
            .insert(key, Arc::new(constructor));
        Ok(())
    }

    pub(crate) fn constructor_for(&self, key: &TypeKey) -> Option<Arc<ValueCtor>> {
        self.constructors.read().ok()?.get(key).cloned()
    }

    // --- LOOKUP ---

    pub(crate) fn lookup(&self, key: &TypeKey) -> Result<Arc<Codec>> {
        let key = self.proxied(key)?;
        self.lookup_resolved(&key)
    }

    /// Registry lookup for a key the proxy table has already been applied
    /// to; remapping is never applied recursively.
    pub(crate) fn lookup_resolved(&self, key: &TypeKey) -> Result<Arc<Codec>> {
        self.registry.lookup(self, key)
    }

    /// Apply the type-proxy table to `key`, exactly once.
    pub(crate) fn proxied(&self, key: &TypeKey) -> Result<TypeKey> {
        let proxies = self
            .proxies
            .read()
            .map_err(|_| WireformError::Internal("type proxy lock poisoned".to_string()))?;
        Ok(proxies.get(key).cloned().unwrap_or_else(|| key.clone()))
    }

    /// Resolve a dynamic-type discriminator to its registry key. Container
    /// values under envelopes carry the generic `list`/`map` names with open
    /// element types.
    pub(crate) fn resolve_name(&self, name: &str) -> TypeKey {
        match name {
            "any" => TypeKey::Any,
            "list" | "array" => TypeKey::list(TypeKey::Any),
            "map" => TypeKey::map(TypeKey::Any, TypeKey::Any),
            other => TypeKey::named(other),
        }
    }

    // --- VALUE-LEVEL ENTRY POINTS ---

    /// Encode `value` under the static type `key` onto the sink.
    pub fn encode_value(
        &self,
        key: &TypeKey,
        value: &Value,
        out: &mut dyn Sink,
    ) -> Result<()> {
        slot_codec(self, key)?.encode(self, value, out)
    }

    /// Decode one value of static type `key` from the source.
    pub fn decode_value(&self, key: &TypeKey, input: &mut dyn Source) -> Result<Value> {
        slot_codec(self, key)?.decode(self, input)
    }

    // --- TYPED ENTRY POINTS ---

    /// Encode a reflected value onto the sink.
    pub fn encode<T: Reflect>(&self, value: &T, out: &mut dyn Sink) -> Result<()> {
        T::register(self);
        self.encode_value(&T::type_key(), &value.to_value(), out)
    }

    /// Decode a reflected value from the source.
    pub fn decode<T: Reflect>(&self, input: &mut dyn Source) -> Result<T> {
        T::register(self);
        T::from_value(self.decode_value(&T::type_key(), input)?)
    }

    // --- PER-FORMAT CONVENIENCES ---

    /// Encode to a JSON document value.
    pub fn to_json<T: Reflect>(&self, value: &T) -> Result<serde_json::Value> {
        let mut sink = JsonSink::new();
        self.encode(value, &mut sink)?;
        sink.into_value()
    }

    /// Decode from a JSON document value.
    pub fn from_json<T: Reflect>(&self, document: &serde_json::Value) -> Result<T> {
        let mut source = json::source(document);
        self.decode(&mut source)
    }

    /// Encode as JSON text onto a writer. The writer is flushed on success.
    pub fn write_json<T: Reflect, W: io::Write>(&self, value: &T, writer: W) -> Result<()> {
        let mut sink = JsonStreamSink::new(writer);
        self.encode(value, &mut sink)?;
        sink.finish()
    }

    /// Encode to a JSON string.
    pub fn to_json_string<T: Reflect>(&self, value: &T) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_json(value, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|_| WireformError::Internal("JSON writer produced invalid UTF-8".to_string()))
    }

    /// Decode from JSON text via the event-stream adapter.
    pub fn from_json_str<T: Reflect>(&self, text: &str) -> Result<T> {
        let mut source = json_stream::source(text);
        self.decode(&mut source)
    }

    /// Decode JSON text from a reader.
    pub fn read_json<T: Reflect, R: io::Read>(&self, mut reader: R) -> Result<T> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.from_json_str(&text)
    }

    /// Encode to an XML string under the given root element name.
    pub fn to_xml_string<T: Reflect>(&self, value: &T, root: &str) -> Result<String> {
        let mut sink = XmlSink::new(root);
        self.encode(value, &mut sink)?;
        sink.finish()
    }

    /// Decode from XML text.
    pub fn from_xml_str<T: Reflect>(&self, text: &str) -> Result<T> {
        let mut source = xml::source(text)?;
        self.decode(&mut source)
    }

    /// Encode to the compact tagged binary form.
    pub fn to_bytes<T: Reflect>(&self, value: &T) -> Result<Vec<u8>> {
        let mut sink = BytesSink::new();
        self.encode(value, &mut sink)?;
        Ok(sink.into_vec())
    }

    /// Decode from the compact tagged binary form.
    pub fn from_bytes<T: Reflect>(&self, data: &[u8]) -> Result<T> {
        let mut source = bytes::source(data);
        self.decode(&mut source)
    }

    /// Encode to MessagePack.
    pub fn to_msgpack<T: Reflect>(&self, value: &T) -> Result<Vec<u8>> {
        let mut sink = MsgPackSink::new();
        self.encode(value, &mut sink)?;
        sink.into_vec()
    }

    /// Decode from MessagePack.
    pub fn from_msgpack<T: Reflect>(&self, data: &[u8]) -> Result<T> {
        let mut source = msgpack::source(data)?;
        self.decode(&mut source)
    }

    // --- FILE CONVENIENCES ---

    /// Save a value as a JSON file.
    pub fn save_json<T: Reflect, P: AsRef<Path>>(&self, path: P, value: &T) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_json(value, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a value from a JSON file.
    pub fn load_json<T: Reflect, P: AsRef<Path>>(&self, path: P) -> Result<T> {
        let text = std::fs::read_to_string(path)?;
        self.from_json_str(&text)
    }
}
