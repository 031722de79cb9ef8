//! The codec model: a tagged variant per codec family with uniform dispatch.
//!
//! Every codec is one of a small set of shapes: a primitive leaf, a string
//! leaf, a synthesised enum/collection/map/object codec, the null-tolerant
//! layer, the dynamic-type dispatcher, a user-supplied custom or
//! string-proxy codec, or a forwarding reference that breaks cycles during
//! synthesis. Encode and decode are single `match` dispatches driving the
//! format adapter; the engine reference is threaded through so the dynamic
//! dispatcher can resolve codecs for runtime types on the fly.
//!
//! Primitive leaf codecs are null-unsafe by design: they cannot produce or
//! tolerate null. Reference-typed slots are wrapped in [`Codec::Nullable`]
//! (and, where a dynamic type can differ from the static one, in
//! [`Codec::Dynamic`]) by the synthesiser.

use crate::adapter::{Event, Sink, Source};
use crate::api::Wireform;
use crate::descriptor::PrimitiveKind;
use crate::error::{Result, WireformError};
use crate::value::Value;
use std::sync::{Arc, OnceLock};

/// A user-supplied codec, registered with
/// [`Wireform::register_codec`](crate::Wireform::register_codec).
///
/// Custom codecs take precedence over synthesis and may drive the adapter
/// however they like, as long as they read or write exactly one structural
/// unit per call.
pub trait CustomCodec: Send + Sync {
    /// Encode `value` onto the sink.
    fn encode(&self, engine: &Wireform, value: &Value, out: &mut dyn Sink) -> Result<()>;
    /// Decode one value from the source.
    fn decode(&self, engine: &Wireform, input: &mut dyn Source) -> Result<Value>;
}

/// Produces the decode accumulator for a synthesised codec.
pub(crate) type ValueCtor = dyn Fn() -> Value + Send + Sync;

/// One field of an object plan.
pub(crate) struct FieldPlan {
    /// Declared field name.
    pub name: String,
    /// Wire name: the declared name, `*`-prefixed per collision.
    pub wire: String,
    /// Which occurrence of `name` this plan addresses (collisions only).
    pub occurrence: usize,
    /// The field's slot codec (null/dynamic wrapping already applied).
    pub codec: Arc<Codec>,
}

/// A synthesised object codec.
pub(crate) struct ObjectPlan {
    pub class: String,
    pub fields: Vec<FieldPlan>,
    pub constructor: Arc<ValueCtor>,
}

impl ObjectPlan {
    fn field_by_wire(&self, wire: &str) -> Option<&FieldPlan> {
        self.fields.iter().find(|f| f.wire == wire)
    }
}

/// A synthesised enum codec.
pub(crate) struct EnumPlan {
    pub class: String,
    pub constants: Vec<String>,
}

/// A synthesised collection codec.
pub(crate) struct ListPlan {
    pub elem: Arc<Codec>,
    pub constructor: Option<Arc<ValueCtor>>,
}

/// How map keys travel on the wire.
pub(crate) enum MapKeyMode {
    /// Keys are strings: the map is a plain object.
    StringKeys,
    /// Keys round-trip through a registered string proxy: object form on
    /// encode, both forms tolerated on decode.
    Proxied(Arc<StringProxyPlan>),
    /// Arbitrary keys: an array of two-field entry objects.
    Entries,
}

/// A synthesised map codec.
pub(crate) struct MapPlan {
    pub key: Arc<Codec>,
    pub value: Arc<Codec>,
    pub mode: MapKeyMode,
    pub constructor: Option<Arc<ValueCtor>>,
}

/// A codec that round-trips a value through its string representation.
pub(crate) struct StringProxyPlan {
    pub to_text: Box<dyn Fn(&Value) -> Result<String> + Send + Sync>,
    pub from_text: Box<dyn Fn(&str) -> Result<Value> + Send + Sync>,
}

/// A late-bound indirection used during synthesis to break cyclic type
/// graphs. Resolved exactly once; publication is release/acquire so readers
/// never observe a half-initialised cell.
#[derive(Clone)]
pub(crate) struct ForwardCell {
    cell: Arc<OnceLock<Arc<Codec>>>,
}

impl ForwardCell {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Fill the cell with its computed target.
    pub(crate) fn resolve(&self, codec: Arc<Codec>) -> Result<()> {
        self.cell.set(codec).map_err(|_| {
            WireformError::Internal("forwarding reference resolved twice".to_string())
        })
    }

    fn target(&self) -> Result<&Arc<Codec>> {
        self.cell.get().ok_or_else(|| {
            WireformError::Internal(
                "forwarding reference invoked before resolution".to_string(),
            )
        })
    }
}

/// The codec variant set.
pub(crate) enum Codec {
    /// Null-unsafe leaf for one of the eight primitives.
    Primitive(PrimitiveKind),
    /// String leaf.
    Str,
    /// Enum constants by name.
    Enum(Arc<EnumPlan>),
    /// Collection / array of an element slot codec.
    List(Arc<ListPlan>),
    /// Map with one of three key modes.
    Map(Arc<MapPlan>),
    /// Object with ordered field plans.
    Object(Arc<ObjectPlan>),
    /// Null-tolerant layer over a reference-typed codec.
    Nullable(Arc<Codec>),
    /// Dynamic-type dispatcher: envelopes values whose runtime type differs
    /// from the static type `class`.
    Dynamic {
        class: String,
        inner: Arc<Codec>,
    },
    /// An abstract or open static type: values always travel in envelopes.
    /// `class` is `None` for the `any` type itself.
    Abstract { class: Option<String> },
    /// User-registered string-proxy codec.
    StringProxy(Arc<StringProxyPlan>),
    /// User-registered custom codec.
    Custom(Arc<dyn CustomCodec>),
    /// Cycle-breaking forwarding reference.
    Forward(ForwardCell),
}

impl Codec {
    /// Encode one value onto the sink.
    pub(crate) fn encode(
        &self,
        engine: &Wireform,
        value: &Value,
        out: &mut dyn Sink,
    ) -> Result<()> {
        match self {
            Self::Primitive(kind) => encode_primitive(*kind, value, out),
            Self::Str => match value {
                Value::Str(s) => out.write_str(s),
                other => Err(mismatch("string", other)),
            },
            Self::Enum(plan) => match value {
                Value::Enum(_, constant) => {
                    if plan.constants.iter().any(|c| c == constant) {
                        out.write_str(constant)
                    } else {
                        Err(WireformError::StructuralMismatch(format!(
                            "'{constant}' is not a constant of enum {}",
                            plan.class
                        )))
                    }
                }
                other => Err(mismatch(&plan.class, other)),
            },
            Self::List(plan) => match value {
                Value::Array(items) => {
                    out.start_array()?;
                    for item in items {
                        plan.elem.encode(engine, item, out)?;
                    }
                    out.end_array()
                }
                other => Err(mismatch("array", other)),
            },
            Self::Map(plan) => encode_map(engine, plan, value, out),
            Self::Object(plan) => encode_object(engine, plan, value, out),
            Self::Nullable(inner) => {
                if value.is_null() {
                    out.write_null()
                } else {
                    inner.encode(engine, value, out)
                }
            }
            Self::Dynamic { class, inner } => match value.dynamic_name() {
                Some(dynamic) if dynamic != class.as_str() => {
                    encode_envelope(engine, dynamic, value, out)
                }
                _ => inner.encode(engine, value, out),
            },
            Self::Abstract { .. } => {
                if value.is_null() {
                    return out.write_null();
                }
                let dynamic = value.dynamic_name().ok_or_else(|| {
                    WireformError::StructuralMismatch(
                        "value has no dynamic type".to_string(),
                    )
                })?;
                let dynamic = dynamic.to_string();
                encode_envelope(engine, &dynamic, value, out)
            }
            Self::StringProxy(plan) => out.write_str(&(plan.to_text)(value)?),
            Self::Custom(codec) => codec.encode(engine, value, out),
            Self::Forward(cell) => cell.target()?.encode(engine, value, out),
        }
    }

    /// Decode one value from the source.
    pub(crate) fn decode(
        &self,
        engine: &Wireform,
        input: &mut dyn Source,
    ) -> Result<Value> {
        match self {
            Self::Primitive(kind) => decode_primitive(*kind, input),
            Self::Str => Ok(Value::Str(input.read_str()?)),
            Self::Enum(plan) => {
                let constant = input.read_str()?;
                if plan.constants.iter().any(|c| c == &constant) {
                    Ok(Value::Enum(plan.class.clone(), constant))
                } else {
                    Err(WireformError::UnknownEnumConstant(format!(
                        "'{constant}' is not a constant of enum {} at {}",
                        plan.class,
                        input.location()
                    )))
                }
            }
            Self::List(plan) => decode_list(engine, plan, input),
            Self::Map(plan) => decode_map(engine, plan, input),
            Self::Object(plan) => decode_object(engine, plan, input),
            Self::Nullable(inner) => {
                if matches!(input.event(0)?, Event::Null) {
                    input.read_null()?;
                    Ok(Value::Null)
                } else {
                    inner.decode(engine, input)
                }
            }
            Self::Dynamic { inner, .. } => {
                if is_envelope(engine, input)? {
                    decode_envelope(engine, input)
                } else {
                    inner.decode(engine, input)
                }
            }
            Self::Abstract { class } => {
                if matches!(input.event(0)?, Event::Null) {
                    input.read_null()?;
                    return Ok(Value::Null);
                }
                if is_envelope(engine, input)? {
                    decode_envelope(engine, input)
                } else {
                    match class {
                        Some(name) => Err(WireformError::MissingConstructor(format!(
                            "abstract type {name} cannot be instantiated without a \
                             type envelope at {}",
                            input.location()
                        ))),
                        None => Err(WireformError::MalformedInput(format!(
                            "a value under the open type requires a type envelope \
                             at {}",
                            input.location()
                        ))),
                    }
                }
            }
            Self::StringProxy(plan) => {
                let text = input.read_str()?;
                (plan.from_text)(&text)
            }
            Self::Custom(codec) => codec.decode(engine, input),
            Self::Forward(cell) => cell.target()?.decode(engine, input),
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> WireformError {
    WireformError::StructuralMismatch(format!(
        "expected a {expected} value, found {}",
        found.dynamic_name().unwrap_or("null")
    ))
}

fn encode_primitive(kind: PrimitiveKind, value: &Value, out: &mut dyn Sink) -> Result<()> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(v)) => out.write_bool(*v),
        (PrimitiveKind::I8, Value::I8(v)) => out.write_i8(*v),
        (PrimitiveKind::I16, Value::I16(v)) => out.write_i16(*v),
        (PrimitiveKind::I32, Value::I32(v)) => out.write_i32(*v),
        (PrimitiveKind::I64, Value::I64(v)) => out.write_i64(*v),
        (PrimitiveKind::F32, Value::F32(v)) => out.write_f32(*v),
        (PrimitiveKind::F64, Value::F64(v)) => out.write_f64(*v),
        (PrimitiveKind::Char, Value::Char(v)) => out.write_char(*v),
        (kind, other) => Err(mismatch(kind.name(), other)),
    }
}

fn decode_primitive(kind: PrimitiveKind, input: &mut dyn Source) -> Result<Value> {
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(input.read_bool()?),
        PrimitiveKind::I8 => Value::I8(input.read_i8()?),
        PrimitiveKind::I16 => Value::I16(input.read_i16()?),
        PrimitiveKind::I32 => Value::I32(input.read_i32()?),
        PrimitiveKind::I64 => Value::I64(input.read_i64()?),
        PrimitiveKind::F32 => Value::F32(input.read_f32()?),
        PrimitiveKind::F64 => Value::F64(input.read_f64()?),
        PrimitiveKind::Char => Value::Char(input.read_char()?),
    })
}

/// Emit the two-field `{type, value}` envelope for a value whose dynamic
/// type is `dynamic`. The type field always comes first.
fn encode_envelope(
    engine: &Wireform,
    dynamic: &str,
    value: &Value,
    out: &mut dyn Sink,
) -> Result<()> {
    let codec = engine.lookup(&engine.resolve_name(dynamic))?;
    if matches!(&*codec, Codec::Abstract { .. }) {
        return Err(WireformError::StructuralMismatch(format!(
            "dynamic type {dynamic} is abstract and cannot be encoded directly"
        )));
    }
    let config = engine.config();
    out.start_object()?;
    out.field(&config.type_field)?;
    out.write_str(config.wire_name(dynamic))?;
    out.field(&config.value_field)?;
    codec.encode(engine, value, out)?;
    out.end_object()
}

/// Recognise a dynamic-type envelope without consuming anything.
///
/// The envelope is exactly two fields, type first: object start, the type
/// field name, a string, then the value field name (events 0 through 3).
/// A literal field named like the type field whose companion is anything
/// else is *not* an envelope and falls through to the inner codec.
fn is_envelope(engine: &Wireform, input: &mut dyn Source) -> Result<bool> {
    let config = engine.config();
    if !matches!(input.event(0)?, Event::StartObject) {
        return Ok(false);
    }
    if !matches!(input.event(1)?, Event::Field(name) if *name == config.type_field) {
        return Ok(false);
    }
    if !matches!(input.event(2)?, Event::Str(_)) {
        return Ok(false);
    }
    Ok(matches!(input.event(3)?, Event::Field(name) if *name == config.value_field))
}

/// Consume an envelope: resolve the discriminator, decode the payload with
/// the resolved codec, and require the object to close right after it.
fn decode_envelope(engine: &Wireform, input: &mut dyn Source) -> Result<Value> {
    let config = engine.config();
    input.start_object()?;
    input.expect_field(&config.type_field)?;
    let wire_name = input.read_str()?;
    let class = config.class_for(&wire_name).to_string();
    let codec = engine.lookup(&engine.resolve_name(&class))?;
    input.expect_field(&config.value_field)?;
    let value = codec.decode(engine, input)?;
    input.end_object()?;
    Ok(value)
}

fn encode_object(
    engine: &Wireform,
    plan: &ObjectPlan,
    value: &Value,
    out: &mut dyn Sink,
) -> Result<()> {
    if !matches!(value, Value::Object { .. }) {
        return Err(mismatch(&plan.class, value));
    }
    out.start_object()?;
    for field in &plan.fields {
        let field_value = value
            .field_occurrence(&field.name, field.occurrence)
            .ok_or_else(|| {
                WireformError::StructuralMismatch(format!(
                    "object of type {} is missing field '{}'",
                    plan.class, field.name
                ))
            })?;
        out.field(&field.wire)?;
        field.codec.encode(engine, field_value, out)?;
    }
    out.end_object()
}

fn decode_object(
    engine: &Wireform,
    plan: &ObjectPlan,
    input: &mut dyn Source,
) -> Result<Value> {
    input.start_object()?;
    let mut accumulator = (plan.constructor)();
    while !matches!(input.event(0)?, Event::EndObject) {
        let wire_name = input.read_field_name()?;
        match plan.field_by_wire(&wire_name) {
            Some(field) => {
                let field_value = field.codec.decode(engine, input)?;
                if !accumulator.set_field_occurrence(
                    &field.name,
                    field.occurrence,
                    field_value,
                ) {
                    return Err(WireformError::Internal(format!(
                        "constructor for {} did not produce an object",
                        plan.class
                    )));
                }
            }
            None if engine.config().fail_on_unknown_fields => {
                return Err(WireformError::MalformedInput(format!(
                    "unknown field '{wire_name}' in {} at {}",
                    plan.class,
                    input.location()
                )));
            }
            None => {
                log::trace!("skipping unknown field '{wire_name}' in {}", plan.class);
                input.skip_node()?;
            }
        }
    }
    input.end_object()?;
    Ok(accumulator)
}

fn decode_list(engine: &Wireform, plan: &ListPlan, input: &mut dyn Source) -> Result<Value> {
    input.start_array()?;
    let mut accumulator = match &plan.constructor {
        Some(ctor) => ctor(),
        None => Value::Array(Vec::new()),
    };
    let Value::Array(items) = &mut accumulator else {
        return Err(WireformError::Internal(
            "collection constructor did not produce an array".to_string(),
        ));
    };
    while !matches!(input.event(0)?, Event::EndArray) {
        items.push(plan.elem.decode(engine, input)?);
    }
    input.end_array()?;
    Ok(accumulator)
}

fn encode_map(
    engine: &Wireform,
    plan: &MapPlan,
    value: &Value,
    out: &mut dyn Sink,
) -> Result<()> {
    let entries = value.as_entries().ok_or_else(|| mismatch("map", value))?;
    match &plan.mode {
        MapKeyMode::StringKeys => {
            out.start_object()?;
            for (key, val) in entries {
                let Value::Str(name) = key else {
                    return Err(WireformError::StructuralMismatch(
                        "string-keyed map entry has a non-string key".to_string(),
                    ));
                };
                out.field(name)?;
                plan.value.encode(engine, val, out)?;
            }
            out.end_object()
        }
        MapKeyMode::Proxied(proxy) => {
            out.start_object()?;
            for (key, val) in entries {
                out.field(&(proxy.to_text)(key)?)?;
                plan.value.encode(engine, val, out)?;
            }
            out.end_object()
        }
        MapKeyMode::Entries => {
            let config = engine.config();
            out.start_array()?;
            for (key, val) in entries {
                out.start_object()?;
                out.field(&config.key_field)?;
                plan.key.encode(engine, key, out)?;
                out.field(&config.value_field)?;
                plan.value.encode(engine, val, out)?;
                out.end_object()?;
            }
            out.end_array()
        }
    }
}

fn decode_map(engine: &Wireform, plan: &MapPlan, input: &mut dyn Source) -> Result<Value> {
    match &plan.mode {
        MapKeyMode::StringKeys => {
            decode_map_object(engine, plan, input, |name| Ok(Value::Str(name)))
        }
        MapKeyMode::Proxied(proxy) => {
            // A proxied key codec makes the object schema readable; the
            // two-field entry schema stays accepted for foreign writers.
            if matches!(input.event(0)?, Event::StartArray) {
                decode_map_entries(engine, plan, input)
            } else {
                decode_map_object(engine, plan, input, |name| (proxy.from_text)(&name))
            }
        }
        MapKeyMode::Entries => decode_map_entries(engine, plan, input),
    }
}

fn map_accumulator(plan: &MapPlan) -> Result<Value> {
    let accumulator = match &plan.constructor {
        Some(ctor) => ctor(),
        None => Value::Map(Vec::new()),
    };
    if matches!(accumulator, Value::Map(_)) {
        Ok(accumulator)
    } else {
        Err(WireformError::Internal(
            "map constructor did not produce a map".to_string(),
        ))
    }
}

fn decode_map_object(
    engine: &Wireform,
    plan: &MapPlan,
    input: &mut dyn Source,
    mut key_of: impl FnMut(String) -> Result<Value>,
) -> Result<Value> {
    input.start_object()?;
    let mut accumulator = map_accumulator(plan)?;
    let Value::Map(entries) = &mut accumulator else {
        return Err(WireformError::Internal("map accumulator lost".to_string()));
    };
    while !matches!(input.event(0)?, Event::EndObject) {
        let name = input.read_field_name()?;
        let key = key_of(name)?;
        let value = plan.value.decode(engine, input)?;
        entries.push((key, value));
    }
    input.end_object()?;
    Ok(accumulator)
}

fn decode_map_entries(
    engine: &Wireform,
    plan: &MapPlan,
    input: &mut dyn Source,
) -> Result<Value> {
    let config = engine.config();
    input.start_array()?;
    let mut accumulator = map_accumulator(plan)?;
    let Value::Map(entries) = &mut accumulator else {
        return Err(WireformError::Internal("map accumulator lost".to_string()));
    };
    while !matches!(input.event(0)?, Event::EndArray) {
        input.start_object()?;
        let first = input.read_field_name()?;
        let (key, value) = if first == config.key_field {
            let key = plan.key.decode(engine, input)?;
            input.expect_field(&config.value_field)?;
            let value = plan.value.decode(engine, input)?;
            (key, value)
        } else if first == config.value_field {
            let value = plan.value.decode(engine, input)?;
            input.expect_field(&config.key_field)?;
            let key = plan.key.decode(engine, input)?;
            (key, value)
        } else {
            return Err(WireformError::MalformedInput(format!(
                "map entry field must be '{}' or '{}', found '{first}' at {}",
                config.key_field,
                config.value_field,
                input.location()
            )));
        };
        input.end_object()?;
        entries.push((key, value));
    }
    input.end_array()?;
    Ok(accumulator)
}
