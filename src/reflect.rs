//! The typed bridge between concrete Rust values and the dynamic value model.
//!
//! A type implementing [`Reflect`] knows its [`TypeKey`], can register its
//! descriptor (and those of its field types) with an engine, and converts to
//! and from [`Value`]. The `#[derive(WireformObject)]` macro implements this
//! trait for user structs and unit enums; the implementations here cover the
//! primitives and the standard containers.

use crate::api::Wireform;
use crate::error::{Result, WireformError};
use crate::key::TypeKey;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

/// Conversion between a concrete Rust type and the dynamic value model.
pub trait Reflect: Sized {
    /// The static type key this Rust type encodes under.
    fn type_key() -> TypeKey;

    /// Register this type's descriptor (and its dependencies) with the
    /// engine. Idempotent; a no-op for built-in types.
    fn register(engine: &Wireform) {
        let _ = engine;
    }

    /// Convert to a dynamic value.
    fn to_value(&self) -> Value;

    /// Convert back from a dynamic value.
    fn from_value(value: Value) -> Result<Self>;
}

/// Conversion failure helper shared with the derive macro.
#[doc(hidden)]
pub fn conversion_error(expected: &str, found: &Value) -> WireformError {
    WireformError::StructuralMismatch(format!(
        "cannot convert a {} value into {expected}",
        found.dynamic_name().unwrap_or("null")
    ))
}

/// Remove and return the first field named `name`, or `Value::Null` when
/// absent. Used by generated `from_value` implementations.
#[doc(hidden)]
pub fn take_field(fields: &mut Vec<(String, Value)>, name: &str) -> Value {
    match fields.iter().position(|(n, _)| n == name) {
        Some(index) => fields.remove(index).1,
        None => Value::Null,
    }
}

macro_rules! impl_reflect_primitive {
    ($($t:ty => $variant:ident, $key:ident);* $(;)?) => {
        $(
            impl Reflect for $t {
                fn type_key() -> TypeKey {
                    TypeKey::$key()
                }

                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(conversion_error(stringify!($t), &other)),
                    }
                }
            }
        )*
    }
}

impl_reflect_primitive!(
    bool => Bool, boolean;
    i8 => I8, byte;
    i16 => I16, short;
    i32 => I32, int;
    i64 => I64, long;
    f32 => F32, float;
    f64 => F64, double;
    char => Char, char;
);

impl Reflect for String {
    fn type_key() -> TypeKey {
        TypeKey::string()
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(conversion_error("String", &other)),
        }
    }
}

/// `Value` reflects as the open type: anything it holds travels in a
/// dynamic-type envelope.
impl Reflect for Value {
    fn type_key() -> TypeKey {
        TypeKey::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_key() -> TypeKey {
        TypeKey::optional(T::type_key())
    }

    fn register(engine: &Wireform) {
        T::register(engine);
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn register(engine: &Wireform) {
        T::register(engine);
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_key() -> TypeKey {
        TypeKey::list(T::type_key())
    }

    fn register(engine: &Wireform) {
        T::register(engine);
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Reflect::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(conversion_error("Vec", &other)),
        }
    }
}

impl<T: Reflect + Ord> Reflect for BTreeSet<T> {
    fn type_key() -> TypeKey {
        TypeKey::list(T::type_key())
    }

    fn register(engine: &Wireform) {
        T::register(engine);
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Reflect::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(conversion_error("BTreeSet", &other)),
        }
    }
}

impl<K: Reflect + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_key() -> TypeKey {
        TypeKey::map(K::type_key(), V::type_key())
    }

    fn register(engine: &Wireform) {
        K::register(engine);
        V::register(engine);
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(conversion_error("BTreeMap", &other)),
        }
    }
}

impl<K: Reflect + Eq + Hash, V: Reflect> Reflect for HashMap<K, V> {
    fn type_key() -> TypeKey {
        TypeKey::map(K::type_key(), V::type_key())
    }

    fn register(engine: &Wireform) {
        K::register(engine);
        V::register(engine);
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(conversion_error("HashMap", &other)),
        }
    }
}
