//! Canonical type identity.
//!
//! A [`TypeKey`] names a *type expression*: a simple named type, a nullable
//! wrapper, a container shape over further keys, or the open `Any` type.
//! Equality is structural, and the key doubles as the codec-registry key.
//!
//! The eight primitive types and `string` are addressed by their canonical
//! names (`boolean`, `byte`, `char`, `short`, `int`, `long`, `float`,
//! `double`, `string`); user-defined objects, enums and abstract types by the
//! name their descriptor was registered under.

use std::fmt;

/// Structural identity of a type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// A simple type addressed by canonical name: a primitive, `string`,
    /// or a registered object/enum/abstract type.
    Named(String),
    /// A nullable slot over the inner type (the boxed-primitive analogue).
    Optional(Box<TypeKey>),
    /// A fixed-shape array of the element type.
    Array(Box<TypeKey>),
    /// A growable collection of the element type.
    List(Box<TypeKey>),
    /// A key/value mapping.
    Map(Box<TypeKey>, Box<TypeKey>),
    /// The open static type: every value under it travels in an envelope.
    Any,
}

impl TypeKey {
    /// Key for a simple named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Nullable wrapper over `inner`.
    pub fn optional(inner: TypeKey) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Array of `elem`.
    pub fn array(elem: TypeKey) -> Self {
        Self::Array(Box::new(elem))
    }

    /// Collection of `elem`.
    pub fn list(elem: TypeKey) -> Self {
        Self::List(Box::new(elem))
    }

    /// Mapping from `key` to `value`.
    pub fn map(key: TypeKey, value: TypeKey) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// The canonical `boolean` key.
    pub fn boolean() -> Self {
        Self::named("boolean")
    }

    /// The canonical `byte` key.
    pub fn byte() -> Self {
        Self::named("byte")
    }

    /// The canonical `char` key.
    pub fn char() -> Self {
        Self::named("char")
    }

    /// The canonical `short` key.
    pub fn short() -> Self {
        Self::named("short")
    }

    /// The canonical `int` key.
    pub fn int() -> Self {
        Self::named("int")
    }

    /// The canonical `long` key.
    pub fn long() -> Self {
        Self::named("long")
    }

    /// The canonical `float` key.
    pub fn float() -> Self {
        Self::named("float")
    }

    /// The canonical `double` key.
    pub fn double() -> Self {
        Self::named("double")
    }

    /// The canonical `string` key.
    pub fn string() -> Self {
        Self::named("string")
    }

    /// The canonical display form of this key.
    ///
    /// Container keys render with angle-bracketed element names; the form is
    /// diagnostic only and never emitted on the wire (container values under
    /// a dynamic envelope carry the generic names `list` and `map`).
    pub fn canonical_name(&self) -> String {
        match self {
            Self::Named(n) => n.clone(),
            Self::Optional(inner) => inner.canonical_name(),
            Self::Array(e) => format!("array<{}>", e.canonical_name()),
            Self::List(e) => format!("list<{}>", e.canonical_name()),
            Self::Map(k, v) => {
                format!("map<{},{}>", k.canonical_name(), v.canonical_name())
            }
            Self::Any => "any".to_string(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}
