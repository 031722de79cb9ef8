//! Type descriptors: the structural metadata codecs are synthesised from.
//!
//! A [`TypeDescriptor`] is the oracle's answer for a named type. Container
//! shapes (`list<T>`, `map<K,V>`, arrays, optionals) need no descriptor,
//! since their codecs synthesise directly from the key shape; descriptors
//! only exist for objects, enums, abstract types, and the built-in
//! primitives.
//!
//! Descriptors are produced either at compile time by
//! `#[derive(WireformObject)]` or at runtime through [`TypeDescriptorBuilder`].
//! The registry caches the first view of a type; reporting different fields
//! for the same name later is undefined behavior by contract.

use crate::key::TypeKey;

/// The eight primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Bool,
    /// `byte`
    I8,
    /// `short`
    I16,
    /// `int`
    I32,
    /// `long`
    I64,
    /// `float`
    F32,
    /// `double`
    F64,
    /// `char`
    Char,
}

impl PrimitiveKind {
    /// The canonical wire name of this primitive.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::I8 => "byte",
            Self::I16 => "short",
            Self::I32 => "int",
            Self::I64 => "long",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Char => "char",
        }
    }

    /// Resolve a canonical wire name back to its primitive kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Bool),
            "byte" => Some(Self::I8),
            "short" => Some(Self::I16),
            "int" => Some(Self::I32),
            "long" => Some(Self::I64),
            "float" => Some(Self::F32),
            "double" => Some(Self::F64),
            "char" => Some(Self::Char),
            _ => None,
        }
    }
}

/// The structural kind of a described type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// One of the eight primitives.
    Primitive(PrimitiveKind),
    /// An enumeration with its ordered constant names.
    Enum(Vec<String>),
    /// An object with its ordered fields. Inherited fields precede the
    /// declaring type's own fields; name collisions are resolved on the wire
    /// by the object codec, not here.
    Object(Vec<FieldDescriptor>),
    /// An abstract or open type: values under it always travel in a
    /// dynamic-type envelope and the type itself cannot be instantiated.
    Abstract,
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// The canonical type name (registry key).
    pub name: String,
    /// The structural kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Create a descriptor from name and kind.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create an object descriptor.
    pub fn object(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(name, TypeKind::Object(fields))
    }

    /// Create an enum descriptor.
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        constants: Vec<S>,
    ) -> Self {
        Self::new(
            name,
            TypeKind::Enum(constants.into_iter().map(Into::into).collect()),
        )
    }

    /// Create an abstract-type descriptor.
    pub fn abstract_type(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Abstract)
    }

    /// Get fields if this is an object descriptor.
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match &self.kind {
            TypeKind::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get a field by declared name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields()?.iter().find(|f| f.name == name)
    }
}

/// Field metadata for object members.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Declared field name. Duplicates across a flattened hierarchy are
    /// permitted and disambiguated on the wire.
    pub name: String,
    /// The field's declared static type.
    pub ty: TypeKey,
}

impl FieldDescriptor {
    /// Create a field descriptor.
    pub fn new(name: impl Into<String>, ty: TypeKey) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Fluent builder for object descriptors.
///
/// ```rust
/// use wireform::{TypeDescriptorBuilder, TypeKey};
///
/// let desc = TypeDescriptorBuilder::new("SensorReading")
///     .field("sensor_id", TypeKey::int())
///     .field("temperature", TypeKey::double())
///     .field("label", TypeKey::string())
///     .build();
/// assert_eq!(desc.fields().map(<[_]>::len), Some(3));
/// ```
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptorBuilder {
    /// Start building an object descriptor with the given type name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field. Fields encode in the order they are appended.
    pub fn field(mut self, name: impl Into<String>, ty: TypeKey) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::object(self.name, self.fields)
    }
}
