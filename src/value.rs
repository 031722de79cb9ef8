//! The dynamic value model.
//!
//! A [`Value`] is the tree the codec core drives through a format adapter.
//! Concrete Rust types reach it through [`Reflect`](crate::reflect::Reflect);
//! callers working with runtime-built type descriptors construct it directly.
//!
//! Object fields and map entries are ordered vectors, not hash maps: the
//! engine guarantees that encoding emits fields in declaration order and map
//! entries in insertion order, and an unordered container cannot keep that
//! promise. Duplicate object field names are legal; they model flattened
//! type hierarchies and are disambiguated on the wire by the object codec.

/// A dynamic value covering every shape the engine can encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null reference.
    Null,
    /// `boolean` primitive.
    Bool(bool),
    /// `byte` primitive.
    I8(i8),
    /// `short` primitive.
    I16(i16),
    /// `int` primitive.
    I32(i32),
    /// `long` primitive.
    I64(i64),
    /// `float` primitive.
    F32(f32),
    /// `double` primitive.
    F64(f64),
    /// `char` primitive; encodes as a one-character string.
    Char(char),
    /// A string.
    Str(String),
    /// An enum constant: `(type name, constant name)`.
    Enum(String, String),
    /// An array or collection. The type system distinguishes arrays from
    /// lists; the value model does not need to.
    Array(Vec<Value>),
    /// A mapping; entry order is preserved through encode and decode.
    Map(Vec<(Value, Value)>),
    /// An object instance with its dynamic type name and ordered fields.
    Object {
        /// The dynamic type name (the name its descriptor is registered under).
        class: String,
        /// Fields in declaration order.
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Build an object value from a class name and ordered fields.
    pub fn object(
        class: impl Into<String>,
        fields: Vec<(String, Value)>,
    ) -> Self {
        Self::Object {
            class: class.into(),
            fields,
        }
    }

    /// Build an enum constant value.
    pub fn enumeration(class: impl Into<String>, constant: impl Into<String>) -> Self {
        Self::Enum(class.into(), constant.into())
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i8.
    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Self::I8(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i16.
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Self::I16(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as char.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Char(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as array/collection elements.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as map entries.
    pub fn as_entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get the first object field with the given name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.field_occurrence(name, 0)
    }

    /// Get the `occurrence`-th object field with the given name (0-based).
    ///
    /// Duplicate names arise from flattened hierarchies; the object codec
    /// addresses each declared field by `(name, occurrence)`.
    pub fn field_occurrence(&self, name: &str, occurrence: usize) -> Option<&Value> {
        match self {
            Self::Object { fields, .. } => fields
                .iter()
                .filter(|(n, _)| n == name)
                .nth(occurrence)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replace the `occurrence`-th field with the given name, or append it.
    ///
    /// Returns `false` when the value is not an object.
    pub fn set_field_occurrence(
        &mut self,
        name: &str,
        occurrence: usize,
        value: Value,
    ) -> bool {
        match self {
            Self::Object { fields, .. } => {
                let slot = fields
                    .iter_mut()
                    .filter(|(n, _)| n == name)
                    .nth(occurrence);
                match slot {
                    Some((_, v)) => *v = value,
                    None => fields.push((name.to_string(), value)),
                }
                true
            }
            _ => false,
        }
    }

    /// The dynamic type name of this value, if it has one.
    ///
    /// Primitives and strings report their canonical names, objects and
    /// enums their class names, containers the generic `list`/`map` names.
    /// `Null` has no dynamic type.
    pub fn dynamic_name(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some("boolean"),
            Self::I8(_) => Some("byte"),
            Self::I16(_) => Some("short"),
            Self::I32(_) => Some("int"),
            Self::I64(_) => Some("long"),
            Self::F32(_) => Some("float"),
            Self::F64(_) => Some("double"),
            Self::Char(_) => Some("char"),
            Self::Str(_) => Some("string"),
            Self::Enum(class, _) => Some(class),
            Self::Array(_) => Some("list"),
            Self::Map(_) => Some("map"),
            Self::Object { class, .. } => Some(class),
        }
    }
}

// Conversions from host scalars; container conversions live in `reflect`.

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::I8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}
