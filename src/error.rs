//! Centralized error handling for Wireform.
//!
//! All failure conditions are propagated through the [`Result`] type; the
//! library never panics on malformed input (enforced by clippy lints at the
//! crate root).
//!
//! ## Error Categories
//!
//! Errors are categorized by their domain:
//!
//! - **I/O Errors** ([`WireformError::Io`]): failures of the underlying reader/writer
//! - **Malformed Input** ([`WireformError::MalformedInput`]): the adapter produced an
//!   event the codec did not expect (e.g. a scalar where an object was required)
//! - **Malformed Scalar** ([`WireformError::MalformedScalar`]): a scalar violated its
//!   value constraints (multi-character `char`, integer overflow, non-finite float
//!   in a text format)
//! - **Unknown Type** ([`WireformError::UnknownType`]): a dynamic-type discriminator
//!   could not be resolved to a registered type
//! - **Unknown Enum Constant** ([`WireformError::UnknownEnumConstant`]): an enum name
//!   was not found in its descriptor
//! - **Missing Constructor** ([`WireformError::MissingConstructor`]): nothing to
//!   instantiate for an abstract type decoded without an envelope
//! - **Structural Mismatch** ([`WireformError::StructuralMismatch`]): a value did not
//!   fit the shape its codec expected (wrong variant, missing field)
//! - **Internal Errors** ([`WireformError::Internal`]): logic errors (should not occur
//!   in production)
//!
//! A codec either completes the structural unit it started or fails outright;
//! partial output already written to a sink must be discarded by the caller.
//!
//! ## Usage
//!
//! ```rust
//! use wireform::WireformError;
//!
//! fn report(err: &WireformError) {
//!     match err {
//!         WireformError::UnknownType(name) => eprintln!("unknown type: {name}"),
//!         other => eprintln!("{other}"),
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Wireform operations.
pub type Result<T> = std::result::Result<T, WireformError>;

/// The master error enum covering all failure domains in Wireform.
///
/// Message payloads embed the adapter's `location()` string where one was
/// available at the point of failure.
///
/// This type is `Clone` to support error sharing across threads; I/O causes
/// are wrapped in `Arc` to make cloning cheap.
#[derive(Debug, Clone)]
pub enum WireformError {
    /// Low-level I/O failure from the underlying reader or writer.
    Io(Arc<io::Error>),

    /// The adapter reported an event inconsistent with the codec's
    /// expectation (e.g. a scalar where an object was expected).
    MalformedInput(String),

    /// A scalar violated its decode-time value constraints: a `char`
    /// that is not exactly one character, an integer outside its declared
    /// width, or a non-finite float in a format that cannot carry one.
    MalformedScalar(String),

    /// A dynamic-type envelope named a type this engine does not know.
    UnknownType(String),

    /// An enum constant name was not found in the enum's descriptor.
    UnknownEnumConstant(String),

    /// No registered or derived constructor exists for the type being decoded.
    MissingConstructor(String),

    /// A value did not match the shape its codec expected: wrong variant,
    /// a field the descriptor declares but the value lacks, or a writer
    /// rejecting a decoded field.
    StructuralMismatch(String),

    /// Logic error in the registry or codec machinery.
    ///
    /// This should not occur in production. If you encounter it, it likely
    /// indicates a bug in the library; please report it with a minimal
    /// reproduction case.
    Internal(String),
}

impl fmt::Display for WireformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::MalformedInput(s) => write!(f, "Malformed Input: {s}"),
            Self::MalformedScalar(s) => write!(f, "Malformed Scalar: {s}"),
            Self::UnknownType(s) => write!(f, "Unknown Type: {s}"),
            Self::UnknownEnumConstant(s) => write!(f, "Unknown Enum Constant: {s}"),
            Self::MissingConstructor(s) => write!(f, "Missing Constructor: {s}"),
            Self::StructuralMismatch(s) => write!(f, "Structural Mismatch: {s}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for WireformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WireformError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
