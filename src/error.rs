//! Error taxonomy (§7): compile-time errors, field errors, and the
//! structured error objects that land in a [`Response`](crate::Response).

use derive_more::with_trait::{Display, Error, From};

use crate::{
    parser::SourcePosition,
    path::{PathElement, ResponsePath},
    value::Value,
};

/// An error produced while resolving a single field.
///
/// Both a thrown/panicking resolver and a resolver returning `Err` converge
/// on this type at the executor boundary (§9 "Error-as-value vs exception").
#[derive(Clone, Debug, Display, PartialEq)]
#[display("{message}")]
pub struct FieldError {
    message: String,
    extensions: Value,
}

impl FieldError {
    /// Constructs a new [`FieldError`] with no extensions.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: Value::Null,
        }
    }

    /// Constructs a new [`FieldError`] carrying structured `extensions`.
    pub fn with_extensions(message: impl Into<String>, extensions: Value) -> Self {
        Self {
            message: message.into(),
            extensions,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn extensions(&self) -> &Value {
        &self.extensions
    }
}

impl<T: std::fmt::Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self::new(e.to_string())
    }
}

impl std::error::Error for FieldError {}

/// A single location in the source query a field error is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl From<SourcePosition> for SourceLocation {
    fn from(pos: SourcePosition) -> Self {
        // `SourcePosition` is zero-based; GraphQL error locations are
        // conventionally one-based.
        Self {
            line: pos.line() + 1,
            column: pos.column() + 1,
        }
    }
}

/// An error that occurred while executing a compiled plan, tagged with the
/// response path and source location of the field that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionError {
    message: String,
    locations: Vec<SourceLocation>,
    path: ResponsePath,
    extensions: Value,
}

impl ExecutionError {
    pub fn new(error: FieldError, locations: Vec<SourceLocation>, path: ResponsePath) -> Self {
        Self {
            message: error.message,
            locations,
            path,
            extensions: error.extensions,
        }
    }

    /// Construct a fresh `ExecutionError` for a runtime-detected invariant
    /// (non-null violation, bad iterable, unresolved abstract type, ...)
    /// rather than a resolver-provided [`FieldError`].
    pub fn at(message: impl Into<String>, locations: Vec<SourceLocation>, path: ResponsePath) -> Self {
        Self {
            message: message.into(),
            locations,
            path,
            extensions: Value::Null,
        }
    }

    pub fn path(&self) -> &ResponsePath {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts to the JSON-serializable error object (§6 "Error object").
    pub fn into_object(self) -> ErrorObject {
        ErrorObject {
            message: self.message,
            locations: if self.locations.is_empty() {
                None
            } else {
                Some(self.locations)
            },
            path: self.path.to_vec(),
            extensions: match self.extensions {
                Value::Null => None,
                other => Some(other),
            },
        }
    }
}

/// The wire shape of a single error (§6).
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ErrorObject {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<SourceLocation>>,
    pub path: Vec<PathElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Compile-time and pre-execution errors (§7 "Compile-time errors").
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum CompileError {
    #[display("No operation provided")]
    NoOperation,
    #[display("Unknown operation {_0:?}")]
    UnknownOperation(#[error(not(source))] String),
    #[display("Multiple operations provided; an operationName is required")]
    AmbiguousOperation,
}

impl CompileError {
    /// Renders this error as the single entry of an error-only [`Response`](crate::Response).
    pub fn into_object(self) -> ErrorObject {
        ErrorObject {
            message: self.to_string(),
            locations: None,
            path: Vec::new(),
            extensions: None,
        }
    }
}
