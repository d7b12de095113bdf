//! Error types for the reflection engine.

use thiserror::Error;

/// Unified error enumeration for all reflection failures.
///
/// Every error carries the offending name plus whatever context the caller
/// needs to diagnose it: not-found errors list what *is* registered, mismatch
/// errors carry the expected and actual descriptions.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("type '{0}' is not registered")]
    TypeNotRegistered(String),

    #[error("no object is bound to type '{0}'")]
    NotBound(String),

    #[error("property '{property}' not found on type '{type_name}'; available: [{}]", .available.join(", "))]
    PropertyNotFound {
        type_name: String,
        property: String,
        available: Vec<String>,
    },

    #[error("property '{property}' type mismatch: expected '{expected}', got '{actual}'")]
    PropertyTypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    #[error("method '{method}' not found on type '{type_name}'; available: [{}]", .available.join(", "))]
    MethodNotFound {
        type_name: String,
        method: String,
        available: Vec<String>,
    },

    #[error("method '{method}' signature mismatch: expected {expected}, got {actual}")]
    SignatureMismatch {
        method: String,
        expected: String,
        actual: String,
    },

    #[error("no constructor of type '{type_name}' accepts {arity} argument(s)")]
    ConstructorNotFound { type_name: String, arity: usize },

    #[error("cast failed: expected '{expected}', got '{actual}'")]
    BadCast { expected: String, actual: String },
}

/// Convenience alias for fallible reflection operations.
pub type ReflectResult<T> = Result<T, ReflectError>;
