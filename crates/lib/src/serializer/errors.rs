//! Error types for tree (de)serialization.

use thiserror::Error;

/// Structured error types for object/tree conversion.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SerializerError {
    /// A required property had neither a value on the tree nor a declared
    /// default. Always fatal for the whole record.
    #[error("required property '{property}' of class '{class}' has no value and no default")]
    ValidationFailed { class: String, property: String },

    /// A record node was expected but something else was found.
    #[error("expected a record node for class '{class}', found {actual}")]
    NotARecord { class: String, actual: String },
}

impl SerializerError {
    /// Check if this error is a validation failure.
    pub fn is_validation_failed(&self) -> bool {
        matches!(self, SerializerError::ValidationFailed { .. })
    }
}

// Conversion from SerializerError to the main Error type
impl From<SerializerError> for crate::Error {
    fn from(err: SerializerError) -> Self {
        crate::Error::Serializer(err)
    }
}
