//! Error types for type-adapter resolution and conversion.

use thiserror::Error;

/// Structured error types for adapter dispatch and node conversion.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No adapter is resolvable for a property's type. This is a
    /// configuration-time defect: it aborts the whole operation and is
    /// never retried.
    #[error("no type adapter resolvable for '{type_name}'")]
    NotFound { type_name: String },

    /// The adapter supports only one conversion direction.
    #[error("type '{type_name}' is not serializable: {reason}")]
    Unserializable { type_name: String, reason: String },

    /// A node had the wrong shape for the adapter even after
    /// normalization.
    #[error("malformed node for property '{property}': expected {expected}, found {actual}")]
    MalformedNode {
        property: String,
        expected: String,
        actual: String,
    },

    /// An enum node named a variant (or ordinal) the property does not
    /// declare.
    #[error("unknown enum value '{value}' for property '{property}'")]
    UnknownEnumValue { property: String, value: String },
}

impl AdapterError {
    /// Check if this error means no adapter could be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound { .. })
    }

    /// Check if this error is a one-directional adapter being driven the
    /// wrong way.
    pub fn is_unserializable(&self) -> bool {
        matches!(self, AdapterError::Unserializable { .. })
    }

    /// Check if this error is a node shape mismatch.
    pub fn is_malformed_node(&self) -> bool {
        matches!(
            self,
            AdapterError::MalformedNode { .. } | AdapterError::UnknownEnumValue { .. }
        )
    }
}

// Conversion from AdapterError to the main Error type
impl From<AdapterError> for crate::Error {
    fn from(err: AdapterError) -> Self {
        crate::Error::Adapter(err)
    }
}
