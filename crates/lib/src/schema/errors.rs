//! Error types for schema description and accessor dispatch.

use thiserror::Error;

/// Structured error types for schema construction and property access.
///
/// Schema errors are configuration-time defects: they indicate a record
/// type was declared inconsistently, and are never retried.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A record type declared more than one identity property.
    #[error("class '{class}' declares more than one identity property")]
    DuplicateIdentity { class: String },

    /// An extension class (attached via the extension bag of a
    /// non-identity base) declared an identity property of its own.
    #[error("extension class '{class}' must not declare an identity property")]
    IdentityInExtension { class: String },

    /// A property was declared twice on the same class.
    #[error("class '{class}' declares property '{property}' more than once")]
    DuplicateProperty { class: String, property: String },

    /// An accessor was invoked against an object of the wrong concrete type.
    #[error("accessor expected an instance of '{expected}'")]
    AccessorTypeMismatch { expected: String },

    /// A property descriptor has no getter/setter registered.
    #[error("property '{property}' of class '{class}' has no {accessor} accessor")]
    MissingAccessor {
        class: String,
        property: String,
        accessor: &'static str,
    },

    /// A dynamic value had the wrong shape for the requested conversion.
    #[error("value type mismatch: expected {expected}, found {actual}")]
    ValueTypeMismatch { expected: String, actual: String },

    /// No schema is registered under the given class name.
    #[error("no schema registered for class '{class}'")]
    UnknownClass { class: String },
}

impl SchemaError {
    /// Check if this error is a declaration-time defect (as opposed to a
    /// runtime value/access mismatch).
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            SchemaError::DuplicateIdentity { .. }
                | SchemaError::IdentityInExtension { .. }
                | SchemaError::DuplicateProperty { .. }
        )
    }

    /// Check if this error is a type mismatch.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            SchemaError::AccessorTypeMismatch { .. } | SchemaError::ValueTypeMismatch { .. }
        )
    }

    /// Check if this error indicates a missing class registration.
    pub fn is_unknown_class(&self) -> bool {
        matches!(self, SchemaError::UnknownClass { .. })
    }
}

// Conversion from SchemaError to the main Error type
impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
