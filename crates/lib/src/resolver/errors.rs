//! Error types for reference resolution and the identity pool.

use thiserror::Error;

/// Structured error types for reference resolution.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Waiting on another caller's in-flight resolution of the same
    /// identity exceeded the configured loading timeout. Recoverable: the
    /// caller may retry with a fresh read.
    #[error("timed out after {waited_ms}ms waiting for identity '{identity}' to load")]
    LoadingTimeout { identity: String, waited_ms: u128 },

    /// A strong reference named an identity that exists neither in the
    /// pool nor in the backing store.
    #[error("referenced identity '{identity}' not found")]
    IdentityNotFound { identity: String },

    /// A reference to an instance that has no identity value cannot be
    /// serialized.
    #[error("cannot serialize reference to '{class}' instance without an identity")]
    MissingIdentity { class: String },

    /// A reference was resolved without a backing store to look it up in.
    #[error("no backing store available to resolve identity '{identity}'")]
    NoStore { identity: String },
}

impl ResolverError {
    /// Check if this error is the recoverable loading timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResolverError::LoadingTimeout { .. })
    }

    /// Check if this error indicates an absent identity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolverError::IdentityNotFound { .. })
    }

    /// Check if this error is an unserializable reference.
    pub fn is_unserializable(&self) -> bool {
        matches!(self, ResolverError::MissingIdentity { .. })
    }
}

// Conversion from ResolverError to the main Error type
impl From<ResolverError> for crate::Error {
    fn from(err: ResolverError) -> Self {
        crate::Error::Resolver(err)
    }
}
