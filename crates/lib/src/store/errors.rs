//! Error types for the store contract.

use thiserror::Error;

/// Structured error types for configuration stores.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A node required to exist was absent from the store.
    #[error("no node stored at '{path}'")]
    NotFound { path: String },

    /// An opaque failure surfaced from the external backend, wrapped with
    /// the operation and path for context. Never downgraded to an absent
    /// result.
    #[error("backend failure during {operation} at '{path}': {source}")]
    Backend {
        operation: &'static str,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wraps an opaque backend failure with operation context.
    pub fn backend(
        operation: &'static str,
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Backend {
            operation,
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error indicates an absent node.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error wraps a backend failure.
    pub fn is_backend(&self) -> bool {
        matches!(self, StoreError::Backend { .. })
    }

    /// The path this error concerns.
    pub fn path(&self) -> &str {
        match self {
            StoreError::NotFound { path } | StoreError::Backend { path, .. } => path,
        }
    }
}

// Conversion from StoreError to the main Error type
impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
