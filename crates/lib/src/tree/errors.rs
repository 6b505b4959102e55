//! Error types for document tree operations.
//!
//! This module defines structured error types for tree addressing and path
//! parsing. Path syntax errors are rejected here, before any traversal or
//! backend I/O takes place.

use thiserror::Error;

/// Structured error types for document tree and path operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TreeError {
    /// A path expression failed to parse. Raised before any traversal.
    #[error("malformed path '{expression}': {reason}")]
    MalformedPath { expression: String, reason: String },

    /// A node required to exist was absent.
    #[error("node not found at '{path}'")]
    NotFound { path: String },

    /// A traversal stepped into a node that cannot hold children.
    #[error("node at '{path}' is not a container (found {actual})")]
    NotAContainer { path: String, actual: String },
}

impl TreeError {
    /// Check if this error is a path syntax error.
    pub fn is_malformed_path(&self) -> bool {
        matches!(self, TreeError::MalformedPath { .. })
    }

    /// Check if this error indicates an absent node.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound { .. })
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            TreeError::NotFound { path } | TreeError::NotAContainer { path, .. } => Some(path),
            TreeError::MalformedPath { .. } => None,
        }
    }
}

// Conversion from TreeError to the main Error type
impl From<TreeError> for crate::Error {
    fn from(err: TreeError) -> Self {
        crate::Error::Tree(err)
    }
}
