//! Error types for optimistic-lock conflict detection.

use thiserror::Error;

/// Structured error types for optimistic locking.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LockError {
    /// The subtree on disk changed since it was read: its current hash no
    /// longer matches the hash captured at read time. Recoverable — the
    /// caller may re-read and retry; the write was not performed.
    #[error("optimistic lock conflict at '{path}': expected hash {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: String,
        actual: String,
    },
}

impl LockError {
    /// Check if this error is a lock conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LockError::Conflict { .. })
    }

    /// The path the conflict was detected at.
    pub fn path(&self) -> Option<&str> {
        match self {
            LockError::Conflict { path, .. } => Some(path),
        }
    }
}

// Conversion from LockError to the main Error type
impl From<LockError> for crate::Error {
    fn from(err: LockError) -> Self {
        crate::Error::Lock(err)
    }
}
