//!
//! conftree: a generic engine binding structured application objects to a
//! backend-agnostic hierarchical document tree, and back. It is the
//! foundation underneath several storage backends (directory-service
//! trees, flat documents, key-value preference stores) for a
//! device-configuration management system.
//!
//! ## Core Concepts
//!
//! * **Document trees (`tree::ConfigNode`)**: the sole serialized
//!   representation exchanged with backends — primitives, ordered lists,
//!   and string-keyed objects, addressed by slash-delimited predicate
//!   paths (`tree::Path`) and searched lazily (`tree::SearchIter`).
//! * **Schemas (`schema::ClassSchema`)**: statically registered, cached
//!   structural descriptions of record types; one property descriptor per
//!   property with accessor function pointers instead of reflection.
//! * **Type adapters (`adapter::TypeAdapter`)**: pluggable per-type
//!   conversion between field values and nodes, resolved through
//!   `adapter::AdapterRegistry`'s dispatch cascade.
//! * **The serializer (`serializer::TreeSerializer`)**: orchestrates
//!   schemas and adapters to turn object graphs into trees and back,
//!   including default-value normalization.
//! * **Reference resolution (`resolver`)**: UUID references resolve to
//!   shared live instances through a per-operation identity pool, which is
//!   what makes cyclic object graphs terminate without cloning identity.
//! * **Optimistic locking (`olock::HashCalculator`)**: deterministic
//!   subtree digests used to detect concurrent modification at persist
//!   time.
//! * **Stores (`store::Configuration`)**: the contract backends implement
//!   and decorators (defaults, caching, reference index, olock) wrap with
//!   explicit composition order.

pub mod adapter;
pub mod constants;
pub mod olock;
pub mod resolver;
pub mod schema;
pub mod serializer;
pub mod store;
pub mod tree;

/// Re-export of the serializer facade for easier access.
pub use serializer::TreeSerializer;

/// Result type used throughout the conftree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the conftree library.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured document tree and path errors from the tree module
    #[error(transparent)]
    Tree(tree::TreeError),

    /// Structured schema description errors from the schema module
    #[error(transparent)]
    Schema(schema::SchemaError),

    /// Structured adapter dispatch and conversion errors from the adapter module
    #[error(transparent)]
    Adapter(adapter::AdapterError),

    /// Structured (de)serialization errors from the serializer module
    #[error(transparent)]
    Serializer(serializer::SerializerError),

    /// Structured reference resolution errors from the resolver module
    #[error(transparent)]
    Resolver(resolver::ResolverError),

    /// Structured optimistic locking errors from the olock module
    #[error(transparent)]
    Lock(olock::LockError),

    /// Structured store contract errors from the store module
    #[error(transparent)]
    Store(store::StoreError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Tree(_) => "tree",
            Error::Schema(_) => "schema",
            Error::Adapter(_) => "adapter",
            Error::Serializer(_) => "serializer",
            Error::Resolver(_) => "resolver",
            Error::Lock(_) => "olock",
            Error::Store(_) => "store",
        }
    }

    /// Check if this error indicates something required was absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_not_found(),
            Error::Store(store_err) => store_err.is_not_found(),
            Error::Resolver(resolver_err) => resolver_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a path syntax error, rejected before any
    /// I/O.
    pub fn is_malformed_path(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_malformed_path(),
            _ => false,
        }
    }

    /// Check if this error means no type adapter could be resolved — a
    /// configuration-time defect that must never be retried.
    pub fn is_adapter_missing(&self) -> bool {
        match self {
            Error::Adapter(adapter_err) => adapter_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a one-directional conversion being driven
    /// the wrong way.
    pub fn is_unserializable(&self) -> bool {
        match self {
            Error::Adapter(adapter_err) => adapter_err.is_unserializable(),
            Error::Resolver(resolver_err) => resolver_err.is_unserializable(),
            _ => false,
        }
    }

    /// Check if this error is a required-property validation failure.
    pub fn is_validation_failed(&self) -> bool {
        match self {
            Error::Serializer(serializer_err) => serializer_err.is_validation_failed(),
            _ => false,
        }
    }

    /// Check if this error is an optimistic-lock conflict. Recoverable:
    /// re-read and retry.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Lock(lock_err) => lock_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error is an identity-pool loading timeout.
    /// Recoverable: re-read and retry.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Resolver(resolver_err) => resolver_err.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error wraps an opaque backend failure.
    pub fn is_backend_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_backend(),
            _ => false,
        }
    }

    /// Check if this error is a schema declaration defect.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::Schema(_))
    }
}
