//! Constants used throughout the conftree library.
//!
//! This module provides central definitions for the reserved node keys that
//! form the on-tree wire contract. These keys are stable across backends.

/// Reserved node key carrying a record's identity (UUID).
pub const UUID_KEY: &str = "_uuid";

/// Reserved node key carrying a record's optimistic-lock hash.
pub const HASH_KEY: &str = "_hash";

/// Reserved node key for the extension bag: an open map of polymorphic
/// sub-records keyed by their type's simple class name.
pub const EXTENSIONS_KEY: &str = "_extensions";

/// Wildcard segment in search path patterns.
pub const WILDCARD: &str = "*";
