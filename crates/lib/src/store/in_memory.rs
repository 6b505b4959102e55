//! In-memory reference implementation of the store contract.
//!
//! Suitable for tests, development, and as the canonical model of the
//! contract's semantics (merge-persist, no-op removes, snapshot search).
//! Data lives in a single document tree behind a read-write lock; reads
//! hand out owned snapshots to support concurrent access.

use std::sync::{Arc, RwLock};

use crate::Result;
use crate::schema::ClassSchema;
use crate::store::Configuration;
use crate::tree::{ConfigNode, Path, SearchIter};

/// A `Configuration` backed by an in-memory document tree.
#[derive(Debug)]
pub struct InMemoryConfiguration {
    root: RwLock<ConfigNode>,
}

impl Default for InMemoryConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConfiguration {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(ConfigNode::object()),
        }
    }

    /// Creates a store seeded with an existing tree.
    pub fn with_root(root: ConfigNode) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }
}

impl Configuration for InMemoryConfiguration {
    fn root(&self) -> Result<ConfigNode> {
        Ok(self.root.read().unwrap().clone())
    }

    fn node(&self, path: &Path, _schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>> {
        Ok(self.root.read().unwrap().get_at(path).cloned())
    }

    fn persist_node(
        &self,
        path: &Path,
        node: ConfigNode,
        _schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()> {
        let mut root = self.root.write().unwrap();
        match root.get_at(path) {
            Some(existing) => {
                // Partial overwrite: merge over the existing subtree so
                // children absent from the incoming node are preserved.
                let mut merged = existing.clone();
                merged.merge_from(node);
                root.replace_at(path, merged)?;
            }
            None => {
                root.replace_at(path, node)?;
            }
        }
        Ok(())
    }

    fn remove_node(&self, path: &Path) -> Result<()> {
        self.root.write().unwrap().remove_at(path)?;
        Ok(())
    }

    fn refresh_node(&self, _path: &Path) -> Result<()> {
        // Nothing is cached here; reads always see the live tree.
        Ok(())
    }

    fn search(&self, pattern: &Path) -> Result<SearchIter> {
        Ok(self.root.read().unwrap().search(pattern))
    }
}
