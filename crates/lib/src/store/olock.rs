//! Decorator performing optimistic-lock conflict detection.
//!
//! On read, the returned subtree is stamped with fresh lock hashes so the
//! caller captures the state it read. On persist, the hash of the current
//! on-disk subtree at the same path is recomputed and compared to the hash
//! carried by the incoming node; a mismatch means a concurrent write
//! landed since the read, and the persist aborts with a conflict instead
//! of silently overwriting. The check-then-write runs under the
//! decorator's write lock, making it a compare-and-swap at the granularity
//! of the persisted subtree.

use std::sync::{Arc, Mutex};

use crate::Result;
use crate::olock::HashCalculator;
use crate::schema::ClassSchema;
use crate::store::Configuration;
use crate::tree::{ConfigNode, Path, SearchIter};

pub struct OlockDecorator {
    inner: Arc<dyn Configuration>,
    write_gate: Mutex<()>,
}

impl OlockDecorator {
    pub fn new(inner: Arc<dyn Configuration>) -> Self {
        Self {
            inner,
            write_gate: Mutex::new(()),
        }
    }
}

impl Configuration for OlockDecorator {
    fn root(&self) -> Result<ConfigNode> {
        self.inner.root()
    }

    fn node(&self, path: &Path, schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>> {
        let Some(mut node) = self.inner.node(path, schema)? else {
            return Ok(None);
        };
        if let Some(schema) = schema {
            HashCalculator::apply(&mut node, schema)?;
        }
        Ok(Some(node))
    }

    fn persist_node(
        &self,
        path: &Path,
        mut node: ConfigNode,
        schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()> {
        let Some(schema) = schema else {
            return self.inner.persist_node(path, node, schema);
        };
        let _gate = self.write_gate.lock().unwrap();
        if let Some(existing) = self.inner.node(path, None)? {
            HashCalculator::check(&existing, &node, schema, &path.to_string())?;
        }
        // The stored copy carries the hash of what is now on disk.
        HashCalculator::apply(&mut node, schema)?;
        self.inner.persist_node(path, node, Some(schema))
    }

    fn remove_node(&self, path: &Path) -> Result<()> {
        self.inner.remove_node(path)
    }

    fn refresh_node(&self, path: &Path) -> Result<()> {
        self.inner.refresh_node(path)
    }

    fn search(&self, pattern: &Path) -> Result<SearchIter> {
        self.inner.search(pattern)
    }

    fn lookup_uuid(&self, uuid: &str) -> Result<Option<Path>> {
        self.inner.lookup_uuid(uuid)
    }
}
