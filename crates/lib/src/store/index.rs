//! Decorator maintaining a uuid-to-path index over the store.
//!
//! The reference resolver looks referenced identities up by uuid; without
//! an index that is a full-tree scan per reference. This decorator keeps
//! the mapping current across persists and removes and overrides
//! [`Configuration::lookup_uuid`] with a map lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::Result;
use crate::schema::ClassSchema;
use crate::store::{Configuration, find_uuid_path};
use crate::tree::{ConfigNode, Path, SearchIter};
use crate::constants::UUID_KEY;

pub struct ReferenceIndexDecorator {
    inner: Arc<dyn Configuration>,
    index: RwLock<HashMap<String, Path>>,
}

impl ReferenceIndexDecorator {
    /// Wraps `inner`, building the initial index from its current tree.
    pub fn new(inner: Arc<dyn Configuration>) -> Result<Self> {
        let decorator = Self {
            inner,
            index: RwLock::new(HashMap::new()),
        };
        decorator.rebuild()?;
        Ok(decorator)
    }

    fn rebuild(&self) -> Result<()> {
        let mut fresh = HashMap::new();
        collect_identities(&self.inner.root()?, &Path::root(), &mut fresh);
        *self.index.write().unwrap() = fresh;
        Ok(())
    }

    /// Number of indexed identities. Diagnostic only.
    pub fn indexed_len(&self) -> usize {
        self.index.read().unwrap().len()
    }
}

fn collect_identities(node: &ConfigNode, at: &Path, out: &mut HashMap<String, Path>) {
    match node {
        ConfigNode::Object(entries) => {
            if let Some(uuid) = entries.get(UUID_KEY).and_then(|n| n.as_text()) {
                out.insert(uuid.to_string(), at.clone());
            }
            for (key, child) in entries {
                collect_identities(child, &at.child(key), out);
            }
        }
        ConfigNode::List(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_identities(child, &at.child(i.to_string()), out);
            }
        }
        _ => {}
    }
}

impl Configuration for ReferenceIndexDecorator {
    fn root(&self) -> Result<ConfigNode> {
        self.inner.root()
    }

    fn node(&self, path: &Path, schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>> {
        self.inner.node(path, schema)
    }

    fn persist_node(
        &self,
        path: &Path,
        node: ConfigNode,
        schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()> {
        self.inner.persist_node(path, node, schema)?;
        // Re-read the merged result: persist has partial-overwrite
        // semantics, so the stored subtree may hold more than was sent.
        let mut index = self.index.write().unwrap();
        index.retain(|_, indexed| !indexed.starts_with(path));
        if let Some(stored) = self.inner.node(path, None)? {
            collect_identities(&stored, path, &mut index);
        }
        Ok(())
    }

    fn remove_node(&self, path: &Path) -> Result<()> {
        self.inner.remove_node(path)?;
        self.index
            .write()
            .unwrap()
            .retain(|_, indexed| !indexed.starts_with(path));
        Ok(())
    }

    fn refresh_node(&self, path: &Path) -> Result<()> {
        self.inner.refresh_node(path)?;
        // The backend may serve different content after a refresh.
        self.rebuild()
    }

    fn search(&self, pattern: &Path) -> Result<SearchIter> {
        self.inner.search(pattern)
    }

    fn lookup_uuid(&self, uuid: &str) -> Result<Option<Path>> {
        if let Some(path) = self.index.read().unwrap().get(uuid) {
            return Ok(Some(path.clone()));
        }
        // Fall back to a scan in case the index missed an out-of-band
        // write, keeping lookups correct rather than merely fast.
        Ok(find_uuid_path(&self.inner.root()?, uuid, &Path::root()))
    }
}
