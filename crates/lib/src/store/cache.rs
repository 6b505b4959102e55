//! Decorator caching read nodes by path.
//!
//! Cache entries are invalidated structurally: a write at a path drops
//! every cached entry on the same root-to-leaf line (ancestors and
//! descendants both), and `refresh_node` does the same without writing,
//! forcing the next read through to the backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::Result;
use crate::schema::ClassSchema;
use crate::store::Configuration;
use crate::tree::{ConfigNode, Path, SearchIter};

pub struct CachingDecorator {
    inner: Arc<dyn Configuration>,
    cache: RwLock<HashMap<String, (Path, ConfigNode)>>,
}

impl CachingDecorator {
    pub fn new(inner: Arc<dyn Configuration>) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn invalidate(&self, changed: &Path) {
        self.cache
            .write()
            .unwrap()
            .retain(|_, (cached, _)| !cached.starts_with(changed) && !changed.starts_with(cached));
    }

    /// Number of cached entries. Diagnostic only.
    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

impl Configuration for CachingDecorator {
    fn root(&self) -> Result<ConfigNode> {
        self.inner.root()
    }

    fn node(&self, path: &Path, schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>> {
        let key = path.to_string();
        if let Some((_, cached)) = self.cache.read().unwrap().get(&key) {
            return Ok(Some(cached.clone()));
        }
        let fetched = self.inner.node(path, schema)?;
        if let Some(node) = &fetched {
            self.cache
                .write()
                .unwrap()
                .insert(key, (path.clone(), node.clone()));
        }
        Ok(fetched)
    }

    fn persist_node(
        &self,
        path: &Path,
        node: ConfigNode,
        schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()> {
        self.inner.persist_node(path, node, schema)?;
        self.invalidate(path);
        Ok(())
    }

    fn remove_node(&self, path: &Path) -> Result<()> {
        self.inner.remove_node(path)?;
        self.invalidate(path);
        Ok(())
    }

    fn refresh_node(&self, path: &Path) -> Result<()> {
        self.invalidate(path);
        self.inner.refresh_node(path)
    }

    fn search(&self, pattern: &Path) -> Result<SearchIter> {
        self.inner.search(pattern)
    }

    fn lookup_uuid(&self, uuid: &str) -> Result<Option<Path>> {
        self.inner.lookup_uuid(uuid)
    }
}
