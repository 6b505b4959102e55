//! Decorator applying default-value normalization at the store boundary.
//!
//! On the way out of the store, absent defaulted properties are filled in;
//! on the way in, default-equal values and empty containers are pruned so
//! backends only hold meaningful data. Both passes are schema-driven and
//! only run when the caller supplied a schema.

use std::sync::Arc;

use crate::Result;
use crate::schema::ClassSchema;
use crate::serializer::{fill_defaults, filter_defaults};
use crate::store::Configuration;
use crate::tree::{ConfigNode, Path, SearchIter};

pub struct DefaultsDecorator {
    inner: Arc<dyn Configuration>,
}

impl DefaultsDecorator {
    pub fn new(inner: Arc<dyn Configuration>) -> Self {
        Self { inner }
    }
}

impl Configuration for DefaultsDecorator {
    fn root(&self) -> Result<ConfigNode> {
        self.inner.root()
    }

    fn node(&self, path: &Path, schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>> {
        let Some(mut node) = self.inner.node(path, schema)? else {
            return Ok(None);
        };
        if let Some(schema) = schema {
            fill_defaults(&mut node, schema)?;
        }
        Ok(Some(node))
    }

    fn persist_node(
        &self,
        path: &Path,
        mut node: ConfigNode,
        schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()> {
        if let Some(schema) = schema {
            filter_defaults(&mut node, schema)?;
        }
        self.inner.persist_node(path, node, schema)
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
