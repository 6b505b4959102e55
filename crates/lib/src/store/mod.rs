//! The store contract and its decorator pipeline.
//!
//! [`Configuration`] is the interface every storage backend implements and
//! every decorator wraps. The engine's algorithms consume it; they never
//! know whether they are talking to a raw backend or a composed stack of
//! decorators. Composition is ordinary struct wrapping with an explicit
//! construction-time order, e.g.:
//!
//! ```ignore
//! let store: Arc<dyn Configuration> = Arc::new(DefaultsDecorator::new(
//!     Arc::new(OlockDecorator::new(Arc::new(CachingDecorator::new(
//!         Arc::new(InMemoryConfiguration::new()),
//!     )))),
//! ));
//! ```
//!
//! Backends must be `Send + Sync` to allow sharing across concurrent
//! load/save operations, and `Any` to allow downcasting where a caller
//! needs a concrete implementation.

use std::any::Any;
use std::sync::Arc;

pub mod cache;
pub mod defaults;
pub mod errors;
pub mod in_memory;
pub mod index;
pub mod olock;

pub use cache::CachingDecorator;
pub use defaults::DefaultsDecorator;
pub use errors::StoreError;
pub use in_memory::InMemoryConfiguration;
pub use index::ReferenceIndexDecorator;
pub use olock::OlockDecorator;

use crate::Result;
use crate::constants::UUID_KEY;
use crate::schema::ClassSchema;
use crate::tree::{ConfigNode, Path, SearchIter};

/// Storage contract consumed by the engine and implemented by backends
/// and decorators.
pub trait Configuration: Send + Sync + Any {
    /// The whole tree. The returned snapshot is owned by the caller;
    /// mutating it does not write through.
    fn root(&self) -> Result<ConfigNode>;

    /// Resolves the node at `path`, or `None` when absent. Absence is not
    /// an error. The optional schema lets decorators normalize or stamp
    /// metadata on the way out.
    fn node(&self, path: &Path, schema: Option<&Arc<ClassSchema>>) -> Result<Option<ConfigNode>>;

    /// Returns true if a node exists at `path`.
    fn node_exists(&self, path: &Path) -> Result<bool> {
        Ok(self.node(path, None)?.is_some())
    }

    /// Writes `node` at `path` with partial-overwrite semantics: children
    /// present in the old subtree but absent from the new one are
    /// preserved unless explicitly removed.
    fn persist_node(
        &self,
        path: &Path,
        node: ConfigNode,
        schema: Option<&Arc<ClassSchema>>,
    ) -> Result<()>;

    /// Removes the node at `path`. Removing an absent leaf is a no-op; a
    /// missing parent container is an error.
    fn remove_node(&self, path: &Path) -> Result<()>;

    /// Invalidates any cached copy of `path` so the next read re-fetches
    /// from the backend.
    fn refresh_node(&self, path: &Path) -> Result<()>;

    /// Lazily searches the tree for subtrees matching `pattern`.
    fn search(&self, pattern: &Path) -> Result<SearchIter>;

    /// Resolves the path of the record carrying `uuid` as its identity.
    ///
    /// The default implementation scans the whole tree; the reference
    /// index decorator overrides it with an indexed lookup.
    fn lookup_uuid(&self, uuid: &str) -> Result<Option<Path>> {
        Ok(find_uuid_path(&self.root()?, uuid, &Path::root()))
    }
}

/// Depth-first scan for the record node whose reserved identity key holds
/// `uuid`, building the path on the way down.
pub(crate) fn find_uuid_path(node: &ConfigNode, uuid: &str, at: &Path) -> Option<Path> {
    match node {
        ConfigNode::Object(entries) => {
            if entries.get(UUID_KEY).and_then(|n| n.as_text()) == Some(uuid) {
                return Some(at.clone());
            }
            entries
                .iter()
                .find_map(|(key, child)| find_uuid_path(child, uuid, &at.child(key)))
        }
        ConfigNode::List(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, child)| find_uuid_path(child, uuid, &at.child(i.to_string()))),
        _ => None,
    }
}
