//! Resolution of cross-record references, including cycles.
//!
//! Identity-bearing nodes serialize as their UUID and resolve back into
//! live, shared instances through the per-operation [`IdentityPool`]. The
//! cycle-breaking scope is explicit: a [`LoadContext`] value threaded
//! through every recursive call carries the pool, the optional backing
//! store for out-of-subtree lookups, and the loading-timeout
//! configuration. Nothing here is ambient or thread-local.

use std::sync::Arc;
use std::time::Duration;

pub mod errors;
pub mod pool;

pub use errors::ResolverError;
pub use pool::{IdentityPool, PoolEntry};

use tracing::warn;

use crate::Result;
use crate::adapter::{AdapterError, AdapterRegistry, SaveContext, TypeAdapter};
use crate::schema::{ClassSchema, FieldValue, PropertyDescriptor};
use crate::serializer;
use crate::store::Configuration;
use crate::tree::ConfigNode;

/// Default bound on waiting for another caller's in-flight resolution.
pub const DEFAULT_LOADING_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for one load operation.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// How long to wait on another thread's in-flight resolution of the
    /// same identity before failing with a loading timeout.
    /// `Duration::ZERO` waits unbounded.
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOADING_TIMEOUT,
        }
    }
}

/// The explicit per-operation scope for deserialization.
///
/// Created once per top-level load and passed through every recursive
/// conversion; discarding it at the end of the operation is what retires
/// the identity pool.
pub struct LoadContext {
    registry: Arc<AdapterRegistry>,
    pool: IdentityPool,
    store: Option<Arc<dyn Configuration>>,
    options: LoadOptions,
}

impl LoadContext {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            pool: IdentityPool::new(),
            store: None,
            options: LoadOptions::default(),
        }
    }

    /// Attaches the backing store used to resolve references that point
    /// outside the subtree being loaded.
    pub fn with_store(mut self, store: Arc<dyn Configuration>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &IdentityPool {
        &self.pool
    }

    pub fn store(&self) -> Option<&Arc<dyn Configuration>> {
        self.store.as_ref()
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }
}

/// Adapter for reference-flagged properties.
///
/// Strong references resolve pool-first, then fall back to a store lookup
/// by identity; the looked-up subtree is deserialized into the same
/// context, so cycles through the store still close on pooled instances.
/// Weak references never consult the pool and tolerate dangling targets.
pub struct ReferenceAdapter;

impl ReferenceAdapter {
    fn target_schema(property: &PropertyDescriptor) -> Result<Arc<ClassSchema>> {
        property.record_schema()?.ok_or_else(|| {
            AdapterError::NotFound {
                type_name: format!("reference target of property '{}'", property.name),
            }
            .into()
        })
    }

    fn load_from_store(
        identity: &str,
        property: &PropertyDescriptor,
        ctx: &LoadContext,
    ) -> Result<Option<FieldValue>> {
        let Some(store) = ctx.store() else {
            return Ok(None);
        };
        let Some(path) = store.lookup_uuid(identity)? else {
            return Ok(None);
        };
        let schema = Self::target_schema(property)?;
        let Some(node) = store.node(&path, Some(&schema))? else {
            return Ok(None);
        };
        let handle = serializer::deserialize_record(&node, &schema, ctx)?;
        Ok(Some(FieldValue::Record(handle)))
    }
}

impl TypeAdapter for ReferenceAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Record(handle) => match handle.identity()? {
                Some(identity) => Ok(ConfigNode::Text(identity)),
                None => Err(ResolverError::MissingIdentity {
                    class: handle.schema().class_name().to_string(),
                }
                .into()),
            },
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "record reference".to_string(),
                actual: other.type_name().to_string(),
            }
            .into()),
        }
    }

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        ctx: &LoadContext,
    ) -> Result<FieldValue> {
        let identity = match node {
            ConfigNode::Null => return Ok(FieldValue::Null),
            ConfigNode::Text(s) if !s.is_empty() => s.as_str(),
            other => {
                return Err(AdapterError::MalformedNode {
                    property: property.name.clone(),
                    expected: "identity text".to_string(),
                    actual: other.type_name().to_string(),
                }
                .into());
            }
        };
        if property.is_weak_reference {
            // Weak references bypass the pool; a dangling target is
            // tolerated because weak linkage is the optional mechanism.
            return match Self::load_from_store(identity, property, ctx)? {
                Some(value) => Ok(value),
                None => {
                    warn!(identity, property = %property.name, "weak reference dangling");
                    Ok(FieldValue::Null)
                }
            };
        }
        if let Some(pooled) = ctx.pool().lookup(identity, ctx.options().timeout)? {
            return Ok(FieldValue::Record(pooled));
        }
        match Self::load_from_store(identity, property, ctx)? {
            Some(value) => Ok(value),
            None => {
                if ctx.store().is_none() {
                    Err(ResolverError::NoStore {
                        identity: identity.to_string(),
                    }
                    .into())
                } else {
                    Err(ResolverError::IdentityNotFound {
                        identity: identity.to_string(),
                    }
                    .into())
                }
            }
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(raw)
    }

    fn describe_schema(&self, property: &PropertyDescriptor) -> ConfigNode {
        let mut node = ConfigNode::object().with("type", "reference");
        if let Some(target) = &property.type_name {
            node.insert("targetClass", target.as_str());
        }
        node.insert("weak", property.is_weak_reference);
        node
    }
}
