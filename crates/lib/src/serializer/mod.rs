//! The tree (de)serializer: orchestrates schema descriptors and type
//! adapters to convert typed object graphs into document trees and back.
//!
//! Serialization walks a record's property descriptors in declaration
//! order, reads each value through its accessor, resolves the property's
//! adapter, and inserts the converted node under the descriptor's name.
//! Deserialization allocates (or reuses, via the identity pool) an
//! instance, then normalizes and converts each child node back through the
//! same adapters.
//!
//! Record-typed properties dispatch back into this module through
//! [`RecordAdapter`] — the serializer is its own self-referential adapter.
//!
//! Default handling is a normalization concern, not conversion: absent
//! properties that declare a default are synthesized before conversion,
//! and the tree-level [`defaults`] pass prunes default-equal values and
//! empty containers before persistence without ever touching the caller's
//! live objects.

use std::sync::Arc;

pub mod defaults;
pub mod errors;

pub use defaults::{fill_defaults, filter_defaults};
pub use errors::SerializerError;

use crate::Result;
use crate::adapter::{AdapterError, AdapterRegistry, SaveContext, TypeAdapter};
use crate::resolver::{LoadContext, LoadOptions, PoolEntry};
use crate::schema::{ClassSchema, FieldValue, ObjectHandle, PropertyDescriptor};
use crate::store::Configuration;
use crate::tree::{ConfigNode, Path};

/// Converts typed object graphs to document trees and back.
pub struct TreeSerializer {
    registry: Arc<AdapterRegistry>,
}

impl Default for TreeSerializer {
    fn default() -> Self {
        Self::new(Arc::new(AdapterRegistry::new()))
    }
}

impl TreeSerializer {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Serializes a record instance into a fresh document tree owned by
    /// the caller.
    pub fn to_tree(&self, handle: &ObjectHandle) -> Result<ConfigNode> {
        let ctx = SaveContext::new(self.registry.clone());
        serialize_record(handle, &ctx)
    }

    /// Deserializes a record from a tree within an existing load scope.
    pub fn from_tree(
        &self,
        node: &ConfigNode,
        schema: &Arc<ClassSchema>,
        ctx: &LoadContext,
    ) -> Result<ObjectHandle> {
        deserialize_record(node, schema, ctx)
    }

    /// Deserializes a record as its own top-level load operation: a fresh
    /// identity pool is created for the call and retired when it returns.
    pub fn load(&self, node: &ConfigNode, schema: &Arc<ClassSchema>) -> Result<ObjectHandle> {
        let ctx = LoadContext::new(self.registry.clone());
        deserialize_record(node, schema, &ctx)
    }

    /// Loads the record stored at `path`, resolving references against
    /// `store`. One identity pool spans the whole call, so cycles that
    /// reach through the store still terminate on shared instances.
    pub fn load_from_store(
        &self,
        store: &Arc<dyn Configuration>,
        path: &Path,
        schema: &Arc<ClassSchema>,
        options: LoadOptions,
    ) -> Result<ObjectHandle> {
        let node = store.node(path, Some(schema))?.ok_or_else(|| {
            crate::store::StoreError::NotFound {
                path: path.to_string(),
            }
        })?;
        let ctx = LoadContext::new(self.registry.clone())
            .with_store(store.clone())
            .with_options(options);
        deserialize_record(&node, schema, &ctx)
    }

    /// Serializes a record and persists it at `path`.
    pub fn persist_to_store(
        &self,
        store: &Arc<dyn Configuration>,
        path: &Path,
        handle: &ObjectHandle,
    ) -> Result<()> {
        let node = self.to_tree(handle)?;
        store.persist_node(path, node, Some(handle.schema()))
    }
}

/// Serializes one record instance into an object node.
pub fn serialize_record(handle: &ObjectHandle, ctx: &SaveContext) -> Result<ConfigNode> {
    let schema = handle.schema().clone();
    let mut out = ConfigNode::object();
    for property in schema.properties() {
        let value = handle.get(property)?;
        if value.is_null() {
            continue;
        }
        let adapter = ctx.registry().resolve(property)?;
        let node = adapter.to_node(&value, property, ctx)?;
        if node.is_null() {
            continue;
        }
        out.insert(property.name.clone(), node);
    }
    Ok(out)
}

/// Deserializes an object node into a record instance.
///
/// Identity-bearing records go through the pool protocol: a pooled entry
/// is returned as-is (it may still be under construction — its identity
/// and reference slot are already valid, which is all a closing cycle
/// needs); otherwise a bare instance is registered *before* any field is
/// populated, so recursive resolution of the same identity terminates.
pub fn deserialize_record(
    node: &ConfigNode,
    schema: &Arc<ClassSchema>,
    ctx: &LoadContext,
) -> Result<ObjectHandle> {
    if node.as_object().is_none() {
        return Err(SerializerError::NotARecord {
            class: schema.class_name().to_string(),
            actual: node.type_name().to_string(),
        }
        .into());
    }
    let identity = schema
        .identity_property()
        .and_then(|p| node.get(&p.name))
        .and_then(|n| n.as_text())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let handle = match &identity {
        Some(id) => {
            match ctx
                .pool()
                .resolve_or_register(id, schema, ctx.options().timeout)?
            {
                PoolEntry::Existing(pooled) => return Ok(pooled),
                PoolEntry::Registered(bare) => bare,
            }
        }
        None => ObjectHandle::from_schema(schema),
    };

    populate(&handle, node, schema, ctx)?;
    if let Some(id) = &identity {
        ctx.pool().mark_ready(id);
    }
    Ok(handle)
}

fn populate(
    handle: &ObjectHandle,
    node: &ConfigNode,
    schema: &Arc<ClassSchema>,
    ctx: &LoadContext,
) -> Result<()> {
    for property in schema.properties() {
        let adapter = ctx.registry().resolve(property)?;
        let child = match node.get(&property.name) {
            Some(child) => child.clone(),
            None => match &property.default {
                Some(default) => default.clone(),
                None if property.required => {
                    return Err(SerializerError::ValidationFailed {
                        class: schema.class_name().to_string(),
                        property: property.name.clone(),
                    }
                    .into());
                }
                None => ConfigNode::Null,
            },
        };
        let normalized = adapter.normalize(child, property)?;
        let value = adapter.from_node(&normalized, property, ctx)?;
        handle.set(property, value)?;
    }
    Ok(())
}

/// The self-referential adapter: record-typed properties dispatch back
/// into the serializer.
pub struct RecordAdapter;

impl TypeAdapter for RecordAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Record(handle) => serialize_record(handle, ctx),
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "record".to_string(),
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
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Object(_) => {
                let schema = property.record_schema()?.ok_or_else(|| {
                    AdapterError::NotFound {
                        type_name: format!("record schema of property '{}'", property.name),
                    }
                })?;
                let handle = deserialize_record(node, &schema, ctx)?;
                Ok(FieldValue::Record(handle))
            }
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "object".to_string(),
                actual: other.type_name().to_string(),
            }
            .into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            ConfigNode::Text(s) => match serde_json::from_str::<serde_json::Value>(&s) {
                Ok(value @ serde_json::Value::Object(_)) => ConfigNode::from(value),
                _ => ConfigNode::Text(s),
            },
            other => other,
        })
    }

    fn describe_schema(&self, property: &PropertyDescriptor) -> ConfigNode {
        let mut node = ConfigNode::object().with("type", "object");
        if let Some(class) = &property.type_name {
            node.insert("class", class.as_str());
        }
        node
    }
}
