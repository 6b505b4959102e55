//! Generic container adapters, parameterized by the recursively resolved
//! element adapter.
//!
//! One sequence adapter serves arrays, lists, and sets: the three kinds
//! differ only in canonicalization (sets serialize in sorted order so that
//! equal sets produce equal trees). The map adapter handles string-keyed
//! entries. Both delegate element conversion to whatever adapter the
//! registry resolves for the element pseudo-descriptor.

use std::collections::BTreeMap;

use crate::Result;
use crate::adapter::{AdapterError, SaveContext, TypeAdapter};
use crate::resolver::LoadContext;
use crate::schema::{ContainerKind, FieldValue, PropertyDescriptor};
use crate::tree::ConfigNode;

fn element_of(property: &PropertyDescriptor) -> Result<&PropertyDescriptor> {
    property.element_descriptor().ok_or_else(|| {
        AdapterError::NotFound {
            type_name: format!("element of container property '{}'", property.name),
        }
        .into()
    })
}

/// Stable ordering key for set canonicalization.
fn canonical_key(node: &ConfigNode) -> String {
    serde_json::to_string(node).unwrap_or_default()
}

/// Adapter for array, list, and set properties.
pub struct SequenceAdapter;

impl TypeAdapter for SequenceAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        let element = element_of(property)?;
        let adapter = ctx.registry().resolve(element)?;
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::List(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    nodes.push(adapter.to_node(item, element, ctx)?);
                }
                if property.kind == ContainerKind::Set {
                    nodes.sort_by_key(canonical_key);
                }
                Ok(ConfigNode::List(nodes))
            }
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "list".to_string(),
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
        let element = element_of(property)?;
        let adapter = ctx.registry().resolve(element)?;
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let normalized = adapter.normalize(item.clone(), element)?;
                    values.push(adapter.from_node(&normalized, element, ctx)?);
                }
                Ok(FieldValue::List(values))
            }
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "list".to_string(),
                actual: other.type_name().to_string(),
            }
            .into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            // Text-only backends store sequences as JSON strings.
            ConfigNode::Text(s) => match serde_json::from_str::<serde_json::Value>(&s) {
                Ok(value @ serde_json::Value::Array(_)) => ConfigNode::from(value),
                _ => ConfigNode::List(vec![ConfigNode::Text(s)]),
            },
            // A lone primitive is a degenerate single-element sequence.
            primitive @ (ConfigNode::Bool(_) | ConfigNode::Int(_) | ConfigNode::Double(_)) => {
                ConfigNode::List(vec![primitive])
            }
            other => other,
        })
    }

    fn describe_schema(&self, property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object()
            .with("type", "array")
            .with(
                "uniqueItems",
                property.kind == ContainerKind::Set,
            )
    }
}

/// Adapter for string-keyed map properties.
pub struct MapAdapter;

impl TypeAdapter for MapAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        let element = element_of(property)?;
        let adapter = ctx.registry().resolve(element)?;
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, entry) in entries {
                    map.insert(key.clone(), adapter.to_node(entry, element, ctx)?);
                }
                Ok(ConfigNode::Object(map))
            }
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "map".to_string(),
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
        let element = element_of(property)?;
        let adapter = ctx.registry().resolve(element)?;
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Object(entries) => {
                let mut map = BTreeMap::new();
                for (key, entry) in entries {
                    let normalized = adapter.normalize(entry.clone(), element)?;
                    map.insert(key.clone(), adapter.from_node(&normalized, element, ctx)?);
                }
                Ok(FieldValue::Map(map))
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

    fn describe_schema(&self, _property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object()
            .with("type", "object")
            .with("openKeys", true)
    }
}
