//! Adapter for the extension bag: an open, class-name-keyed map of
//! polymorphic sub-records.
//!
//! Extensions are an optional mechanism, so an entry whose class has no
//! registered schema is logged and skipped rather than failing the whole
//! record. Everything else about an entry converts exactly like a nested
//! record.

use std::collections::BTreeMap;

use tracing::warn;

use crate::Result;
use crate::adapter::{AdapterError, SaveContext, TypeAdapter};
use crate::resolver::LoadContext;
use crate::schema::{FieldValue, PropertyDescriptor, schema_by_name};
use crate::serializer;
use crate::tree::ConfigNode;

pub struct ExtensionAdapter;

impl TypeAdapter for ExtensionAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Map(entries) => {
                let mut map = BTreeMap::new();
                for (class_name, entry) in entries {
                    let Some(handle) = entry.as_record() else {
                        return Err(AdapterError::MalformedNode {
                            property: property.name.clone(),
                            expected: "record".to_string(),
                            actual: entry.type_name().to_string(),
                        }
                        .into());
                    };
                    map.insert(class_name.clone(), serializer::serialize_record(handle, ctx)?);
                }
                Ok(ConfigNode::Object(map))
            }
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "map of extension records".to_string(),
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
            ConfigNode::Object(entries) => {
                let mut map = BTreeMap::new();
                for (class_name, entry) in entries {
                    let Some(schema) = schema_by_name(class_name) else {
                        warn!(class = %class_name, "skipping extension with unresolvable class");
                        continue;
                    };
                    let handle = serializer::deserialize_record(entry, &schema, ctx)?;
                    map.insert(class_name.clone(), FieldValue::Record(handle));
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
            .with("polymorphic", true)
    }
}
