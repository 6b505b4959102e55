//! Built-in adapters for primitive property types.
//!
//! Normalization here is what lets text-only backends round-trip typed
//! values: a primitive adapter accepts the loose textual form and coerces
//! it into the node shape `from_node` expects.

use base64ct::{Base64, Encoding};

use crate::Result;
use crate::adapter::{AdapterError, SaveContext, TypeAdapter};
use crate::resolver::LoadContext;
use crate::schema::{FieldValue, PropertyDescriptor};
use crate::tree::ConfigNode;

fn malformed(property: &PropertyDescriptor, expected: &str, node: &ConfigNode) -> AdapterError {
    AdapterError::MalformedNode {
        property: property.name.clone(),
        expected: expected.to_string(),
        actual: node.type_name().to_string(),
    }
}

fn value_mismatch(property: &PropertyDescriptor, expected: &str, value: &FieldValue) -> AdapterError {
    AdapterError::MalformedNode {
        property: property.name.clone(),
        expected: expected.to_string(),
        actual: value.type_name().to_string(),
    }
}

/// Adapter for boolean properties.
pub struct BoolAdapter;

impl TypeAdapter for BoolAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Bool(b) => Ok(ConfigNode::Bool(*b)),
            other => Err(value_mismatch(property, "bool", other).into()),
        }
    }

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        _ctx: &LoadContext,
    ) -> Result<FieldValue> {
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Bool(b) => Ok(FieldValue::Bool(*b)),
            other => Err(malformed(property, "bool", other).into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            ConfigNode::Text(s) if s.eq_ignore_ascii_case("true") => ConfigNode::Bool(true),
            ConfigNode::Text(s) if s.eq_ignore_ascii_case("false") => ConfigNode::Bool(false),
            ConfigNode::Int(0) => ConfigNode::Bool(false),
            ConfigNode::Int(1) => ConfigNode::Bool(true),
            other => other,
        })
    }

    fn describe_schema(&self, _property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object().with("type", "boolean")
    }
}

/// Adapter for integer properties.
pub struct IntAdapter;

impl TypeAdapter for IntAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Int(i) => Ok(ConfigNode::Int(*i)),
            other => Err(value_mismatch(property, "int", other).into()),
        }
    }

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        _ctx: &LoadContext,
    ) -> Result<FieldValue> {
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Int(i) => Ok(FieldValue::Int(*i)),
            other => Err(malformed(property, "int", other).into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            ConfigNode::Text(s) => match s.trim().parse::<i64>() {
                Ok(i) => ConfigNode::Int(i),
                Err(_) => ConfigNode::Text(s),
            },
            ConfigNode::Double(d) if d.fract() == 0.0 => ConfigNode::Int(d as i64),
            other => other,
        })
    }

    fn describe_schema(&self, _property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object().with("type", "integer")
    }
}

/// Adapter for floating-point properties.
pub struct DoubleAdapter;

impl TypeAdapter for DoubleAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Double(d) => Ok(ConfigNode::Double(*d)),
            FieldValue::Int(i) => Ok(ConfigNode::Double(*i as f64)),
            other => Err(value_mismatch(property, "double", other).into()),
        }
    }

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        _ctx: &LoadContext,
    ) -> Result<FieldValue> {
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Double(d) => Ok(FieldValue::Double(*d)),
            ConfigNode::Int(i) => Ok(FieldValue::Double(*i as f64)),
            other => Err(malformed(property, "double", other).into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            ConfigNode::Text(s) => match s.trim().parse::<f64>() {
                Ok(d) => ConfigNode::Double(d),
                Err(_) => ConfigNode::Text(s),
            },
            other => other,
        })
    }

    fn describe_schema(&self, _property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object().with("type", "number")
    }
}

/// Adapter for text properties.
pub struct TextAdapter;

impl TypeAdapter for TextAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Text(s) => Ok(ConfigNode::Text(s.clone())),
            other => Err(value_mismatch(property, "text", other).into()),
        }
    }

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        _ctx: &LoadContext,
    ) -> Result<FieldValue> {
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Text(s) => Ok(FieldValue::Text(s.clone())),
            other => Err(malformed(property, "text", other).into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            ConfigNode::Bool(b) => ConfigNode::Text(b.to_string()),
            ConfigNode::Int(i) => ConfigNode::Text(i.to_string()),
            ConfigNode::Double(d) => ConfigNode::Text(d.to_string()),
            other => other,
        })
    }

    fn describe_schema(&self, _property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object().with("type", "string")
    }
}

/// Adapter for byte-array properties, carried as base64 text primitives.
pub struct BytesAdapter;

impl TypeAdapter for BytesAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Bytes(b) => Ok(ConfigNode::Text(Base64::encode_string(b))),
            other => Err(value_mismatch(property, "bytes", other).into()),
        }
    }

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        _ctx: &LoadContext,
    ) -> Result<FieldValue> {
        match node {
            ConfigNode::Null => Ok(FieldValue::Null),
            ConfigNode::Text(s) => {
                let bytes = Base64::decode_vec(s).map_err(|_| AdapterError::MalformedNode {
                    property: property.name.clone(),
                    expected: "base64 text".to_string(),
                    actual: format!("unparsable text ({} chars)", s.len()),
                })?;
                Ok(FieldValue::Bytes(bytes))
            }
            other => Err(malformed(property, "base64 text", other).into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, _property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(raw)
    }

    fn describe_schema(&self, _property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object()
            .with("type", "string")
            .with("contentEncoding", "base64")
    }
}
