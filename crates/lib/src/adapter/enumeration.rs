//! Adapter for enum properties.
//!
//! An enum travels either by variant name (text) or ordinal (integer); the
//! choice is per-property. Both forms are accepted on read regardless of
//! the declared representation, which is what `normalize` relies on when a
//! backend stored the other form.

use crate::Result;
use crate::adapter::{AdapterError, SaveContext, TypeAdapter};
use crate::resolver::LoadContext;
use crate::schema::{EnumRepr, EnumValue, FieldValue, PropertyDescriptor};
use crate::tree::ConfigNode;

pub struct EnumAdapter;

impl EnumAdapter {
    fn by_name(property: &PropertyDescriptor, name: &str) -> Result<EnumValue> {
        property
            .enum_values
            .iter()
            .position(|v| v == name)
            .map(|ordinal| EnumValue::new(name, ordinal as i64))
            .ok_or_else(|| {
                AdapterError::UnknownEnumValue {
                    property: property.name.clone(),
                    value: name.to_string(),
                }
                .into()
            })
    }

    fn by_ordinal(property: &PropertyDescriptor, ordinal: i64) -> Result<EnumValue> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| property.enum_values.get(i))
            .map(|name| EnumValue::new(name.clone(), ordinal))
            .ok_or_else(|| {
                AdapterError::UnknownEnumValue {
                    property: property.name.clone(),
                    value: ordinal.to_string(),
                }
                .into()
            })
    }
}

impl TypeAdapter for EnumAdapter {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        _ctx: &SaveContext,
    ) -> Result<ConfigNode> {
        match value {
            FieldValue::Null => Ok(ConfigNode::Null),
            FieldValue::Enum(e) => Ok(match property.enum_repr {
                EnumRepr::Name => ConfigNode::Text(e.name.clone()),
                EnumRepr::Ordinal => ConfigNode::Int(e.ordinal),
            }),
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "enum".to_string(),
                actual: other.type_name().to_string(),
            }
            .into()),
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
            ConfigNode::Text(name) => Self::by_name(property, name).map(FieldValue::Enum),
            ConfigNode::Int(ordinal) => {
                Self::by_ordinal(property, *ordinal).map(FieldValue::Enum)
            }
            other => Err(AdapterError::MalformedNode {
                property: property.name.clone(),
                expected: "enum name or ordinal".to_string(),
                actual: other.type_name().to_string(),
            }
            .into()),
        }
    }

    fn normalize(&self, raw: ConfigNode, property: &PropertyDescriptor) -> Result<ConfigNode> {
        Ok(match raw {
            // An ordinal stored by a text-only backend.
            ConfigNode::Text(s) => match s.parse::<i64>() {
                Ok(ordinal) if !property.enum_values.iter().any(|v| *v == s) => {
                    ConfigNode::Int(ordinal)
                }
                _ => ConfigNode::Text(s),
            },
            other => other,
        })
    }

    fn describe_schema(&self, property: &PropertyDescriptor) -> ConfigNode {
        ConfigNode::object().with("type", "enum").with(
            "values",
            ConfigNode::List(
                property
                    .enum_values
                    .iter()
                    .map(|v| ConfigNode::Text(v.clone()))
                    .collect(),
            ),
        )
    }
}
