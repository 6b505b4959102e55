//! Type adapters: pluggable per-type conversion between field values and
//! document nodes.
//!
//! Every property conversion goes through a [`TypeAdapter`] resolved from
//! the [`AdapterRegistry`]. Resolution order follows the engine contract:
//!
//! 1. an explicitly registered custom adapter for the resolved class wins;
//! 2. reference descriptors dispatch to the reference resolver adapter;
//! 3. extension-map descriptors dispatch to the extension-bag adapter;
//! 4. record descriptors dispatch to the tree serializer itself (a
//!    self-referential adapter);
//! 5. arrays/lists/sets and maps dispatch to generic container adapters
//!    parameterized by the recursively resolved element adapter;
//! 6. enums dispatch to an adapter honoring the per-property name/ordinal
//!    representation;
//! 7. remaining primitives use the built-in adapters.
//!
//! Failure to resolve an adapter is [`AdapterError::NotFound`], a fatal
//! configuration error raised at the call site.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub mod container;
pub mod enumeration;
pub mod errors;
pub mod extension;
pub mod primitive;

pub use errors::AdapterError;

use crate::Result;
use crate::resolver::{LoadContext, ReferenceAdapter};
use crate::schema::{ContainerKind, FieldValue, PropertyDescriptor, ScalarKind};
use crate::serializer::RecordAdapter;
use crate::tree::ConfigNode;

/// Context for object-to-tree conversion.
///
/// Carries the registry so self-referential and container adapters can
/// resolve their element adapters recursively.
pub struct SaveContext {
    registry: Arc<AdapterRegistry>,
}

impl SaveContext {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }
}

/// Converter between a property's typed value and its node representation.
///
/// `normalize` coerces a loosely typed raw node (e.g. a string read from a
/// text-only backend) into the shape `from_node` expects; `describe_schema`
/// produces human/UI-facing type metadata and is not required for
/// round-trip correctness.
pub trait TypeAdapter: Send + Sync {
    fn to_node(
        &self,
        value: &FieldValue,
        property: &PropertyDescriptor,
        ctx: &SaveContext,
    ) -> Result<ConfigNode>;

    fn from_node(
        &self,
        node: &ConfigNode,
        property: &PropertyDescriptor,
        ctx: &LoadContext,
    ) -> Result<FieldValue>;

    fn normalize(&self, raw: ConfigNode, property: &PropertyDescriptor) -> Result<ConfigNode>;

    fn describe_schema(&self, property: &PropertyDescriptor) -> ConfigNode;
}

/// Resolves the adapter responsible for a property descriptor.
pub struct AdapterRegistry {
    custom: RwLock<HashMap<String, Arc<dyn TypeAdapter>>>,
    reference: Arc<ReferenceAdapter>,
    extension: Arc<extension::ExtensionAdapter>,
    record: Arc<RecordAdapter>,
    sequence: Arc<container::SequenceAdapter>,
    map: Arc<container::MapAdapter>,
    enumeration: Arc<enumeration::EnumAdapter>,
    boolean: Arc<primitive::BoolAdapter>,
    integer: Arc<primitive::IntAdapter>,
    double: Arc<primitive::DoubleAdapter>,
    text: Arc<primitive::TextAdapter>,
    bytes: Arc<primitive::BytesAdapter>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            custom: RwLock::new(HashMap::new()),
            reference: Arc::new(ReferenceAdapter),
            extension: Arc::new(extension::ExtensionAdapter),
            record: Arc::new(RecordAdapter),
            sequence: Arc::new(container::SequenceAdapter),
            map: Arc::new(container::MapAdapter),
            enumeration: Arc::new(enumeration::EnumAdapter),
            boolean: Arc::new(primitive::BoolAdapter),
            integer: Arc::new(primitive::IntAdapter),
            double: Arc::new(primitive::DoubleAdapter),
            text: Arc::new(primitive::TextAdapter),
            bytes: Arc::new(primitive::BytesAdapter),
        }
    }

    /// Registers a custom adapter for a resolved class name. Custom
    /// adapters win over every built-in dispatch rule.
    pub fn register_custom(&self, type_name: impl Into<String>, adapter: Arc<dyn TypeAdapter>) {
        self.custom.write().unwrap().insert(type_name.into(), adapter);
    }

    /// Resolves the adapter for `property` following the documented
    /// cascade.
    pub fn resolve(&self, property: &PropertyDescriptor) -> Result<Arc<dyn TypeAdapter>> {
        if let Some(type_name) = &property.type_name
            && let Some(custom) = self.custom.read().unwrap().get(type_name)
        {
            return Ok(custom.clone());
        }
        if property.is_reference {
            return Ok(self.reference.clone());
        }
        let adapter: Arc<dyn TypeAdapter> = match property.kind {
            ContainerKind::ExtensionMap => self.extension.clone(),
            ContainerKind::Record => self.record.clone(),
            ContainerKind::Array | ContainerKind::List | ContainerKind::Set => {
                self.sequence.clone()
            }
            ContainerKind::Map => self.map.clone(),
            ContainerKind::Scalar => match property.scalar {
                Some(ScalarKind::Enum) => self.enumeration.clone(),
                Some(ScalarKind::Bool) => self.boolean.clone(),
                Some(ScalarKind::Int) => self.integer.clone(),
                Some(ScalarKind::Double) => self.double.clone(),
                Some(ScalarKind::Text) => self.text.clone(),
                Some(ScalarKind::Bytes) => self.bytes.clone(),
                None => {
                    return Err(AdapterError::NotFound {
                        type_name: describe_property_type(property),
                    }
                    .into());
                }
            },
        };
        Ok(adapter)
    }
}

fn describe_property_type(property: &PropertyDescriptor) -> String {
    property
        .type_name
        .clone()
        .unwrap_or_else(|| format!("{:?} property '{}'", property.kind, property.name))
}
