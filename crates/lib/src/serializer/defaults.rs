//! Tree-level default normalization.
//!
//! Two schema-driven passes over a document tree, used on the way in and
//! out of a backend:
//!
//! - [`fill_defaults`]: before conversion, absent properties that declare
//!   a default gain a synthesized node from that default.
//! - [`filter_defaults`]: before persistence, properties whose value
//!   equals their declared default, and empty containers, are pruned.
//!
//! Both passes recurse through nested records, containers of records, and
//! extension bags, and operate on the tree representation only — the
//! caller's live objects are never touched.

use std::sync::Arc;

use crate::Result;
use crate::schema::{ClassSchema, ContainerKind, PropertyDescriptor, schema_by_name};
use crate::tree::ConfigNode;

/// Synthesizes nodes for absent defaulted properties, recursively.
pub fn fill_defaults(node: &mut ConfigNode, schema: &Arc<ClassSchema>) -> Result<()> {
    let Some(map) = node.as_object_mut() else {
        return Ok(());
    };
    for property in schema.properties() {
        match map.get_mut(&property.name) {
            None => {
                if let Some(default) = &property.default {
                    map.insert(property.name.clone(), default.clone());
                }
            }
            Some(child) => recurse(child, property, fill_defaults)?,
        }
    }
    Ok(())
}

/// Prunes default-equal properties and empty containers, recursively.
///
/// Pruning happens bottom-up: children are filtered first so that a
/// record reduced to nothing but defaults collapses to an empty object
/// and is itself pruned.
pub fn filter_defaults(node: &mut ConfigNode, schema: &Arc<ClassSchema>) -> Result<()> {
    let Some(map) = node.as_object_mut() else {
        return Ok(());
    };
    for property in schema.properties() {
        let Some(child) = map.get_mut(&property.name) else {
            continue;
        };
        recurse(child, property, filter_defaults)?;
        let equals_default = property
            .default
            .as_ref()
            .is_some_and(|default| default == child);
        if equals_default || child.is_null() || child.is_empty_container() {
            map.remove(&property.name);
        }
    }
    Ok(())
}

type Pass = fn(&mut ConfigNode, &Arc<ClassSchema>) -> Result<()>;

/// Applies a pass to the record-shaped parts beneath one property node.
fn recurse(child: &mut ConfigNode, property: &PropertyDescriptor, pass: Pass) -> Result<()> {
    match property.kind {
        ContainerKind::Record => {
            if let Some(schema) = property.record_schema()? {
                pass(child, &schema)?;
            }
        }
        ContainerKind::Array | ContainerKind::List | ContainerKind::Set => {
            if let Some(element) = property.element_descriptor()
                && element.kind == ContainerKind::Record
                && let Some(schema) = element.record_schema()?
                && let Some(items) = child.as_list_mut()
            {
                for item in items {
                    pass(item, &schema)?;
                }
            }
        }
        ContainerKind::Map => {
            if let Some(element) = property.element_descriptor()
                && element.kind == ContainerKind::Record
                && let Some(schema) = element.record_schema()?
                && let Some(entries) = child.as_object_mut()
            {
                for entry in entries.values_mut() {
                    pass(entry, &schema)?;
                }
            }
        }
        ContainerKind::ExtensionMap => {
            if let Some(entries) = child.as_object_mut() {
                for (class_name, entry) in entries.iter_mut() {
                    // Unknown extension classes are left untouched here;
                    // the extension adapter decides whether to skip them.
                    if let Some(schema) = schema_by_name(class_name) {
                        pass(entry, &schema)?;
                    }
                }
            }
        }
        ContainerKind::Scalar => {}
    }
    Ok(())
}
