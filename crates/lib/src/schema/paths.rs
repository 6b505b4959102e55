//! Translation between simple and persistable path forms.
//!
//! A *simple* path addresses the object graph the way application code
//! sees it: map entries appear as an extra key segment
//! (`/appEntities/STORE`). A *persistable* path is the backend-native
//! form, where a map entry is selected by a predicate on its key property
//! (`/appEntities[aeTitle='STORE']`). Given the root schema, the two forms
//! translate losslessly in both directions; segments the schema cannot
//! describe (extension bags, unknown names) pass through unchanged.

use std::sync::Arc;

use crate::schema::{ClassSchema, ContainerKind, PropertyDescriptor, SchemaError};
use crate::tree::{ConfigNode, Path, PathItem, Predicate, PredicateOp};

/// Where the translation walk currently stands in the schema graph.
enum Ctx {
    Record(Arc<ClassSchema>),
    Element(PropertyDescriptor),
    Opaque,
}

fn step_into(property: &PropertyDescriptor) -> Result<Ctx, SchemaError> {
    match property.kind {
        ContainerKind::Record => Ok(property
            .record_schema()?
            .map(Ctx::Record)
            .unwrap_or(Ctx::Opaque)),
        ContainerKind::Array | ContainerKind::List | ContainerKind::Set | ContainerKind::Map => {
            Ok(property
                .element_descriptor()
                .cloned()
                .map(Ctx::Element)
                .unwrap_or(Ctx::Opaque))
        }
        ContainerKind::Scalar | ContainerKind::ExtensionMap => Ok(Ctx::Opaque),
    }
}

fn element_ctx(element: &PropertyDescriptor) -> Result<Ctx, SchemaError> {
    if element.kind == ContainerKind::Record {
        Ok(element
            .record_schema()?
            .map(Ctx::Record)
            .unwrap_or(Ctx::Opaque))
    } else {
        Ok(Ctx::Opaque)
    }
}

/// True when the property is a map of records addressed through a
/// designated key property.
fn is_keyed_record_map(property: &PropertyDescriptor) -> bool {
    property.kind == ContainerKind::Map
        && property.map_key.is_some()
        && property
            .element_descriptor()
            .is_some_and(|e| e.kind == ContainerKind::Record)
}

fn predicate_value_text(value: &ConfigNode) -> String {
    match value {
        ConfigNode::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Looks up (and clones) the property an item addresses within a record.
fn property_of(schema: &Arc<ClassSchema>, item: &PathItem) -> Option<PropertyDescriptor> {
    item.as_name()
        .and_then(|name| schema.property(name))
        .cloned()
}

/// Translates a simple (object-graph) path into the persistable
/// (backend-native) form.
pub fn to_persistable(path: &Path, root: &Arc<ClassSchema>) -> Result<Path, SchemaError> {
    let mut ctx = Ctx::Record(root.clone());
    let mut out: Vec<PathItem> = Vec::new();
    let mut items = path.items().iter().peekable();
    while let Some(item) = items.next() {
        ctx = match ctx {
            Ctx::Record(schema) => match property_of(&schema, item) {
                Some(property) if is_keyed_record_map(&property) => {
                    let map_key = property.map_key.clone().expect("keyed map has a key");
                    match items.next() {
                        Some(key_item) => {
                            let key = key_item.as_name().ok_or_else(|| {
                                SchemaError::ValueTypeMismatch {
                                    expected: "map key segment".to_string(),
                                    actual: "wildcard".to_string(),
                                }
                            })?;
                            out.push(
                                PathItem::name(&property.name)
                                    .with_predicate(Predicate::eq(map_key, key)),
                            );
                            element_ctx(property.element_descriptor().expect("keyed map"))?
                        }
                        None => {
                            // Path ends at the map container itself.
                            out.push(item.clone());
                            Ctx::Opaque
                        }
                    }
                }
                Some(property) => {
                    out.push(item.clone());
                    step_into(&property)?
                }
                None => {
                    out.push(item.clone());
                    Ctx::Opaque
                }
            },
            Ctx::Element(element) => {
                out.push(item.clone());
                element_ctx(&element)?
            }
            Ctx::Opaque => {
                out.push(item.clone());
                Ctx::Opaque
            }
        };
    }
    Ok(Path::from_items(out))
}

/// Translates a persistable path back into the simple (object-graph) form.
pub fn to_simple(path: &Path, root: &Arc<ClassSchema>) -> Result<Path, SchemaError> {
    let mut ctx = Ctx::Record(root.clone());
    let mut out: Vec<PathItem> = Vec::new();
    for item in path.items() {
        ctx = match ctx {
            Ctx::Record(schema) => match property_of(&schema, item) {
                Some(property) if is_keyed_record_map(&property) => {
                    let map_key = property.map_key.clone().expect("keyed map has a key");
                    let key_predicate = item
                        .predicates
                        .iter()
                        .find(|p| p.op == PredicateOp::Eq && p.field == map_key)
                        .cloned();
                    match key_predicate {
                        Some(predicate) => {
                            out.push(PathItem::name(&property.name));
                            out.push(PathItem::name(predicate_value_text(&predicate.value)));
                            element_ctx(property.element_descriptor().expect("keyed map"))?
                        }
                        None => {
                            out.push(item.clone());
                            step_into(&property)?
                        }
                    }
                }
                Some(property) => {
                    out.push(item.clone());
                    step_into(&property)?
                }
                None => {
                    out.push(item.clone());
                    Ctx::Opaque
                }
            },
            Ctx::Element(element) => {
                out.push(item.clone());
                element_ctx(&element)?
            }
            Ctx::Opaque => {
                out.push(item.clone());
                Ctx::Opaque
            }
        };
    }
    Ok(Path::from_items(out))
}
