//! The optimistic-locking hash calculator.
//!
//! Computes, bottom-up over a schema-guided traversal of a document tree,
//! a deterministic digest for every record that opts into locking (declares
//! the reserved hash property). The combination rule is load-bearing and
//! pinned by tests:
//!
//! - a leaf contributes `sha256(name ++ canonical_value)`, folded into the
//!   current scope accumulator by byte-wise wrapping addition;
//! - record children and map entries contribute
//!   `sha256(key ++ hex(child_digest))` — addition makes these
//!   order-insensitive, so renaming an unrelated sibling never changes an
//!   entry's own digest;
//! - list elements contribute `sha256(decimal_index ++ hex(elem_digest))`
//!   — the index prefix makes lists order-sensitive;
//! - leaves tagged [`PropertyTag::OlockIgnore`] (the hash property itself
//!   among them) are excluded, which is what makes recomputation
//!   idempotent.
//!
//! The digest detects concurrent modification only. Byte-wise addition is
//! not a cryptographic combiner; nothing here resists tampering and
//! callers must not treat the hash as an integrity seal.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::trace;

pub mod errors;

pub use errors::LockError;

use crate::Result;
use crate::constants::{HASH_KEY, UUID_KEY};
use crate::schema::{ClassSchema, ContainerKind, PropertyTag, schema_by_name};
use crate::tree::ConfigNode;

const RECORD_MARKER: &str = "#record";
const LIST_MARKER: &str = "#list";
const MAP_MARKER: &str = "#map";

type Digest32 = [u8; 32];

fn sha(parts: &[&str]) -> Digest32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}

/// Explicit stack of partial digests, one per currently open scope.
struct DigestStack {
    stack: Vec<Digest32>,
}

impl DigestStack {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn open(&mut self, marker: &str) {
        self.stack.push(sha(&[marker]));
    }

    fn close(&mut self) -> Digest32 {
        self.stack.pop().expect("close without open scope")
    }

    /// Byte-wise wrapping addition into the top-of-stack accumulator:
    /// additive, hence order-insensitive within one scope.
    fn fold(&mut self, contribution: Digest32) {
        let top = self.stack.last_mut().expect("fold without open scope");
        for (slot, byte) in top.iter_mut().zip(contribution.iter()) {
            *slot = slot.wrapping_add(*byte);
        }
    }

    fn fold_leaf(&mut self, name: &str, value: &str) {
        self.fold(sha(&[name, value]));
    }

    fn fold_child(&mut self, key: &str, child: &Digest32) {
        self.fold(sha(&[key, &hex::encode(child)]));
    }
}

/// Schema-guided hash calculator for optimistic locking.
pub struct HashCalculator;

impl HashCalculator {
    /// Computes the digest of a record subtree without modifying it.
    pub fn compute(node: &ConfigNode, schema: &Arc<ClassSchema>) -> Result<String> {
        let mut scratch = node.clone();
        Self::apply(&mut scratch, schema)
    }

    /// Recomputes and stamps the reserved hash property into every
    /// locking-enabled record of the subtree, returning the root record's
    /// digest.
    pub fn apply(node: &mut ConfigNode, schema: &Arc<ClassSchema>) -> Result<String> {
        let mut stack = DigestStack::new();
        let digest = record_scope(node, schema, &mut stack)?;
        let rendered = hex::encode(digest);
        if schema.has_olock()
            && let Some(map) = node.as_object_mut()
        {
            map.insert(HASH_KEY.to_string(), ConfigNode::Text(rendered.clone()));
        }
        trace!(class = schema.class_name(), digest = %rendered, "computed subtree hash");
        Ok(rendered)
    }

    /// Compares the hash carried by `incoming` (captured at read time)
    /// against the freshly computed hash of `existing` (the current
    /// on-disk subtree). A mismatch is a conflict; an incoming node
    /// without a hash opted out of locking.
    pub fn check(
        existing: &ConfigNode,
        incoming: &ConfigNode,
        schema: &Arc<ClassSchema>,
        path: &str,
    ) -> Result<()> {
        let Some(expected) = incoming.get(HASH_KEY).and_then(|n| n.as_text()) else {
            return Ok(());
        };
        let actual = Self::compute(existing, schema)?;
        if actual != expected {
            return Err(LockError::Conflict {
                path: path.to_string(),
                expected: expected.to_string(),
                actual,
            }
            .into());
        }
        Ok(())
    }
}

fn canonical_text(node: &ConfigNode) -> Option<String> {
    match node {
        ConfigNode::Bool(b) => Some(b.to_string()),
        ConfigNode::Int(i) => Some(i.to_string()),
        ConfigNode::Double(d) => Some(d.to_string()),
        ConfigNode::Text(s) => Some(s.clone()),
        _ => None,
    }
}

fn record_scope(
    node: &mut ConfigNode,
    schema: &Arc<ClassSchema>,
    stack: &mut DigestStack,
) -> Result<Digest32> {
    stack.open(RECORD_MARKER);
    // Collect names first; the map is re-borrowed mutably per property.
    let property_count = schema.properties().len();
    for index in 0..property_count {
        let property = &schema.properties()[index];
        if property.has_tag(PropertyTag::OlockIgnore) {
            continue;
        }
        let name = property.name.clone();
        let kind = property.kind;
        let Some(child) = node.get_mut(&name) else {
            continue;
        };
        match kind {
            ContainerKind::Scalar => {
                if let Some(text) = canonical_text(child) {
                    stack.fold_leaf(&name, &text);
                }
            }
            ContainerKind::Record => {
                let property = &schema.properties()[index];
                if let Some(child_schema) = property.record_schema()? {
                    let digest = record_scope(child, &child_schema, stack)?;
                    stamp(child, &child_schema, &digest);
                    stack.fold_child(&name, &digest);
                } else {
                    let digest = structural_scope(child, stack);
                    stack.fold_child(&name, &digest);
                }
            }
            ContainerKind::Array | ContainerKind::List | ContainerKind::Set => {
                let element_schema = schema.properties()[index]
                    .element_descriptor()
                    .filter(|e| e.kind == ContainerKind::Record)
                    .map(|e| e.record_schema())
                    .transpose()?
                    .flatten();
                let digest = list_scope(child, element_schema.as_ref(), stack)?;
                stack.fold_child(&name, &digest);
            }
            ContainerKind::Map => {
                let element_schema = schema.properties()[index]
                    .element_descriptor()
                    .filter(|e| e.kind == ContainerKind::Record)
                    .map(|e| e.record_schema())
                    .transpose()?
                    .flatten();
                let digest = map_scope(child, element_schema.as_ref(), stack)?;
                stack.fold_child(&name, &digest);
            }
            ContainerKind::ExtensionMap => {
                let digest = extension_scope(child, stack)?;
                stack.fold_child(&name, &digest);
            }
        }
    }
    Ok(stack.close())
}

fn stamp(child: &mut ConfigNode, schema: &Arc<ClassSchema>, digest: &Digest32) {
    if schema.has_olock()
        && let Some(map) = child.as_object_mut()
    {
        map.insert(HASH_KEY.to_string(), ConfigNode::Text(hex::encode(digest)));
    }
}

fn list_scope(
    node: &mut ConfigNode,
    element_schema: Option<&Arc<ClassSchema>>,
    stack: &mut DigestStack,
) -> Result<Digest32> {
    stack.open(LIST_MARKER);
    if let Some(items) = node.as_list_mut() {
        for (position, item) in items.iter_mut().enumerate() {
            let index_key = position.to_string();
            match element_schema {
                Some(schema) if item.as_object().is_some() => {
                    let digest = record_scope(item, schema, stack)?;
                    stamp(item, schema, &digest);
                    stack.fold_child(&index_key, &digest);
                }
                _ => match canonical_text(item) {
                    Some(text) => stack.fold_leaf(&index_key, &text),
                    None => {
                        let digest = structural_scope(item, stack);
                        stack.fold_child(&index_key, &digest);
                    }
                },
            }
        }
    }
    Ok(stack.close())
}

fn map_scope(
    node: &mut ConfigNode,
    element_schema: Option<&Arc<ClassSchema>>,
    stack: &mut DigestStack,
) -> Result<Digest32> {
    stack.open(MAP_MARKER);
    if let Some(entries) = node.as_object_mut() {
        for (key, entry) in entries.iter_mut() {
            match element_schema {
                Some(schema) if entry.as_object().is_some() => {
                    let digest = record_scope(entry, schema, stack)?;
                    stamp(entry, schema, &digest);
                    stack.fold_child(key, &digest);
                }
                _ => match canonical_text(entry) {
                    Some(text) => stack.fold_leaf(key, &text),
                    None => {
                        let digest = structural_scope(entry, stack);
                        stack.fold_child(key, &digest);
                    }
                },
            }
        }
    }
    Ok(stack.close())
}

fn extension_scope(node: &mut ConfigNode, stack: &mut DigestStack) -> Result<Digest32> {
    stack.open(MAP_MARKER);
    if let Some(entries) = node.as_object_mut() {
        for (class_name, entry) in entries.iter_mut() {
            match schema_by_name(class_name) {
                Some(schema) => {
                    let digest = record_scope(entry, &schema, stack)?;
                    stamp(entry, &schema, &digest);
                    stack.fold_child(class_name, &digest);
                }
                None => {
                    let digest = structural_scope(entry, stack);
                    stack.fold_child(class_name, &digest);
                }
            }
        }
    }
    Ok(stack.close())
}

/// Fallback for subtrees the schema cannot describe: same fold rules,
/// driven by node shape alone. Reserved identity/hash keys are skipped so
/// recomputation stays idempotent.
fn structural_scope(node: &ConfigNode, stack: &mut DigestStack) -> Digest32 {
    match node {
        ConfigNode::Object(entries) => {
            stack.open(MAP_MARKER);
            for (key, entry) in entries {
                if key == HASH_KEY || key == UUID_KEY {
                    continue;
                }
                match canonical_text(entry) {
                    Some(text) => stack.fold_leaf(key, &text),
                    None => {
                        let digest = structural_scope(entry, stack);
                        stack.fold_child(key, &digest);
                    }
                }
            }
            stack.close()
        }
        ConfigNode::List(items) => {
            stack.open(LIST_MARKER);
            for (position, item) in items.iter().enumerate() {
                let index_key = position.to_string();
                match canonical_text(item) {
                    Some(text) => stack.fold_leaf(&index_key, &text),
                    None => {
                        let digest = structural_scope(item, stack);
                        stack.fold_child(&index_key, &digest);
                    }
                }
            }
            stack.close()
        }
        primitive => sha(&[&canonical_text(primitive).unwrap_or_default()]),
    }
}
