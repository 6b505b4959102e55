//! The in-memory document tree model.
//!
//! This module provides [`ConfigNode`], the sole serialized representation
//! exchanged with storage backends. A node is a tagged value: a primitive
//! (`Null`/`Bool`/`Int`/`Double`/`Text`), an ordered [`List`](ConfigNode::List)
//! of nodes, or an [`Object`](ConfigNode::Object) mapping string keys to
//! nodes (entry order is irrelevant; storage is sorted for determinism).
//!
//! Nodes are addressed with [`Path`] expressions (see [`path`]) and searched
//! lazily with [`search::SearchIter`]. Byte arrays have no variant of their
//! own: they travel as base64 `Text` primitives.
//!
//! # Addressing semantics
//!
//! - `get_at` on a missing path returns absence, not an error.
//! - `replace_at` creates missing intermediate objects for plain name
//!   segments; predicate segments must already resolve.
//! - `remove_at` on a missing leaf is a no-op, but a missing parent
//!   container is an error.
//! - List elements are addressed positionally (a decimal segment) or via
//!   predicate, never by a declared key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod path;
pub mod search;

pub use errors::TreeError;
pub use path::{Path, PathItem, Predicate, PredicateOp, Segment};
pub use search::SearchIter;

/// A document tree node: the serialized value exchanged with backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    /// Null/absent value
    Null,
    /// Boolean primitive
    Bool(bool),
    /// Integer primitive
    Int(i64),
    /// Floating-point primitive
    Double(f64),
    /// Text primitive (also carries base64-encoded byte arrays)
    Text(String),
    /// Ordered sequence of nodes
    List(Vec<ConfigNode>),
    /// Mapping of string keys to nodes
    Object(BTreeMap<String, ConfigNode>),
}

impl Default for ConfigNode {
    fn default() -> Self {
        ConfigNode::Null
    }
}

impl ConfigNode {
    /// Creates an empty object node.
    pub fn object() -> Self {
        ConfigNode::Object(BTreeMap::new())
    }

    /// Creates an empty list node.
    pub fn list() -> Self {
        ConfigNode::List(Vec::new())
    }

    /// Returns a human-readable name for this node's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigNode::Null => "null",
            ConfigNode::Bool(_) => "bool",
            ConfigNode::Int(_) => "int",
            ConfigNode::Double(_) => "double",
            ConfigNode::Text(_) => "text",
            ConfigNode::List(_) => "list",
            ConfigNode::Object(_) => "object",
        }
    }

    /// Returns true if this is a primitive (non-container) node.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, ConfigNode::List(_) | ConfigNode::Object(_))
    }

    /// Returns true if this is a list or object node.
    pub fn is_container(&self) -> bool {
        matches!(self, ConfigNode::List(_) | ConfigNode::Object(_))
    }

    /// Returns true if this is the null node.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    /// Returns true if this is a container with no entries.
    pub fn is_empty_container(&self) -> bool {
        match self {
            ConfigNode::List(l) => l.is_empty(),
            ConfigNode::Object(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Attempts to view this node as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to view this node as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigNode::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to view this node as a double.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            ConfigNode::Double(d) => Some(*d),
            ConfigNode::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to view this node as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigNode::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to view this node as a list.
    pub fn as_list(&self) -> Option<&Vec<ConfigNode>> {
        match self {
            ConfigNode::List(l) => Some(l),
            _ => None,
        }
    }

    /// Attempts to view this node as a mutable list.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<ConfigNode>> {
        match self {
            ConfigNode::List(l) => Some(l),
            _ => None,
        }
    }

    /// Attempts to view this node as an object map.
    pub fn as_object(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Attempts to view this node as a mutable object map.
    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Gets a direct child of an object node by key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&ConfigNode> {
        self.as_object().and_then(|m| m.get(key.as_ref()))
    }

    /// Gets a mutable direct child of an object node by key.
    pub fn get_mut(&mut self, key: impl AsRef<str>) -> Option<&mut ConfigNode> {
        self.as_object_mut().and_then(|m| m.get_mut(key.as_ref()))
    }

    /// Inserts a child into an object node, returning the previous value.
    ///
    /// Has no effect on non-object nodes.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ConfigNode>,
    ) -> Option<ConfigNode> {
        self.as_object_mut()
            .and_then(|m| m.insert(key.into(), value.into()))
    }

    /// Removes a child from an object node, returning it.
    pub fn remove_key(&mut self, key: impl AsRef<str>) -> Option<ConfigNode> {
        self.as_object_mut().and_then(|m| m.remove(key.as_ref()))
    }

    /// Builder-style insert for object construction.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigNode>) -> Self {
        self.insert(key, value);
        self
    }

    /// Primitive equality that treats `Int` and `Double` as one numeric
    /// domain, used by path predicates.
    pub fn primitive_eq(&self, other: &ConfigNode) -> bool {
        match (self, other) {
            (ConfigNode::Int(a), ConfigNode::Double(b))
            | (ConfigNode::Double(b), ConfigNode::Int(a)) => (*a as f64) == *b,
            (a, b) => a == b,
        }
    }

    /// Resolves the node addressed by `path`, or `None` if any step is
    /// missing. Absence is not an error.
    pub fn get_at(&self, path: &Path) -> Option<&ConfigNode> {
        let mut current = self;
        for item in path.items() {
            current = resolve_first(current, item)?;
        }
        Some(current)
    }

    /// Returns true if `path` resolves to a node.
    pub fn exists_at(&self, path: &Path) -> bool {
        self.get_at(path).is_some()
    }

    /// Replaces the node addressed by `path` with `node`.
    ///
    /// Missing intermediate objects are created for plain name segments;
    /// a predicate or wildcard segment that does not resolve is
    /// [`TreeError::NotFound`]. Replacing at the root path replaces the
    /// whole tree.
    pub fn replace_at(&mut self, path: &Path, node: ConfigNode) -> Result<(), TreeError> {
        if path.is_root() {
            *self = node;
            return Ok(());
        }
        let parent_path = path.parent().expect("non-root path has a parent");
        let last = path.last().expect("non-root path has a last item");
        let parent = self.walk_or_create(&parent_path)?;
        match locate(parent, last) {
            Some(Location {
                key: container_key,
                entry: Some(entry_key),
            }) => {
                let container = parent
                    .get_mut(&container_key)
                    .expect("located container exists");
                apply_entry(container, entry_key, node);
                Ok(())
            }
            Some(Location { key, entry: None }) => {
                match parent {
                    ConfigNode::List(list) => {
                        if let Ok(index) = key.parse::<usize>()
                            && index < list.len()
                        {
                            list[index] = node;
                        }
                    }
                    _ => {
                        parent.insert(key, node);
                    }
                }
                Ok(())
            }
            None => match (last.as_name(), last.predicates.is_empty()) {
                // A plain name that does not resolve yet is an insert.
                (Some(name), true) => {
                    if parent.as_object_mut().is_none() {
                        return Err(TreeError::NotAContainer {
                            path: parent_path.to_string(),
                            actual: parent.type_name().to_string(),
                        });
                    }
                    parent.insert(name, node);
                    Ok(())
                }
                _ => Err(TreeError::NotFound {
                    path: path.to_string(),
                }),
            },
        }
    }

    /// Removes the node addressed by `path`.
    ///
    /// Removing a missing leaf is a no-op; a missing parent container is
    /// [`TreeError::NotFound`].
    pub fn remove_at(&mut self, path: &Path) -> Result<(), TreeError> {
        if path.is_root() {
            *self = ConfigNode::object();
            return Ok(());
        }
        let parent_path = path.parent().expect("non-root path has a parent");
        let last = path.last().expect("non-root path has a last item");
        let Some(_) = self.get_at(&parent_path) else {
            return Err(TreeError::NotFound {
                path: parent_path.to_string(),
            });
        };
        let parent = self
            .get_at_mut(&parent_path)
            .expect("parent resolved immutably");
        match locate(parent, last) {
            Some(Location {
                key: container_key,
                entry: Some(entry_key),
            }) => {
                let container = parent
                    .get_mut(&container_key)
                    .expect("located container exists");
                remove_entry(container, entry_key);
            }
            Some(Location { key, entry: None }) => match parent {
                ConfigNode::List(list) => {
                    if let Ok(index) = key.parse::<usize>()
                        && index < list.len()
                    {
                        list.remove(index);
                    }
                }
                _ => {
                    parent.remove_key(key);
                }
            },
            None => {} // leaf already absent
        }
        Ok(())
    }

    /// Lazily searches this tree for every subtree matching `pattern`.
    ///
    /// The returned iterator is restartable (it is `Clone` and owns its
    /// state) and finite; traversal is depth-first in key order.
    pub fn search(&self, pattern: &Path) -> SearchIter {
        SearchIter::new(self.clone(), pattern.clone())
    }

    /// Merges `incoming` into this node with partial-overwrite semantics:
    /// object children present here but absent from `incoming` are
    /// preserved; everything else is overwritten.
    pub fn merge_from(&mut self, incoming: ConfigNode) {
        match (self, incoming) {
            (ConfigNode::Object(existing), ConfigNode::Object(new)) => {
                for (key, value) in new {
                    match existing.get_mut(&key) {
                        Some(slot) => slot.merge_from(value),
                        None => {
                            existing.insert(key, value);
                        }
                    }
                }
            }
            (slot, incoming) => *slot = incoming,
        }
    }

    fn get_at_mut(&mut self, path: &Path) -> Option<&mut ConfigNode> {
        let mut current = self;
        for item in path.items() {
            let location = locate(current, item)?;
            current = step_mut(current, location)?;
        }
        Some(current)
    }

    /// Walks to `path`, creating missing intermediate objects for plain
    /// name segments.
    fn walk_or_create(&mut self, path: &Path) -> Result<&mut ConfigNode, TreeError> {
        let mut current = self;
        let mut walked = Path::root();
        for item in path.items() {
            walked = walked.child_item(item.clone());
            if locate(current, item).is_none() {
                match (item.as_name(), item.predicates.is_empty()) {
                    (Some(name), true) => {
                        let map = current.as_object_mut().ok_or_else(|| {
                            TreeError::NotAContainer {
                                path: walked.to_string(),
                                actual: "non-object".to_string(),
                            }
                        })?;
                        map.insert(name.to_string(), ConfigNode::object());
                    }
                    _ => {
                        return Err(TreeError::NotFound {
                            path: walked.to_string(),
                        });
                    }
                }
            }
            let location = locate(current, item).expect("just created or located");
            current = step_mut(current, location).expect("location is valid");
        }
        Ok(current)
    }
}

/// A concrete, index-free description of where a path item landed inside a
/// node: the container child key, plus the selected entry within that
/// container when predicates narrowed the item further.
struct Location {
    key: String,
    entry: Option<EntryKey>,
}

impl Location {
    fn at(key: impl Into<String>, entry: Option<EntryKey>) -> Self {
        Self {
            key: key.into(),
            entry,
        }
    }
}

enum EntryKey {
    MapKey(String),
    ListIndex(usize),
}

fn resolve_first<'a>(node: &'a ConfigNode, item: &PathItem) -> Option<&'a ConfigNode> {
    match &item.segment {
        Segment::Name(name) => {
            let base = match node {
                ConfigNode::Object(map) => map.get(name),
                ConfigNode::List(list) => name.parse::<usize>().ok().and_then(|i| list.get(i)),
                _ => None,
            }?;
            select_in(base, item)
        }
        Segment::Wildcard => match node {
            ConfigNode::Object(map) => map.values().find(|v| item.predicates_match(v)),
            ConfigNode::List(list) => list.iter().find(|v| item.predicates_match(v)),
            _ => None,
        },
    }
}

/// Applies an item's predicates against the resolved child: the child
/// itself when it matches directly, otherwise the first matching entry of
/// the child container.
fn select_in<'a>(base: &'a ConfigNode, item: &PathItem) -> Option<&'a ConfigNode> {
    if item.predicates.is_empty() || item.predicates_match(base) {
        return Some(base);
    }
    match base {
        ConfigNode::Object(map) => map.values().find(|v| item.predicates_match(v)),
        ConfigNode::List(list) => list.iter().find(|v| item.predicates_match(v)),
        _ => None,
    }
}

fn locate(node: &ConfigNode, item: &PathItem) -> Option<Location> {
    let (key, base) = match &item.segment {
        Segment::Name(name) => match node {
            ConfigNode::Object(map) => (name.clone(), map.get(name)?),
            ConfigNode::List(list) => {
                let index = name.parse::<usize>().ok()?;
                // Positional addressing into a list has no named container
                // level; model it as an entry of the node itself.
                let _ = list.get(index)?;
                return Some(Location::at(name.clone(), None));
            }
            _ => return None,
        },
        Segment::Wildcard => match node {
            ConfigNode::Object(map) => {
                let (k, v) = map.iter().find(|(_, v)| item.predicates_match(v))?;
                (k.clone(), v)
            }
            _ => return None,
        },
    };
    if item.predicates.is_empty() || item.predicates_match(base) {
        return Some(Location::at(key, None));
    }
    match base {
        ConfigNode::Object(map) => {
            let entry = map
                .iter()
                .find(|(_, v)| item.predicates_match(v))
                .map(|(k, _)| EntryKey::MapKey(k.clone()))?;
            Some(Location::at(key, Some(entry)))
        }
        ConfigNode::List(list) => {
            let index = list.iter().position(|v| item.predicates_match(v))?;
            Some(Location::at(key, Some(EntryKey::ListIndex(index))))
        }
        _ => None,
    }
}

fn step_mut(node: &mut ConfigNode, location: Location) -> Option<&mut ConfigNode> {
    let Location { key, entry } = location;
    let base = match node {
        ConfigNode::Object(map) => map.get_mut(&key)?,
        ConfigNode::List(list) => {
            let index = key.parse::<usize>().ok()?;
            list.get_mut(index)?
        }
        _ => return None,
    };
    match entry {
        None => Some(base),
        Some(EntryKey::MapKey(k)) => base.as_object_mut()?.get_mut(&k),
        Some(EntryKey::ListIndex(i)) => base.as_list_mut()?.get_mut(i),
    }
}

fn apply_entry(container: &mut ConfigNode, entry: EntryKey, node: ConfigNode) {
    match (container, entry) {
        (ConfigNode::Object(map), EntryKey::MapKey(k)) => {
            map.insert(k, node);
        }
        (ConfigNode::List(list), EntryKey::ListIndex(i)) => {
            if i < list.len() {
                list[i] = node;
            }
        }
        _ => {}
    }
}

fn remove_entry(container: &mut ConfigNode, entry: EntryKey) {
    match (container, entry) {
        (ConfigNode::Object(map), EntryKey::MapKey(k)) => {
            map.remove(&k);
        }
        (ConfigNode::List(list), EntryKey::ListIndex(i)) => {
            if i < list.len() {
                list.remove(i);
            }
        }
        _ => {}
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigNode::Null => write!(f, "null"),
            ConfigNode::Bool(b) => write!(f, "{b}"),
            ConfigNode::Int(i) => write!(f, "{i}"),
            ConfigNode::Double(d) => write!(f, "{d}"),
            ConfigNode::Text(s) => write!(f, "{s}"),
            container => {
                let rendered = serde_json::to_string(container)
                    .unwrap_or_else(|_| container.type_name().to_string());
                write!(f, "{rendered}")
            }
        }
    }
}

impl From<bool> for ConfigNode {
    fn from(b: bool) -> Self {
        ConfigNode::Bool(b)
    }
}

impl From<i64> for ConfigNode {
    fn from(i: i64) -> Self {
        ConfigNode::Int(i)
    }
}

impl From<i32> for ConfigNode {
    fn from(i: i32) -> Self {
        ConfigNode::Int(i64::from(i))
    }
}

impl From<f64> for ConfigNode {
    fn from(d: f64) -> Self {
        ConfigNode::Double(d)
    }
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::Text(s.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(s: String) -> Self {
        ConfigNode::Text(s)
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(list: Vec<ConfigNode>) -> Self {
        ConfigNode::List(list)
    }
}

impl From<BTreeMap<String, ConfigNode>> for ConfigNode {
    fn from(map: BTreeMap<String, ConfigNode>) -> Self {
        ConfigNode::Object(map)
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigNode::Null,
            serde_json::Value::Bool(b) => ConfigNode::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigNode::Int(i)
                } else {
                    ConfigNode::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => ConfigNode::Text(s),
            serde_json::Value::Array(items) => {
                ConfigNode::List(items.into_iter().map(ConfigNode::from).collect())
            }
            serde_json::Value::Object(map) => ConfigNode::Object(
                map.into_iter().map(|(k, v)| (k, ConfigNode::from(v))).collect(),
            ),
        }
    }
}

impl From<&ConfigNode> for serde_json::Value {
    fn from(node: &ConfigNode) -> Self {
        match node {
            ConfigNode::Null => serde_json::Value::Null,
            ConfigNode::Bool(b) => serde_json::Value::Bool(*b),
            ConfigNode::Int(i) => serde_json::Value::from(*i),
            ConfigNode::Double(d) => serde_json::Value::from(*d),
            ConfigNode::Text(s) => serde_json::Value::String(s.clone()),
            ConfigNode::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            ConfigNode::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}
