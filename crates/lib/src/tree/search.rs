//! Lazy, restartable search over a document tree.
//!
//! [`SearchIter`] performs a depth-first traversal guided by a path pattern
//! containing literal names, `*` wildcards, and `[field=value]` predicates,
//! yielding every subtree whose location matches. Work happens on demand in
//! `next()`; nothing is visited ahead of consumption. The iterator owns a
//! snapshot of its input and is `Clone`, so a search can be restarted (or
//! forked mid-way) without touching the store again.

use crate::tree::{ConfigNode, Path, PathItem, Segment};

/// Depth-first lazy search over a [`ConfigNode`] tree.
#[derive(Debug, Clone)]
pub struct SearchIter {
    pattern: Vec<PathItem>,
    stack: Vec<Frame>,
}

#[derive(Debug, Clone)]
struct Frame {
    node: ConfigNode,
    depth: usize,
}

impl SearchIter {
    pub(crate) fn new(root: ConfigNode, pattern: Path) -> Self {
        Self {
            pattern: pattern.items().to_vec(),
            stack: vec![Frame {
                node: root,
                depth: 0,
            }],
        }
    }

    /// An iterator that yields nothing.
    pub fn empty() -> Self {
        Self {
            pattern: Vec::new(),
            stack: Vec::new(),
        }
    }
}

impl Iterator for SearchIter {
    type Item = ConfigNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            if frame.depth == self.pattern.len() {
                return Some(frame.node);
            }
            let item = &self.pattern[frame.depth];
            let mut matches = resolve_all(&frame.node, item);
            // Reversed push keeps yield order aligned with key order.
            matches.reverse();
            for node in matches {
                self.stack.push(Frame {
                    node,
                    depth: frame.depth + 1,
                });
            }
        }
        None
    }
}

/// All children of `node` matched by one pattern item, in deterministic
/// (key/positional) order.
fn resolve_all(node: &ConfigNode, item: &PathItem) -> Vec<ConfigNode> {
    match &item.segment {
        Segment::Name(name) => {
            let base = match node {
                ConfigNode::Object(map) => map.get(name),
                ConfigNode::List(list) => {
                    name.parse::<usize>().ok().and_then(|i| list.get(i))
                }
                _ => None,
            };
            let Some(base) = base else {
                return Vec::new();
            };
            if item.predicates.is_empty() || item.predicates_match(base) {
                return vec![base.clone()];
            }
            entries_matching(base, item)
        }
        Segment::Wildcard => match node {
            ConfigNode::Object(map) => map
                .values()
                .filter(|v| item.predicates_match(v))
                .cloned()
                .collect(),
            ConfigNode::List(list) => list
                .iter()
                .filter(|v| item.predicates_match(v))
                .cloned()
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn entries_matching(container: &ConfigNode, item: &PathItem) -> Vec<ConfigNode> {
    match container {
        ConfigNode::Object(map) => map
            .values()
            .filter(|v| item.predicates_match(v))
            .cloned()
            .collect(),
        ConfigNode::List(list) => list
            .iter()
            .filter(|v| item.predicates_match(v))
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}
