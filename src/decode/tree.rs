//! Response tree flattening
//!
//! The API returns syntactically uniform trees whose effective shape (a
//! record, a list of records, or a mixed struct) only shows when the children
//! are inspected. The shape is classified once per node and the decoder
//! dispatches on it.

use crate::decode::record::{FieldFilter, NormalizedRecord};
use crate::domain::Element;
use indexmap::IndexMap;

/// What the children of a uniform parent look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// Every child is a leaf
    Leaves,
    /// Every child has children of its own
    Parents,
}

/// Structural classification of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Leaf,
    UniformParent(ChildKind),
    MixedParent,
}

impl NodeShape {
    /// Classify a node by its children. Every node maps to exactly one shape.
    pub fn of(node: &Element) -> Self {
        let children = node.children();
        if children.is_empty() {
            return NodeShape::Leaf;
        }
        let parents = children.iter().filter(|c| c.has_children()).count();
        if parents == 0 {
            NodeShape::UniformParent(ChildKind::Leaves)
        } else if parents == children.len() {
            NodeShape::UniformParent(ChildKind::Parents)
        } else {
            NodeShape::MixedParent
        }
    }
}

/// Flatten a response node into a `NormalizedRecord`.
///
/// - leaf: the raw element (`{name, content}`)
/// - parent of leaves: `{node.name: {child.name: child.content, ..}}`,
///   restricted to `filter` when one is given
/// - parent of parents: the decoded children, in order
/// - mixed: `{child.name: content | decoded child}`
///
/// The filter only prunes records of leaves; it is passed down unchanged
/// otherwise. Repeated child names keep the last value.
pub fn decode(node: &Element, filter: Option<&FieldFilter>) -> NormalizedRecord {
    match NodeShape::of(node) {
        NodeShape::Leaf => NormalizedRecord::raw_element(node),
        NodeShape::UniformParent(ChildKind::Leaves) => {
            let fields: IndexMap<String, NormalizedRecord> = node
                .children()
                .iter()
                .filter(|c| filter.map_or(true, |f| f.contains(c.name())))
                .map(|c| {
                    (
                        c.name().to_string(),
                        NormalizedRecord::Scalar(c.content().to_string()),
                    )
                })
                .collect();
            let mut wrapper = IndexMap::with_capacity(1);
            wrapper.insert(node.name().to_string(), NormalizedRecord::Map(fields));
            NormalizedRecord::Map(wrapper)
        }
        NodeShape::UniformParent(ChildKind::Parents) => NormalizedRecord::List(
            node.children().iter().map(|c| decode(c, filter)).collect(),
        ),
        NodeShape::MixedParent => {
            let mut map = IndexMap::with_capacity(node.children().len());
            for child in node.children() {
                let value = if child.has_children() {
                    decode(child, filter)
                } else {
                    NormalizedRecord::Scalar(child.content().to_string())
                };
                map.insert(child.name().to_string(), value);
            }
            NormalizedRecord::Map(map)
        }
    }
}
