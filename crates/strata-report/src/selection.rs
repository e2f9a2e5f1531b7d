//! Selection specifications for subset extraction.
//!
//! Selections come from the schema registry as plain JSON objects whose
//! nesting mirrors the documents they apply to. Only the member names
//! matter; whatever JSON sits at a leaf position is ignored, so schemas may
//! write `{"name": 1}` or `{"name": {}}` interchangeably.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Member name that matches every object field at its level.
pub const WILDCARD: &str = "*";

/// One node of a selection tree.
///
/// A node lists the member names to keep at its level. A kept member whose
/// node is a leaf (no children) is included with its entire subtree. The
/// [`WILDCARD`] name matches any member not named explicitly. Selections
/// pass through arrays unchanged: the node that selected an array applies
/// to each of its elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct SelectionNode {
    children: BTreeMap<String, SelectionNode>,
}

impl SelectionNode {
    /// True when this node has no children and therefore keeps the whole
    /// subtree beneath the member that selected it.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Resolves the selection for member `name`, falling back to the
    /// wildcard entry.
    pub fn child(&self, name: &str) -> Option<&SelectionNode> {
        self.children
            .get(name)
            .or_else(|| self.children.get(WILDCARD))
    }

    /// Member names listed at this level.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }
}

impl From<Value> for SelectionNode {
    fn from(value: Value) -> Self {
        let mut children = BTreeMap::new();
        if let Value::Object(map) = value {
            for (name, sub) in map {
                children.insert(name, SelectionNode::from(sub));
            }
        }
        SelectionNode { children }
    }
}

impl From<SelectionNode> for Value {
    fn from(node: SelectionNode) -> Self {
        Value::Object(
            node.children
                .into_iter()
                .map(|(name, sub)| (name, Value::from(sub)))
                .collect(),
        )
    }
}

/// The schema-designated searchable subset of a document.
///
/// `fields` selects values to copy verbatim; `keys` selects objects whose
/// member names (not values) are reported, as an array of strings. When a
/// position is matched by both, `fields` wins. Both trees are rooted at the
/// document root, so empty trees select nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetSelection {
    /// Values to copy into the subset.
    #[serde(default)]
    pub fields: SelectionNode,
    /// Objects whose key sets are reported in place of their values.
    #[serde(default)]
    pub keys: SelectionNode,
}

impl SubsetSelection {
    /// True when neither tree selects anything.
    pub fn is_empty(&self) -> bool {
        self.fields.is_leaf() && self.keys.is_leaf()
    }
}

/// Flat metadata to lift out of a document: metadata name to the dotted
/// path of the scalar holding its value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataSelection(pub BTreeMap<String, String>);

impl MetadataSelection {
    /// True when no metadata is requested.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
