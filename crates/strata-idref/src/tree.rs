//! Shadow tree mirroring the document shape at identifier positions.
//!
//! The tree's paths are exactly the positions visited while tokenizing the
//! same document, which is what lets the relabeling pass advance a tree
//! cursor in lock-step with the token stream instead of re-resolving paths.

use std::collections::BTreeMap;

use crate::reference::{IdReference, PathSegment};

/// One node of the identifier shadow tree.
///
/// A node can carry a key occurrence (the field name leading to this node is
/// itself an identifier), a value occurrence (the value at this position is
/// an identifier), or neither when it only routes to deeper occurrences.
#[derive(Debug, Default)]
pub struct IdRefNode {
    fields: BTreeMap<String, IdRefNode>,
    items: BTreeMap<usize, IdRefNode>,
    key_ref: Option<IdReference>,
    value_ref: Option<IdReference>,
}

impl IdRefNode {
    /// Builds the tree from the validator's flat occurrence list.
    ///
    /// The validator reports at most one key and one value occurrence per
    /// position; if it ever repeats a position the first occurrence wins.
    pub fn build(refs: &[IdReference]) -> IdRefNode {
        let mut root = IdRefNode::default();
        for reference in refs {
            let mut node = &mut root;
            for segment in &reference.path {
                node = match segment {
                    PathSegment::Field(name) => {
                        node.fields.entry(name.clone()).or_default()
                    }
                    PathSegment::Index(i) => node.items.entry(*i).or_default(),
                };
            }
            let slot = if reference.is_mapping_key {
                &mut node.key_ref
            } else {
                &mut node.value_ref
            };
            if slot.is_none() {
                *slot = Some(reference.clone());
            }
        }
        root
    }

    /// Child node for an object member name.
    pub fn field(&self, name: &str) -> Option<&IdRefNode> {
        self.fields.get(name)
    }

    /// Child node for an array element position.
    pub fn item(&self, index: usize) -> Option<&IdRefNode> {
        self.items.get(&index)
    }

    /// The key occurrence attached to this node, if any.
    pub fn key_ref(&self) -> Option<&IdReference> {
        self.key_ref.as_ref()
    }

    /// The value occurrence attached to this node, if any.
    pub fn value_ref(&self) -> Option<&IdReference> {
        self.value_ref.as_ref()
    }

    /// True when the node routes nowhere and carries no occurrence.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.items.is_empty()
            && self.key_ref.is_none()
            && self.value_ref.is_none()
    }

    /// All occurrences reachable from this node, in tree order.
    pub fn references(&self) -> Vec<&IdReference> {
        let mut out = Vec::new();
        self.collect(0, &mut |_, r| out.push(r));
        out
    }

    /// Occurrences bucketed by nesting depth, shallow to deep.
    ///
    /// This is a read-only compatibility projection for consumers that
    /// reason about identifiers independent of streaming; substitution order
    /// is always driven by the tree itself.
    pub fn grouped_by_depth(&self) -> Vec<Vec<&IdReference>> {
        let mut buckets: Vec<Vec<&IdReference>> = Vec::new();
        self.collect(0, &mut |depth, r| {
            while buckets.len() <= depth {
                buckets.push(Vec::new());
            }
            buckets[depth].push(r);
        });
        buckets
    }

    fn collect<'a>(&'a self, depth: usize, visit: &mut impl FnMut(usize, &'a IdReference)) {
        if let Some(r) = &self.key_ref {
            visit(depth, r);
        }
        if let Some(r) = &self.value_ref {
            visit(depth, r);
        }
        for child in self.fields.values() {
            child.collect(depth + 1, visit);
        }
        for child in self.items.values() {
            child.collect(depth + 1, visit);
        }
    }
}
