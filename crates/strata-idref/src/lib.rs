//! Identifier reference model and streaming relabeling for Strata documents.
//!
//! A schema validator flags document locations that hold cross-document
//! identifiers. This crate models those occurrences ([`IdReference`]), builds
//! a shadow tree mirroring the document shape at identifier positions
//! ([`IdRefNode`]), and rewrites identifier tokens in a single streaming pass
//! ([`RelabelingSource`]) using a caller-supplied original-id → absolute-id
//! mapping.
//!
//! The tree, not a depth-ordering pass, disambiguates position: deeper and
//! shallower identifiers resolve correctly in one pass because the tree
//! cursor advances in lock-step with the token stream. A depth-grouped list
//! view remains derivable from the tree for consumers that reason about
//! identifiers independent of streaming, but it never drives substitution.
//!
#![deny(missing_docs)]

/// Identifier reference descriptors and document paths.
pub mod reference;
/// Streaming relabeling token-source decorator.
pub mod relabel;
/// Shadow tree of identifier positions.
pub mod tree;

pub use reference::{IdReference, PathSegment};
pub use relabel::{RelabelError, RelabelingSource};
pub use tree::IdRefNode;
