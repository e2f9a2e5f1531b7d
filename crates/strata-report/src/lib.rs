//! Validation report for schema-typed Strata documents.
//!
//! A schema validator hands this crate its result for one document instance:
//! an error list and the identifier occurrences it flagged. The report then
//! owns the document's path to durable storage:
//! - relabel flagged identifiers using a caller-supplied mapping
//! - produce canonical bytes (sorted keys) within a memory budget, spilling
//!   to disk for large documents
//! - extract the schema-designated searchable subset and flat metadata
//!
//! All passes stream tokens; the document is never fully materialized.
//!
//! ## State machine
//!
//! Built (errors + tree, no cache) → Canonicalized (memory or disk cache) →
//! Resolved (absolute-id mapping set, which invalidates the cache and returns
//! the report to Built). Dropping the report deletes any temp file.
//!
#![deny(missing_docs)]

/// Error types for report operations.
pub mod errors;
/// Streaming subset and metadata extraction.
pub mod extract;
/// Report orchestration and canonicalization cache.
pub mod report;
/// Subset and metadata selection specifications.
pub mod selection;
/// Temp-file facility for disk spill.
pub mod tempfiles;

pub use errors::{ExtractError, ReportError};
pub use extract::{extract, Extraction};
pub use report::{CanonicalSummary, ValidationReport, Writable};
pub use selection::{MetadataSelection, SelectionNode, SubsetSelection, WILDCARD};
pub use tempfiles::TempFileManager;
