use thiserror::Error;

use strata_canonical::CanonicalError;

/// Errors raised while extracting subsets or metadata.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The extracted output grew past the caller's byte budget. The same
    /// limit always fails at the same point in the walk regardless of
    /// whether the canonical bytes live in memory or on disk.
    #[error("extracted subset exceeds the {limit} byte limit")]
    SizeLimit {
        /// The budget that was exceeded.
        limit: u64,
    },

    /// Tokenization of the source document failed mid-walk.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

/// Errors raised by report operations.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Canonicalization or relabeling failed.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    /// Subset or metadata extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// A temp-file or cache I/O operation failed.
    #[error("report i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Rehydrating extracted output as a JSON value failed.
    #[error("report produced unparseable output: {0}")]
    Json(#[from] serde_json::Error),

    /// The absolute-id mapping is assigned exactly once per report.
    #[error("the absolute id mapping has already been set")]
    MappingAlreadySet,
}
