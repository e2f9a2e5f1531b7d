use thiserror::Error;

/// Errors that can occur while tokenizing, sorting, or re-emitting a document.
#[derive(Error, Debug)]
pub enum CanonicalError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Underlying bytes are not a well-formed document.
    #[error("malformed document at byte {offset}: {reason}")]
    Malformed {
        /// Byte offset where the problem was detected.
        offset: u64,
        /// Reason for the failure.
        reason: String,
    },
    /// Two sibling field names compare equal after sorting.
    #[error("duplicate sibling key at {path}")]
    KeyCollision {
        /// Path of the colliding key, from the document root.
        path: String,
    },
    /// The key structure for one object scope exceeds the configured memory
    /// bound and no disk-spill facility is available to fall back on.
    #[error("sort keys at {path} exceed the memory limit of {limit} bytes")]
    TooManyKeys {
        /// Path of the offending object scope.
        path: String,
        /// Configured memory bound in bytes.
        limit: u64,
    },
    /// Identifier relabeling failed mid-stream.
    #[error("identifier relabeling failed: {0}")]
    Relabel(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}
