/// Process-wide document codec configuration.
///
/// The codec is immutable and stateless: one value is constructed once and
/// shared freely across concurrently processed reports. It only carries the
/// structural bounds every token source honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentCodec {
    /// Maximum container nesting depth accepted by token sources.
    pub max_depth: usize,
}

/// Default nesting depth bound.
pub const DEFAULT_MAX_DEPTH: usize = 512;

impl DocumentCodec {
    /// The standard codec used everywhere unless a caller overrides bounds.
    pub const STANDARD: DocumentCodec = DocumentCodec {
        max_depth: DEFAULT_MAX_DEPTH,
    };
}

impl Default for DocumentCodec {
    fn default() -> Self {
        Self::STANDARD
    }
}
