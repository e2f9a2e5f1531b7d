//! Streaming token substrate and canonical byte form for Strata documents.
//!
//! This crate provides:
//! - A lazy, forward-only [`Token`] stream abstraction over structured documents
//! - A streaming lexer that tokenizes JSON from any `io::Read`
//! - A canonical writer that re-emits tokens as deterministic UTF-8 bytes
//! - A sort-order checking decorator (the canonicalization fast path)
//! - A bounded-memory key sorter with byte-range copying for large inputs
//! - Content digest primitives for addressing canonical bytes
//!
//! Canonical form contract: object field names in each scope sorted strictly
//! ascending by Unicode code point, array order preserved, one canonical
//! number and string encoding. Same logical document, identical bytes.
//!
#![deny(missing_docs)]

/// Shared codec configuration for document processing.
pub mod codec;
/// Digest primitives for content-addressing canonical bytes.
pub mod digest;
/// Error types for canonicalization operations.
pub mod errors;
/// Streaming JSON lexer producing document tokens.
pub mod lexer;
/// Key sorter producing canonical byte output from unsorted input.
pub mod sorter;
/// Sort-order checking token source decorator.
pub mod sortcheck;
/// Token model and source traits.
pub mod token;
/// Validation helpers shared by canonical primitives.
pub mod validation;
/// Canonical token writer and counting sink.
pub mod writer;

pub use codec::DocumentCodec;
pub use digest::{digest_canonical_bytes, Digest, DigestAlg};
pub use errors::CanonicalError;
pub use lexer::Lexer;
pub use sortcheck::SortCheckingSource;
pub use sorter::{sort_document, SortLimits, DEFAULT_MAX_KEY_MEMORY};
pub use token::{DocumentSource, FileDocument, InMemoryDocument, Token, TokenSource};
pub use validation::ValidationError;
pub use writer::{pump, CanonicalWriter, CountingWriter};
