use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Number;

use crate::codec::DocumentCodec;
use crate::errors::CanonicalError;
use crate::lexer::Lexer;

/// One unit of structured document content.
///
/// Tokens are produced and consumed transiently; they are never persisted.
/// Numbers carry their canonical value form ([`serde_json::Number`]), which
/// re-emits deterministically.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// An object member name.
    FieldName(String),
    /// A string value (unescaped).
    String(String),
    /// A number value.
    Number(Number),
    /// A boolean value.
    Bool(bool),
    /// A null value.
    Null,
}

impl Token {
    /// Short kind name used in error context.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::StartObject => "start-object",
            Token::EndObject => "end-object",
            Token::StartArray => "start-array",
            Token::EndArray => "end-array",
            Token::FieldName(_) => "field-name",
            Token::String(_) => "string",
            Token::Number(_) => "number",
            Token::Bool(_) => "bool",
            Token::Null => "null",
        }
    }

    /// Returns true for scalar value tokens.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Token::String(_) | Token::Number(_) | Token::Bool(_) | Token::Null
        )
    }
}

/// Lazy, forward-only sequence of document tokens.
///
/// `next_token` returns `Ok(None)` at end of stream. `close` is idempotent
/// and releases the underlying I/O; further reads return `Ok(None)`.
pub trait TokenSource {
    /// Advances to the next token.
    fn next_token(&mut self) -> Result<Option<Token>, CanonicalError>;
    /// Releases underlying I/O. Safe to call multiple times.
    fn close(&mut self);
}

impl<S: TokenSource + ?Sized> TokenSource for Box<S> {
    fn next_token(&mut self) -> Result<Option<Token>, CanonicalError> {
        (**self).next_token()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Ability to open a fresh [`TokenSource`] over the same logical document
/// repeatedly. Validation, relabeling, and extraction each take their own
/// independent pass.
pub trait DocumentSource {
    /// Opens a new token source positioned at the start of the document.
    fn open(&self) -> Result<Box<dyn TokenSource>, CanonicalError>;
}

/// Byte buffer with shared ownership, readable through `Cursor`.
#[derive(Debug, Clone)]
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Document held fully in memory. Cheap to clone; opening a source never
/// copies the bytes.
#[derive(Debug, Clone)]
pub struct InMemoryDocument {
    bytes: Arc<Vec<u8>>,
    codec: DocumentCodec,
}

impl InMemoryDocument {
    /// Wraps raw document bytes with the standard codec.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::with_codec(bytes, DocumentCodec::STANDARD)
    }

    /// Wraps raw document bytes with an explicit codec.
    pub fn with_codec(bytes: Vec<u8>, codec: DocumentCodec) -> Self {
        Self {
            bytes: Arc::new(bytes),
            codec,
        }
    }
}

impl DocumentSource for InMemoryDocument {
    fn open(&self) -> Result<Box<dyn TokenSource>, CanonicalError> {
        Ok(Box::new(Lexer::new(
            Cursor::new(SharedBytes(self.bytes.clone())),
            self.codec,
        )))
    }
}

/// Document stored in a file on disk.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
    codec: DocumentCodec,
}

impl FileDocument {
    /// References a document file with the standard codec.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, DocumentCodec::STANDARD)
    }

    /// References a document file with an explicit codec.
    pub fn with_codec(path: impl Into<PathBuf>, codec: DocumentCodec) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }
}

impl DocumentSource for FileDocument {
    fn open(&self) -> Result<Box<dyn TokenSource>, CanonicalError> {
        let file = File::open(&self.path)?;
        Ok(Box::new(Lexer::new(BufReader::new(file), self.codec)))
    }
}
