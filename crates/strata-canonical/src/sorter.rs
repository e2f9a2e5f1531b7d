//! Key sorter producing canonical bytes from non-canonical input.
//!
//! The input must already be in canonical *encoding* (the output of
//! [`CanonicalWriter`](crate::writer::CanonicalWriter)): no whitespace, one
//! string/number encoding. Only key order may differ. The sorter builds a
//! skeleton of the document holding, per object scope, the member keys and
//! the byte ranges of scalar values, sorts each scope, and re-emits the
//! document by copying scalar ranges from the seekable input. Scalar bytes
//! are never decoded twice and never held in memory.
//!
//! Memory use is proportional to the document's structure (keys and nesting),
//! not to its scalar payload. A per-scope key memory bound turns pathological
//! inputs into [`CanonicalError::TooManyKeys`] instead of unbounded growth.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::codec::DocumentCodec;
use crate::errors::CanonicalError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenSource};
use crate::writer::{write_escaped_string, CountingWriter};

/// Default per-scope key memory bound: 16 MiB.
pub const DEFAULT_MAX_KEY_MEMORY: u64 = 16 * 1024 * 1024;

// Accounts for the Vec entry, child node, and String header per key.
const KEY_ENTRY_OVERHEAD: u64 = 48;

/// Bounds applied while building the sort skeleton.
#[derive(Debug, Clone, Copy)]
pub struct SortLimits {
    /// Per-object-scope key memory bound; `None` means unbounded, which is
    /// appropriate when a disk-spill facility already absorbed the payload.
    pub max_key_memory: Option<u64>,
}

impl Default for SortLimits {
    fn default() -> Self {
        Self {
            max_key_memory: Some(DEFAULT_MAX_KEY_MEMORY),
        }
    }
}

enum Node {
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
    Span { start: u64, len: u64 },
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        "root".to_string()
    } else {
        path.join(".")
    }
}

/// Sorts every object scope of `input` and writes canonical bytes to `out`.
///
/// Returns the number of bytes written. Fails with
/// [`CanonicalError::KeyCollision`] when two sibling keys compare equal and
/// [`CanonicalError::TooManyKeys`] when a scope's key structure exceeds the
/// configured bound.
pub fn sort_document<R, W>(
    input: &mut R,
    out: W,
    limits: SortLimits,
    codec: DocumentCodec,
) -> Result<u64, CanonicalError>
where
    R: Read + Seek,
    W: Write,
{
    input.seek(SeekFrom::Start(0))?;
    let root = {
        let mut lexer = Lexer::new(&mut *input, codec);
        let first = lexer.next_token()?.ok_or(CanonicalError::Malformed {
            offset: 0,
            reason: "empty document".to_string(),
        })?;
        let mut path = Vec::new();
        let node = build_node(first, &mut lexer, limits, &mut path)?;
        // Surface trailing-garbage errors before any output is written.
        while lexer.next_token()?.is_some() {}
        node
    };

    input.seek(SeekFrom::Start(0))?;
    let mut counting = CountingWriter::new(out);
    write_node(&root, input, &mut counting)?;
    counting.flush()?;
    Ok(counting.written())
}

fn build_node<R: Read>(
    first: Token,
    lexer: &mut Lexer<R>,
    limits: SortLimits,
    path: &mut Vec<String>,
) -> Result<Node, CanonicalError> {
    match first {
        Token::StartObject => {
            let mut entries: Vec<(String, Node)> = Vec::new();
            let mut key_memory: u64 = 0;
            loop {
                let token = lexer.next_token()?.ok_or_else(|| CanonicalError::Malformed {
                    offset: lexer.offset(),
                    reason: "unterminated object".to_string(),
                })?;
                match token {
                    Token::EndObject => break,
                    Token::FieldName(key) => {
                        key_memory += key.len() as u64 + KEY_ENTRY_OVERHEAD;
                        if let Some(limit) = limits.max_key_memory {
                            if key_memory > limit {
                                return Err(CanonicalError::TooManyKeys {
                                    path: render_path(path),
                                    limit,
                                });
                            }
                        }
                        let value_first =
                            lexer.next_token()?.ok_or_else(|| CanonicalError::Malformed {
                                offset: lexer.offset(),
                                reason: "missing value for object key".to_string(),
                            })?;
                        path.push(key.clone());
                        let child = build_node(value_first, lexer, limits, path)?;
                        path.pop();
                        entries.push((key, child));
                    }
                    other => {
                        return Err(CanonicalError::Malformed {
                            offset: lexer.offset(),
                            reason: format!("unexpected {} in object", other.kind()),
                        })
                    }
                }
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for pair in entries.windows(2) {
                if pair[0].0 == pair[1].0 {
                    let mut collision = path.clone();
                    collision.push(pair[0].0.clone());
                    return Err(CanonicalError::KeyCollision {
                        path: render_path(&collision),
                    });
                }
            }
            Ok(Node::Object(entries))
        }
        Token::StartArray => {
            let mut items = Vec::new();
            let mut index = 0usize;
            loop {
                let token = lexer.next_token()?.ok_or_else(|| CanonicalError::Malformed {
                    offset: lexer.offset(),
                    reason: "unterminated array".to_string(),
                })?;
                match token {
                    Token::EndArray => break,
                    value_first => {
                        path.push(format!("[{index}]"));
                        items.push(build_node(value_first, lexer, limits, path)?);
                        path.pop();
                        index += 1;
                    }
                }
            }
            Ok(Node::Array(items))
        }
        Token::String(_) | Token::Number(_) | Token::Bool(_) | Token::Null => {
            let (start, end) = lexer.last_span();
            Ok(Node::Span {
                start,
                len: end - start,
            })
        }
        other => Err(CanonicalError::Malformed {
            offset: lexer.offset(),
            reason: format!("unexpected {}", other.kind()),
        }),
    }
}

fn write_node<R, W>(node: &Node, input: &mut R, out: &mut W) -> Result<(), CanonicalError>
where
    R: Read + Seek,
    W: Write,
{
    match node {
        Node::Object(entries) => {
            out.write_all(b"{")?;
            for (i, (key, child)) in entries.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                write_escaped_string(out, key)?;
                out.write_all(b":")?;
                write_node(child, input, out)?;
            }
            out.write_all(b"}")?;
        }
        Node::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                write_node(item, input, out)?;
            }
            out.write_all(b"]")?;
        }
        Node::Span { start, len } => copy_range(input, out, *start, *len)?,
    }
    Ok(())
}

fn copy_range<R, W>(input: &mut R, out: &mut W, start: u64, len: u64) -> Result<(), CanonicalError>
where
    R: Read + Seek,
    W: Write,
{
    input.seek(SeekFrom::Start(start))?;
    let mut remaining = len;
    let mut buf = [0u8; 8192];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = input.read(&mut buf[..want])?;
        if n == 0 {
            return Err(CanonicalError::Malformed {
                offset: start + (len - remaining),
                reason: "value range truncated".to_string(),
            });
        }
        out.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}
