//! Canonical token writer.
//!
//! Re-emits a token stream as compact UTF-8 JSON with one deterministic
//! encoding for strings and numbers. The writer does not sort keys; it
//! serializes tokens in arrival order. Sorting is the sorter's job, and the
//! two share this module's string escaping so their outputs can never
//! disagree byte-for-byte.

use std::io::{self, Write};

use crate::errors::CanonicalError;
use crate::token::{Token, TokenSource};

/// Writes the canonical escaped form of `s`, including surrounding quotes.
pub fn write_escaped_string<W: Write + ?Sized>(out: &mut W, s: &str) -> io::Result<()> {
    out.write_all(b"\"")?;
    let mut start = 0;
    for (i, byte) in s.bytes().enumerate() {
        let escape: Option<&[u8]> = match byte {
            b'"' => Some(b"\\\""),
            b'\\' => Some(b"\\\\"),
            0x08 => Some(b"\\b"),
            0x0c => Some(b"\\f"),
            b'\n' => Some(b"\\n"),
            b'\r' => Some(b"\\r"),
            b'\t' => Some(b"\\t"),
            _ => None,
        };
        if let Some(esc) = escape {
            out.write_all(&s.as_bytes()[start..i])?;
            out.write_all(esc)?;
            start = i + 1;
        } else if byte < 0x20 {
            out.write_all(&s.as_bytes()[start..i])?;
            write!(out, "\\u{byte:04x}")?;
            start = i + 1;
        }
    }
    out.write_all(&s.as_bytes()[start..])?;
    out.write_all(b"\"")?;
    Ok(())
}

/// Serializes tokens into canonical document bytes.
pub struct CanonicalWriter<W: Write> {
    out: W,
    // One entry per open container: true once a member has been written.
    stack: Vec<bool>,
    field_pending: bool,
}

impl<W: Write> CanonicalWriter<W> {
    /// Creates a writer over `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: Vec::new(),
            field_pending: false,
        }
    }

    /// Writes one token, inserting structural separators as needed.
    pub fn write_token(&mut self, token: &Token) -> Result<(), CanonicalError> {
        match token {
            Token::StartObject => {
                self.begin_value()?;
                self.out.write_all(b"{")?;
                self.stack.push(false);
            }
            Token::StartArray => {
                self.begin_value()?;
                self.out.write_all(b"[")?;
                self.stack.push(false);
            }
            Token::EndObject => {
                self.stack.pop();
                self.out.write_all(b"}")?;
            }
            Token::EndArray => {
                self.stack.pop();
                self.out.write_all(b"]")?;
            }
            Token::FieldName(name) => {
                self.begin_entry()?;
                write_escaped_string(&mut self.out, name)?;
                self.out.write_all(b":")?;
                self.field_pending = true;
            }
            Token::String(s) => {
                self.begin_value()?;
                write_escaped_string(&mut self.out, s)?;
            }
            Token::Number(n) => {
                self.begin_value()?;
                write!(self.out, "{n}")?;
            }
            Token::Bool(true) => {
                self.begin_value()?;
                self.out.write_all(b"true")?;
            }
            Token::Bool(false) => {
                self.begin_value()?;
                self.out.write_all(b"false")?;
            }
            Token::Null => {
                self.begin_value()?;
                self.out.write_all(b"null")?;
            }
        }
        Ok(())
    }

    fn begin_value(&mut self) -> Result<(), CanonicalError> {
        if self.field_pending {
            self.field_pending = false;
            return Ok(());
        }
        self.begin_entry()
    }

    fn begin_entry(&mut self) -> Result<(), CanonicalError> {
        if let Some(has_members) = self.stack.last_mut() {
            if *has_members {
                self.out.write_all(b",")?;
            } else {
                *has_members = true;
            }
        }
        Ok(())
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<(), CanonicalError> {
        self.out.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink.
    pub fn finish(mut self) -> Result<W, CanonicalError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Drains `source` into `writer` until end of stream.
pub fn pump<S, W>(source: &mut S, writer: &mut CanonicalWriter<W>) -> Result<(), CanonicalError>
where
    S: TokenSource + ?Sized,
    W: Write,
{
    while let Some(token) = source.next_token()? {
        writer.write_token(&token)?;
    }
    writer.flush()
}

/// Write adapter that counts bytes as they pass through.
///
/// Used to measure relabeled output size in the same pass that checks sort
/// order, so the memory/disk spill decision never needs an extra pass.
pub struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the wrapped sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl CountingWriter<io::Sink> {
    /// A counter that discards its bytes; useful for measuring passes.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
