//! Streaming JSON lexer producing document tokens from any `io::Read`.
//!
//! The lexer reads forward only and never buffers more than one byte of
//! lookahead, so documents of unbounded size tokenize in constant memory.
//! Byte offsets are tracked for error context and for the value spans the
//! key sorter copies.

use std::io::{ErrorKind, Read};

use serde_json::Number;

use crate::codec::DocumentCodec;
use crate::errors::CanonicalError;
use crate::token::{Token, TokenSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Expecting a value (root, after `:`, or after `,` in an array).
    Value,
    /// Expecting a value or `]` (right after `[`).
    ArrayFirst,
    /// Expecting a key or `}` (right after `{`).
    ObjectFirst,
    /// Expecting a key (after `,` in an object).
    ObjectKey,
    /// Expecting `,` or a container end.
    AfterValue,
    /// Root value complete; only whitespace then EOF is allowed.
    Done,
}

/// Raw-parse token source over a byte reader.
pub struct Lexer<R: Read> {
    input: Option<R>,
    peeked: Option<u8>,
    offset: u64,
    stack: Vec<Scope>,
    mode: Mode,
    codec: DocumentCodec,
    token_start: u64,
    token_end: u64,
}

impl<R: Read> Lexer<R> {
    /// Creates a lexer over `input` with the given codec bounds.
    pub fn new(input: R, codec: DocumentCodec) -> Self {
        Self {
            input: Some(input),
            peeked: None,
            offset: 0,
            stack: Vec::new(),
            mode: Mode::Value,
            codec,
            token_start: 0,
            token_end: 0,
        }
    }

    /// Current byte offset (bytes consumed so far).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Byte span `[start, end)` of the most recently returned token.
    ///
    /// For scalar tokens this is exactly the raw serialized value, which is
    /// what the key sorter copies verbatim.
    pub fn last_span(&self) -> (u64, u64) {
        (self.token_start, self.token_end)
    }

    fn fail(&self, reason: impl Into<String>) -> CanonicalError {
        CanonicalError::Malformed {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn fill_peek(&mut self) -> Result<Option<u8>, CanonicalError> {
        if self.peeked.is_none() {
            let input = match self.input.as_mut() {
                Some(input) => input,
                None => return Ok(None),
            };
            let mut byte = [0u8; 1];
            loop {
                match input.read(&mut byte) {
                    Ok(0) => return Ok(None),
                    Ok(_) => {
                        self.peeked = Some(byte[0]);
                        break;
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(self.peeked)
    }

    fn bump(&mut self) -> Result<Option<u8>, CanonicalError> {
        let byte = self.fill_peek()?;
        if byte.is_some() {
            self.peeked = None;
            self.offset += 1;
        }
        Ok(byte)
    }

    fn skip_whitespace(&mut self) -> Result<(), CanonicalError> {
        while matches!(self.fill_peek()?, Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump()?;
        }
        Ok(())
    }

    fn push_scope(&mut self, scope: Scope) -> Result<(), CanonicalError> {
        if self.stack.len() >= self.codec.max_depth {
            return Err(self.fail(format!(
                "nesting depth exceeds limit of {}",
                self.codec.max_depth
            )));
        }
        self.stack.push(scope);
        Ok(())
    }

    fn pop_scope(&mut self) {
        self.stack.pop();
        self.after_value();
    }

    fn after_value(&mut self) {
        self.mode = if self.stack.is_empty() {
            Mode::Done
        } else {
            Mode::AfterValue
        };
    }

    fn parse_value(&mut self) -> Result<Token, CanonicalError> {
        self.token_start = self.offset;
        let byte = self
            .fill_peek()?
            .ok_or_else(|| self.fail("unexpected end of input"))?;
        let token = match byte {
            b'{' => {
                self.bump()?;
                self.push_scope(Scope::Object)?;
                self.mode = Mode::ObjectFirst;
                Token::StartObject
            }
            b'[' => {
                self.bump()?;
                self.push_scope(Scope::Array)?;
                self.mode = Mode::ArrayFirst;
                Token::StartArray
            }
            b'"' => {
                let s = self.read_string()?;
                self.after_value();
                Token::String(s)
            }
            b'-' | b'0'..=b'9' => {
                let n = self.read_number()?;
                self.after_value();
                Token::Number(n)
            }
            b't' => {
                self.read_literal(b"true")?;
                self.after_value();
                Token::Bool(true)
            }
            b'f' => {
                self.read_literal(b"false")?;
                self.after_value();
                Token::Bool(false)
            }
            b'n' => {
                self.read_literal(b"null")?;
                self.after_value();
                Token::Null
            }
            other => return Err(self.fail(format!("unexpected byte 0x{other:02x}"))),
        };
        self.token_end = self.offset;
        Ok(token)
    }

    fn read_literal(&mut self, expect: &'static [u8]) -> Result<(), CanonicalError> {
        for &want in expect {
            match self.bump()? {
                Some(byte) if byte == want => {}
                _ => {
                    let name = std::str::from_utf8(expect).unwrap_or("literal");
                    return Err(self.fail(format!("invalid literal, expected '{name}'")));
                }
            }
        }
        Ok(())
    }

    fn read_number(&mut self) -> Result<Number, CanonicalError> {
        let mut raw = String::new();
        while let Some(byte) = self.fill_peek()? {
            match byte {
                b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E' => {
                    raw.push(byte as char);
                    self.bump()?;
                }
                _ => break,
            }
        }
        serde_json::from_str::<Number>(&raw)
            .map_err(|_| self.fail(format!("invalid number '{raw}'")))
    }

    fn read_hex4(&mut self) -> Result<u16, CanonicalError> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            let byte = self
                .bump()?
                .ok_or_else(|| self.fail("unterminated unicode escape"))?;
            let digit = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => return Err(self.fail("invalid unicode escape digit")),
            };
            value = (value << 4) | u16::from(digit);
        }
        Ok(value)
    }

    fn read_string(&mut self) -> Result<String, CanonicalError> {
        match self.bump()? {
            Some(b'"') => {}
            _ => return Err(self.fail("expected '\"'")),
        }
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let byte = self
                .bump()?
                .ok_or_else(|| self.fail("unterminated string"))?;
            match byte {
                b'"' => break,
                b'\\' => {
                    let escape = self
                        .bump()?
                        .ok_or_else(|| self.fail("unterminated escape"))?;
                    match escape {
                        b'"' => buf.push(b'"'),
                        b'\\' => buf.push(b'\\'),
                        b'/' => buf.push(b'/'),
                        b'b' => buf.push(0x08),
                        b'f' => buf.push(0x0c),
                        b'n' => buf.push(b'\n'),
                        b'r' => buf.push(b'\r'),
                        b't' => buf.push(b'\t'),
                        b'u' => {
                            let ch = self.read_unicode_escape()?;
                            let mut tmp = [0u8; 4];
                            buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
                        }
                        _ => return Err(self.fail("invalid escape sequence")),
                    }
                }
                0x00..=0x1f => {
                    return Err(self.fail("unescaped control character in string"))
                }
                other => buf.push(other),
            }
        }
        String::from_utf8(buf).map_err(|_| self.fail("invalid UTF-8 in string"))
    }

    fn read_unicode_escape(&mut self) -> Result<char, CanonicalError> {
        let hi = self.read_hex4()?;
        if (0xD800..0xDC00).contains(&hi) {
            // High surrogate must be followed by an escaped low surrogate.
            let backslash = self.bump()?;
            let u = self.bump()?;
            if backslash != Some(b'\\') || u != Some(b'u') {
                return Err(self.fail("unpaired surrogate"));
            }
            let lo = self.read_hex4()?;
            if !(0xDC00..0xE000).contains(&lo) {
                return Err(self.fail("invalid low surrogate"));
            }
            let combined =
                0x10000 + ((u32::from(hi) - 0xD800) << 10) + (u32::from(lo) - 0xDC00);
            char::from_u32(combined).ok_or_else(|| self.fail("invalid code point"))
        } else if (0xDC00..0xE000).contains(&hi) {
            Err(self.fail("unpaired surrogate"))
        } else {
            char::from_u32(u32::from(hi)).ok_or_else(|| self.fail("invalid code point"))
        }
    }

    fn advance(&mut self) -> Result<Option<Token>, CanonicalError> {
        if self.input.is_none() {
            return Ok(None);
        }
        loop {
            self.skip_whitespace()?;
            match self.mode {
                Mode::Value => return self.parse_value().map(Some),
                Mode::ArrayFirst => {
                    if let Some(b']') = self.fill_peek()? {
                        self.token_start = self.offset;
                        self.bump()?;
                        self.pop_scope();
                        self.token_end = self.offset;
                        return Ok(Some(Token::EndArray));
                    }
                    return self.parse_value().map(Some);
                }
                Mode::ObjectFirst | Mode::ObjectKey => match self.fill_peek()? {
                    Some(b'}') if self.mode == Mode::ObjectFirst => {
                        self.token_start = self.offset;
                        self.bump()?;
                        self.pop_scope();
                        self.token_end = self.offset;
                        return Ok(Some(Token::EndObject));
                    }
                    Some(b'"') => {
                        self.token_start = self.offset;
                        let key = self.read_string()?;
                        self.token_end = self.offset;
                        self.skip_whitespace()?;
                        match self.bump()? {
                            Some(b':') => {}
                            _ => return Err(self.fail("expected ':' after object key")),
                        }
                        self.mode = Mode::Value;
                        return Ok(Some(Token::FieldName(key)));
                    }
                    Some(_) => return Err(self.fail("expected object key")),
                    None => return Err(self.fail("unexpected end of input in object")),
                },
                Mode::AfterValue => match self.fill_peek()? {
                    Some(b',') => {
                        self.bump()?;
                        self.mode = match self.stack.last() {
                            Some(Scope::Object) => Mode::ObjectKey,
                            Some(Scope::Array) => Mode::Value,
                            None => return Err(self.fail("unexpected ','")),
                        };
                    }
                    Some(b'}') => {
                        if self.stack.last() == Some(&Scope::Object) {
                            self.token_start = self.offset;
                            self.bump()?;
                            self.pop_scope();
                            self.token_end = self.offset;
                            return Ok(Some(Token::EndObject));
                        }
                        return Err(self.fail("mismatched '}'"));
                    }
                    Some(b']') => {
                        if self.stack.last() == Some(&Scope::Array) {
                            self.token_start = self.offset;
                            self.bump()?;
                            self.pop_scope();
                            self.token_end = self.offset;
                            return Ok(Some(Token::EndArray));
                        }
                        return Err(self.fail("mismatched ']'"));
                    }
                    Some(other) => {
                        return Err(self.fail(format!(
                            "expected ',' or container end, found 0x{other:02x}"
                        )))
                    }
                    None => return Err(self.fail("unexpected end of input")),
                },
                Mode::Done => match self.fill_peek()? {
                    None => {
                        self.close();
                        return Ok(None);
                    }
                    Some(_) => return Err(self.fail("trailing data after document")),
                },
            }
        }
    }
}

impl<R: Read> TokenSource for Lexer<R> {
    fn next_token(&mut self) -> Result<Option<Token>, CanonicalError> {
        self.advance()
    }

    fn close(&mut self) {
        self.input = None;
        self.peeked = None;
    }
}
