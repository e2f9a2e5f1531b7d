//! Sort-order checking token source decorator.
//!
//! Canonicalization is expensive and most re-serializations of already
//! stored documents are already canonical, so this decorator rides along on
//! the serialization pass and reports whether every object scope's sibling
//! keys were already in strict ascending code-point order. When they were,
//! the full sort pass is skipped entirely.

use crate::errors::CanonicalError;
use crate::token::{Token, TokenSource};

#[derive(Debug)]
enum ScopeState {
    Object { last_key: Option<String> },
    Array,
}

/// Decorator that forwards tokens unchanged while checking key order.
pub struct SortCheckingSource<S: TokenSource> {
    inner: S,
    scopes: Vec<ScopeState>,
    sorted: bool,
}

impl<S: TokenSource> SortCheckingSource<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            scopes: Vec::new(),
            sorted: true,
        }
    }

    /// True while every object scope seen so far had strictly ascending
    /// sibling keys. Duplicate siblings also clear the flag; the sorter is
    /// what turns them into a hard error.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TokenSource> TokenSource for SortCheckingSource<S> {
    fn next_token(&mut self) -> Result<Option<Token>, CanonicalError> {
        let token = self.inner.next_token()?;
        match &token {
            Some(Token::StartObject) => {
                self.scopes.push(ScopeState::Object { last_key: None });
            }
            Some(Token::StartArray) => {
                self.scopes.push(ScopeState::Array);
            }
            Some(Token::EndObject) | Some(Token::EndArray) => {
                self.scopes.pop();
            }
            Some(Token::FieldName(name)) => {
                if let Some(ScopeState::Object { last_key }) = self.scopes.last_mut() {
                    if let Some(prev) = last_key {
                        if prev.as_str() >= name.as_str() {
                            self.sorted = false;
                        }
                    }
                    *last_key = Some(name.clone());
                }
            }
            _ => {}
        }
        Ok(token)
    }

    fn close(&mut self) {
        self.inner.close()
    }
}
