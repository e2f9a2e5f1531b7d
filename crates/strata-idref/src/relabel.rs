//! Streaming relabeling token-source decorator.
//!
//! Walks the input token stream and the identifier shadow tree in lock-step,
//! mirroring the traversal order used when the tree was built. A tree cursor
//! stack advances on every container enter/exit, field name, and array
//! element; when the current position carries an identifier occurrence with
//! a mapping entry, the mapped absolute id is emitted in place of the raw
//! token text.

use std::collections::BTreeMap;

use thiserror::Error;

use strata_canonical::{CanonicalError, Token, TokenSource};

use crate::tree::IdRefNode;

/// Errors raised while substituting identifiers mid-stream.
///
/// I/O failures from the underlying source pass through unchanged as
/// [`CanonicalError`]; these variants are invariant violations that must
/// fail fast rather than be silently ignored.
#[derive(Error, Debug)]
pub enum RelabelError {
    /// An identifier occurrence was matched against the wrong token kind,
    /// e.g. a mapping-key occurrence reached by a value token.
    #[error("identifier at {path} expects a {expected} token, found {actual}")]
    KindMismatch {
        /// Path of the occurrence, from the document root.
        path: String,
        /// Token kind the occurrence's flag allows.
        expected: &'static str,
        /// Token kind actually encountered.
        actual: &'static str,
    },
}

impl From<RelabelError> for CanonicalError {
    fn from(err: RelabelError) -> Self {
        CanonicalError::Relabel(Box::new(err))
    }
}

struct Frame<'t> {
    node: Option<&'t IdRefNode>,
    is_array: bool,
    next_index: usize,
    current: Option<String>,
}

/// Token source decorator that substitutes mapped identifiers in place.
pub struct RelabelingSource<'t, S: TokenSource> {
    inner: S,
    root: &'t IdRefNode,
    mapping: &'t BTreeMap<String, String>,
    stack: Vec<Frame<'t>>,
    pending: Option<&'t IdRefNode>,
    started: bool,
}

impl<'t, S: TokenSource> RelabelingSource<'t, S> {
    /// Wraps `inner`, substituting occurrences found in `tree` whose
    /// original id has an entry in `mapping`.
    pub fn new(inner: S, tree: &'t IdRefNode, mapping: &'t BTreeMap<String, String>) -> Self {
        Self {
            inner,
            root: tree,
            mapping,
            stack: Vec::new(),
            pending: None,
            started: false,
        }
    }

    fn render_path(&self) -> String {
        let segments: Vec<&str> = self
            .stack
            .iter()
            .filter_map(|f| f.current.as_deref())
            .collect();
        if segments.is_empty() {
            "root".to_string()
        } else {
            segments.join(".")
        }
    }

    // Resolves the tree position of the value about to be consumed.
    fn enter_value(&mut self) -> Option<&'t IdRefNode> {
        match self.stack.last_mut() {
            Some(frame) if frame.is_array => {
                let index = frame.next_index;
                frame.next_index += 1;
                frame.current = Some(format!("[{index}]"));
                frame.node.and_then(|n| n.item(index))
            }
            Some(_) => self.pending.take(),
            None => {
                if self.started {
                    None
                } else {
                    self.started = true;
                    Some(self.root)
                }
            }
        }
    }
}

impl<'t, S: TokenSource> TokenSource for RelabelingSource<'t, S> {
    fn next_token(&mut self) -> Result<Option<Token>, CanonicalError> {
        let token = match self.inner.next_token()? {
            Some(token) => token,
            None => return Ok(None),
        };
        match token {
            Token::StartObject | Token::StartArray => {
                let is_array = matches!(token, Token::StartArray);
                let node = self.enter_value();
                self.stack.push(Frame {
                    node,
                    is_array,
                    next_index: 0,
                    current: None,
                });
                Ok(Some(token))
            }
            Token::EndObject | Token::EndArray => {
                self.stack.pop();
                Ok(Some(token))
            }
            Token::FieldName(name) => {
                let mut child: Option<&'t IdRefNode> = None;
                if let Some(frame) = self.stack.last_mut() {
                    frame.current = Some(name.clone());
                    child = frame.node.and_then(|n| n.field(&name));
                }
                self.pending = child;
                if let Some(key_ref) = child.and_then(|c| c.key_ref()) {
                    if !key_ref.is_mapping_key {
                        return Err(RelabelError::KindMismatch {
                            path: self.render_path(),
                            expected: "value",
                            actual: "field-name",
                        }
                        .into());
                    }
                    if let Some(mapped) = self.mapping.get(&key_ref.id) {
                        return Ok(Some(Token::FieldName(mapped.clone())));
                    }
                }
                Ok(Some(Token::FieldName(name)))
            }
            scalar => {
                let node = self.enter_value();
                if let Some(value_ref) = node.and_then(|n| n.value_ref()) {
                    if value_ref.is_mapping_key {
                        return Err(RelabelError::KindMismatch {
                            path: self.render_path(),
                            expected: "field-name",
                            actual: scalar.kind(),
                        }
                        .into());
                    }
                    if let Some(mapped) = self.mapping.get(&value_ref.id) {
                        return match scalar {
                            Token::String(_) => Ok(Some(Token::String(mapped.clone()))),
                            other => Err(RelabelError::KindMismatch {
                                path: self.render_path(),
                                expected: "string",
                                actual: other.kind(),
                            }
                            .into()),
                        };
                    }
                }
                Ok(Some(scalar))
            }
        }
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{IdReference, PathSegment};
    use strata_canonical::{pump, CanonicalWriter, DocumentSource, InMemoryDocument};

    fn field(name: &str) -> PathSegment {
        PathSegment::Field(name.into())
    }

    fn relabel(
        document: &str,
        refs: &[IdReference],
        mapping: &[(&str, &str)],
    ) -> Result<String, CanonicalError> {
        let tree = IdRefNode::build(refs);
        let mapping: BTreeMap<String, String> = mapping
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let doc = InMemoryDocument::new(document.as_bytes().to_vec());
        let mut source = RelabelingSource::new(doc.open()?, &tree, &mapping);
        let mut writer = CanonicalWriter::new(Vec::new());
        pump(&mut source, &mut writer)?;
        Ok(String::from_utf8(writer.finish()?).unwrap())
    }

    #[test]
    fn substitutes_value_occurrences_at_any_depth() {
        let refs = vec![
            IdReference::value(vec![field("id_field")], "rec-1"),
            IdReference::value(vec![field("child"), field("ref")], "rec-1"),
        ];
        let out = relabel(
            r#"{"id_field":"rec-1","child":{"ref":"rec-1"}}"#,
            &refs,
            &[("rec-1", "ws/42/3")],
        )
        .unwrap();
        assert_eq!(out, r#"{"id_field":"ws/42/3","child":{"ref":"ws/42/3"}}"#);
    }

    #[test]
    fn substitutes_mapping_keys() {
        let refs = vec![IdReference::mapping_key(vec![field("rec-1")], "rec-1")];
        let out = relabel(
            r#"{"rec-1":{"x":1}}"#,
            &refs,
            &[("rec-1", "ws/7/1")],
        )
        .unwrap();
        assert_eq!(out, r#"{"ws/7/1":{"x":1}}"#);
    }

    #[test]
    fn substitutes_inside_arrays() {
        let refs = vec![IdReference::value(
            vec![field("refs"), PathSegment::Index(1)],
            "rec-9",
        )];
        let out = relabel(
            r#"{"refs":["other","rec-9","rec-9"]}"#,
            &refs,
            &[("rec-9", "ws/1/2")],
        )
        .unwrap();
        // Only the flagged element is rewritten.
        assert_eq!(out, r#"{"refs":["other","ws/1/2","rec-9"]}"#);
    }

    #[test]
    fn unmapped_ids_pass_through() {
        let refs = vec![IdReference::value(vec![field("ref")], "rec-1")];
        let out = relabel(r#"{"ref":"rec-1"}"#, &refs, &[("other", "ws/1/1")]).unwrap();
        assert_eq!(out, r#"{"ref":"rec-1"}"#);
    }

    #[test]
    fn flagged_non_string_value_fails_fast() {
        let refs = vec![IdReference::value(vec![field("ref")], "5")];
        let err = relabel(r#"{"ref":5}"#, &refs, &[("5", "ws/1/1")]).unwrap_err();
        assert!(matches!(err, CanonicalError::Relabel(_)));
    }

    #[test]
    fn same_field_name_at_different_depths_resolves_independently() {
        let refs = vec![IdReference::value(vec![field("a"), field("ref")], "rec-1")];
        let out = relabel(
            r#"{"ref":"rec-1","a":{"ref":"rec-1"}}"#,
            &refs,
            &[("rec-1", "ws/3/4")],
        )
        .unwrap();
        // The top-level "ref" is not flagged and stays untouched.
        assert_eq!(out, r#"{"ref":"rec-1","a":{"ref":"ws/3/4"}}"#);
    }
}
