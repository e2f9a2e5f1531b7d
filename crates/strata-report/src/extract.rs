//! Streaming subset and metadata extraction.
//!
//! A single forward pass over the token stream produces both the searchable
//! subset and the flat metadata map. Unselected subtrees are skipped without
//! materialization, and a byte budget caps how much extracted output may
//! accumulate. The budget is charged from token text alone, so the same
//! document and limit fail at the same point whether the canonical bytes
//! came from memory or disk.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use strata_canonical::{CanonicalError, Token, TokenSource};

use crate::errors::ExtractError;
use crate::selection::{MetadataSelection, SelectionNode, SubsetSelection};

/// Output of one extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The selected subset, always a JSON object at the top level.
    pub subset: Value,
    /// Metadata name to the scalar text found at its dotted path.
    pub metadata: BTreeMap<String, String>,
}

impl Default for Extraction {
    fn default() -> Self {
        Extraction {
            subset: Value::Object(Map::new()),
            metadata: BTreeMap::new(),
        }
    }
}

/// Metadata paths rearranged into a tree keyed by path segment, so the
/// walk can carry one node pointer instead of re-matching dotted strings.
#[derive(Debug, Default)]
struct MetaNode {
    names: Vec<String>,
    children: BTreeMap<String, MetaNode>,
}

impl MetaNode {
    fn build(selection: &MetadataSelection) -> MetaNode {
        let mut root = MetaNode::default();
        for (name, path) in &selection.0 {
            let mut node = &mut root;
            for segment in path.split('.') {
                node = node.children.entry(segment.to_string()).or_default();
            }
            node.names.push(name.clone());
        }
        root
    }
}

struct Budget {
    used: u64,
    limit: u64,
}

impl Budget {
    fn charge(&mut self, bytes: u64) -> Result<(), ExtractError> {
        self.used += bytes;
        if self.used > self.limit {
            Err(ExtractError::SizeLimit { limit: self.limit })
        } else {
            Ok(())
        }
    }
}

/// Extracts the selected subset, and metadata when a selection is given,
/// in one pass over `source`. Fails with [`ExtractError::SizeLimit`] once
/// extracted output exceeds `max_bytes`.
pub fn extract<S: TokenSource + ?Sized>(
    source: &mut S,
    selection: &SubsetSelection,
    metadata: Option<&MetadataSelection>,
    max_bytes: u64,
) -> Result<Extraction, ExtractError> {
    let meta_root = metadata.map(MetaNode::build);
    let mut walker = Walker {
        budget: Budget {
            used: 0,
            limit: max_bytes,
        },
        metadata: BTreeMap::new(),
    };
    let subset = match source.next_token()? {
        None => None,
        Some(first) => walker.walk(
            first,
            source,
            Some(&selection.fields),
            Some(&selection.keys),
            false,
            meta_root.as_ref(),
        )?,
    };
    Ok(Extraction {
        subset: subset.unwrap_or_else(|| Value::Object(Map::new())),
        metadata: walker.metadata,
    })
}

struct Walker {
    budget: Budget,
    metadata: BTreeMap<String, String>,
}

impl Walker {
    /// Consumes one complete value whose first token is `first`. Returns the
    /// extracted counterpart, or `None` when nothing under it was selected.
    fn walk<S: TokenSource + ?Sized>(
        &mut self,
        first: Token,
        source: &mut S,
        fields: Option<&SelectionNode>,
        keys: Option<&SelectionNode>,
        include: bool,
        meta: Option<&MetaNode>,
    ) -> Result<Option<Value>, ExtractError> {
        match first {
            Token::StartObject => self.walk_object(source, fields, keys, include, meta),
            Token::StartArray => self.walk_array(source, fields, keys, include, meta),
            Token::EndObject | Token::EndArray | Token::FieldName(_) => {
                Err(structural_error().into())
            }
            scalar => {
                let text = scalar_text(&scalar);
                if let Some(meta) = meta {
                    for name in &meta.names {
                        self.budget.charge((name.len() + text.len()) as u64)?;
                        self.metadata.insert(name.clone(), text.clone());
                    }
                }
                if include {
                    self.budget.charge(scalar_weight(&scalar, &text))?;
                    Ok(Some(scalar_value(scalar)))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn walk_object<S: TokenSource + ?Sized>(
        &mut self,
        source: &mut S,
        fields: Option<&SelectionNode>,
        keys: Option<&SelectionNode>,
        include: bool,
        meta: Option<&MetaNode>,
    ) -> Result<Option<Value>, ExtractError> {
        let mut out = Map::new();
        loop {
            let name = match source.next_token()? {
                Some(Token::EndObject) => break,
                Some(Token::FieldName(name)) => name,
                _ => return Err(structural_error().into()),
            };
            let value_first = source.next_token()?.ok_or_else(structural_error)?;

            let fields_child = fields.and_then(|f| f.child(&name));
            let keys_child = keys.and_then(|k| k.child(&name));
            let meta_child = meta.and_then(|m| m.children.get(&name));
            let wants_fields = include || fields_child.is_some();
            // A leaf in the keys tree reports this member's key set, unless
            // the fields tree also matched; fields win on overlap.
            let wants_key_set =
                !wants_fields && keys_child.map_or(false, SelectionNode::is_leaf);

            if wants_key_set {
                if let Some(key_set) = self.collect_keys(value_first, source, meta_child)? {
                    self.budget.charge((name.len() + 3) as u64)?;
                    out.insert(name, key_set);
                }
            } else if wants_fields || keys_child.is_some() || meta_child.is_some() {
                let include_child =
                    include || fields_child.map_or(false, SelectionNode::is_leaf);
                let value = self.walk(
                    value_first,
                    source,
                    fields_child,
                    keys_child,
                    include_child,
                    meta_child,
                )?;
                if let Some(value) = value {
                    self.budget.charge((name.len() + 3) as u64)?;
                    out.insert(name, value);
                }
            } else {
                skip_value(value_first, source)?;
            }
        }
        if include || !out.is_empty() {
            self.budget.charge(2)?;
            Ok(Some(Value::Object(out)))
        } else {
            Ok(None)
        }
    }

    fn walk_array<S: TokenSource + ?Sized>(
        &mut self,
        source: &mut S,
        fields: Option<&SelectionNode>,
        keys: Option<&SelectionNode>,
        include: bool,
        meta: Option<&MetaNode>,
    ) -> Result<Option<Value>, ExtractError> {
        let mut out = Vec::new();
        loop {
            let first = match source.next_token()? {
                Some(Token::EndArray) => break,
                Some(token) => token,
                None => return Err(structural_error().into()),
            };
            // Selections and metadata paths pass through arrays unchanged;
            // each element sees the same nodes.
            if let Some(value) = self.walk(first, source, fields, keys, include, meta)? {
                out.push(value);
            }
        }
        if include || !out.is_empty() {
            self.budget.charge(2)?;
            Ok(Some(Value::Array(out)))
        } else {
            Ok(None)
        }
    }

    /// Reports the key set of an object value as an array of strings.
    /// Non-object values yield nothing. Metadata paths through the object
    /// are still honored.
    fn collect_keys<S: TokenSource + ?Sized>(
        &mut self,
        first: Token,
        source: &mut S,
        meta: Option<&MetaNode>,
    ) -> Result<Option<Value>, ExtractError> {
        if !matches!(first, Token::StartObject) {
            skip_value(first, source)?;
            return Ok(None);
        }
        let mut names = Vec::new();
        loop {
            let name = match source.next_token()? {
                Some(Token::EndObject) => break,
                Some(Token::FieldName(name)) => name,
                _ => return Err(structural_error().into()),
            };
            let value_first = source.next_token()?.ok_or_else(structural_error)?;
            let meta_child = meta.and_then(|m| m.children.get(&name));
            if meta_child.is_some() {
                self.walk(value_first, source, None, None, false, meta_child)?;
            } else {
                skip_value(value_first, source)?;
            }
            self.budget.charge((name.len() + 3) as u64)?;
            names.push(Value::String(name));
        }
        self.budget.charge(2)?;
        Ok(Some(Value::Array(names)))
    }
}

/// Consumes and discards one complete value whose first token is `first`.
fn skip_value<S: TokenSource + ?Sized>(
    first: Token,
    source: &mut S,
) -> Result<(), CanonicalError> {
    let mut depth = match first {
        Token::StartObject | Token::StartArray => 1u32,
        _ => return Ok(()),
    };
    while depth > 0 {
        match source.next_token()?.ok_or_else(structural_error)? {
            Token::StartObject | Token::StartArray => depth += 1,
            Token::EndObject | Token::EndArray => depth -= 1,
            _ => {}
        }
    }
    Ok(())
}

fn structural_error() -> CanonicalError {
    CanonicalError::Malformed {
        offset: 0,
        reason: "token stream ended inside a container".to_string(),
    }
}

fn scalar_text(token: &Token) -> String {
    match token {
        Token::String(s) => s.clone(),
        Token::Number(n) => n.to_string(),
        Token::Bool(b) => b.to_string(),
        Token::Null => "null".to_string(),
        _ => String::new(),
    }
}

fn scalar_weight(token: &Token, text: &str) -> u64 {
    match token {
        // Quotes count toward the budget, escapes do not; close enough for
        // a cap that exists to bound memory, and stable across cache forms.
        Token::String(_) => (text.len() + 2) as u64,
        _ => text.len() as u64,
    }
}

fn scalar_value(token: Token) -> Value {
    match token {
        Token::String(s) => Value::String(s),
        Token::Number(n) => Value::Number(n),
        Token::Bool(b) => Value::Bool(b),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_canonical::{DocumentSource, InMemoryDocument};

    fn run(
        document: &str,
        selection: &str,
        metadata: Option<&str>,
        max_bytes: u64,
    ) -> Result<Extraction, ExtractError> {
        let selection: SubsetSelection = serde_json::from_str(selection).unwrap();
        let metadata: Option<MetadataSelection> =
            metadata.map(|m| serde_json::from_str(m).unwrap());
        let doc = InMemoryDocument::new(document.as_bytes().to_vec());
        let mut source = doc.open().unwrap();
        extract(&mut *source, &selection, metadata.as_ref(), max_bytes)
    }

    #[test]
    fn copies_selected_fields_and_skips_the_rest() {
        let out = run(
            r#"{"a":{"b":1,"c":2},"d":[1,2],"e":"skip"}"#,
            r#"{"fields":{"a":{"b":{}},"d":{}}}"#,
            None,
            10_000,
        )
        .unwrap();
        assert_eq!(
            out.subset,
            serde_json::json!({"a":{"b":1},"d":[1,2]})
        );
    }

    #[test]
    fn leaf_selection_includes_whole_subtree() {
        let out = run(
            r#"{"a":{"deep":{"x":[1,{"y":null}]}},"b":2}"#,
            r#"{"fields":{"a":{}}}"#,
            None,
            10_000,
        )
        .unwrap();
        assert_eq!(out.subset, serde_json::json!({"a":{"deep":{"x":[1,{"y":null}]}}}));
    }

    #[test]
    fn selection_applies_to_each_array_element() {
        let out = run(
            r#"{"features":[{"id":"f1","len":10},{"id":"f2","len":20}]}"#,
            r#"{"fields":{"features":{"id":{}}}}"#,
            None,
            10_000,
        )
        .unwrap();
        assert_eq!(
            out.subset,
            serde_json::json!({"features":[{"id":"f1"},{"id":"f2"}]})
        );
    }

    #[test]
    fn keys_selection_reports_member_names_only() {
        let out = run(
            r#"{"lookup":{"k1":{"big":1},"k2":{"big":2}},"other":1}"#,
            r#"{"keys":{"lookup":{}}}"#,
            None,
            10_000,
        )
        .unwrap();
        assert_eq!(out.subset, serde_json::json!({"lookup":["k1","k2"]}));
    }

    #[test]
    fn fields_win_when_both_trees_match() {
        let out = run(
            r#"{"x":{"k":1}}"#,
            r#"{"fields":{"x":{}},"keys":{"x":{}}}"#,
            None,
            10_000,
        )
        .unwrap();
        assert_eq!(out.subset, serde_json::json!({"x":{"k":1}}));
    }

    #[test]
    fn empty_selection_yields_empty_object() {
        let out = run(r#"{"a":1}"#, r#"{}"#, None, 10_000).unwrap();
        assert_eq!(out.subset, serde_json::json!({}));
    }

    #[test]
    fn metadata_lifts_scalars_by_dotted_path() {
        let out = run(
            r#"{"name":"genome-7","stats":{"gc":0.41,"n":77}}"#,
            r#"{}"#,
            Some(r#"{"Name":"name","GC content":"stats.gc"}"#),
            10_000,
        )
        .unwrap();
        assert_eq!(out.subset, serde_json::json!({}));
        assert_eq!(out.metadata["Name"], "genome-7");
        assert_eq!(out.metadata["GC content"], "0.41");
    }

    #[test]
    fn metadata_survives_inside_keys_only_subtrees() {
        let out = run(
            r#"{"lookup":{"k1":{"tag":"t1"}}}"#,
            r#"{"keys":{"lookup":{}}}"#,
            Some(r#"{"Tag":"lookup.k1.tag"}"#),
            10_000,
        )
        .unwrap();
        assert_eq!(out.subset, serde_json::json!({"lookup":["k1"]}));
        assert_eq!(out.metadata["Tag"], "t1");
    }

    #[test]
    fn size_limit_is_deterministic() {
        let doc = r#"{"a":"0123456789","b":"0123456789"}"#;
        let sel = r#"{"fields":{"a":{},"b":{}}}"#;
        let err = run(doc, sel, None, 20).unwrap_err();
        assert!(matches!(err, ExtractError::SizeLimit { limit: 20 }));
        // A budget that covers the output succeeds.
        assert!(run(doc, sel, None, 50).is_ok());
    }

    #[test]
    fn select_all_reproduces_the_document() {
        let doc = r#"{"a":{"b":[1,2,{"c":null}],"d":"x"},"e":true,"f":0.5}"#;
        let out = run(doc, r#"{"fields":{"*":{}}}"#, None, 10_000).unwrap();
        let full: Value = serde_json::from_str(doc).unwrap();
        assert_eq!(out.subset, full);
    }

    #[test]
    fn wildcard_selects_every_member() {
        let out = run(
            r#"{"a":{"id":1,"x":2},"b":{"id":3,"x":4}}"#,
            r#"{"fields":{"*":{"id":{}}}}"#,
            None,
            10_000,
        )
        .unwrap();
        assert_eq!(out.subset, serde_json::json!({"a":{"id":1},"b":{"id":3}}));
    }
}
