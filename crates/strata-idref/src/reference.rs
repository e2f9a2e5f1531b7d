use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a structural path from the document root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array element position.
    Index(usize),
    /// Object member name.
    Field(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Field(name) => write!(f, "{name}"),
        }
    }
}

/// One flagged identifier occurrence, as reported by the validator.
///
/// Immutable except for `absolute_id`, which is assigned exactly once per
/// report when the absolute-id mapping is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdReference {
    /// Structural path from the document root to the occurrence. For
    /// mapping-key occurrences the final segment is the key itself.
    pub path: Vec<PathSegment>,
    /// Original identifier text found in the document.
    pub id: String,
    /// Candidate declared types for the referenced object.
    #[serde(default)]
    pub candidate_types: Vec<String>,
    /// True when the identifier serves as an object member name rather than
    /// a value. Key occurrences may only be substituted on field-name
    /// tokens, value occurrences only on value tokens.
    #[serde(default)]
    pub is_mapping_key: bool,
    /// Canonical replacement id, assigned after external resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_id: Option<String>,
}

impl IdReference {
    /// A value occurrence at `path` holding `id`.
    pub fn value(path: Vec<PathSegment>, id: impl Into<String>) -> Self {
        Self {
            path,
            id: id.into(),
            candidate_types: Vec::new(),
            is_mapping_key: false,
            absolute_id: None,
        }
    }

    /// A mapping-key occurrence at `path` whose final segment is `id`.
    pub fn mapping_key(path: Vec<PathSegment>, id: impl Into<String>) -> Self {
        Self {
            path,
            id: id.into(),
            candidate_types: Vec::new(),
            is_mapping_key: true,
            absolute_id: None,
        }
    }

    /// Nesting depth of the occurrence (number of path segments).
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Renders the path for error context.
    pub fn render_path(&self) -> String {
        if self.path.is_empty() {
            return "root".to_string();
        }
        let mut out = String::new();
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Field(_)) {
                out.push('.');
            }
            out.push_str(&segment.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_validator_payload() {
        let parsed: IdReference = serde_json::from_str(
            r#"{"path":["child",0,"ref"],"id":"rec-1","candidate_types":["Genome"]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.path,
            vec![
                PathSegment::Field("child".into()),
                PathSegment::Index(0),
                PathSegment::Field("ref".into()),
            ]
        );
        assert_eq!(parsed.id, "rec-1");
        assert!(!parsed.is_mapping_key);
        assert!(parsed.absolute_id.is_none());
    }

    #[test]
    fn renders_paths_with_indices() {
        let r = IdReference::value(
            vec![
                PathSegment::Field("a".into()),
                PathSegment::Index(2),
                PathSegment::Field("b".into()),
            ],
            "x",
        );
        assert_eq!(r.render_path(), "a[2].b");
    }
}
