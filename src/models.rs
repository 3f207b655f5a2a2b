// Core data models and traits for Reflector

use memchr::memmem;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;

use crate::errors::ArchiveError;

/// Where in the request a parameter came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Query,
    Form,
    Body,
}

impl ParamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamSource::Query => "query",
            ParamSource::Form => "form",
            ParamSource::Body => "body",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural step inside a decoded value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key (also used for the root source and the parameter name)
    Key(String),
    /// Array element position
    Index(usize),
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Segment::Key(key) => serializer.serialize_str(key),
            Segment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

/// Path from a parameter root down to a nested value.
///
/// Paths are never mutated; `child` builds a new path with one more segment.
/// Rendered like `query["redirect"]` or `body["items"][2]["name"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// Path rooted at a parameter source with no further segments (raw body)
    pub fn root(source: ParamSource) -> Self {
        Self {
            segments: vec![Segment::Key(source.as_str().to_string())],
        }
    }

    /// Path for a named query or form parameter
    pub fn param(source: ParamSource, name: &str) -> Self {
        Self::root(source).child(Segment::Key(name.to_string()))
    }

    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    pub fn key(&self, key: &str) -> Self {
        self.child(Segment::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.segments.iter();
        match iter.next() {
            Some(Segment::Key(root)) => f.write_str(root)?,
            Some(Segment::Index(index)) => write!(f, "[{}]", index)?,
            None => return Ok(()),
        }
        for segment in iter {
            match segment {
                Segment::Key(key) => {
                    // serde_json string escaping gives the JSON-literal look
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[{}]", quoted)?;
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.segments.len()))?;
        for segment in &self.segments {
            seq.serialize_element(segment)?;
        }
        seq.end()
    }
}

/// A fully surfaced value and the path that reached it
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Leaf {
    pub key: KeyPath,
    pub value: String,
    /// Exact bytes when `value` is a lossy rendering of non-UTF-8 data
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
}

impl Leaf {
    pub fn new(key: KeyPath, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
            bytes: None,
        }
    }

    /// Leaf for decoded bytes that are not valid UTF-8
    pub fn lossy(key: KeyPath, bytes: Vec<u8>) -> Self {
        Self {
            key,
            value: String::from_utf8_lossy(&bytes).into_owned(),
            bytes: Some(bytes),
        }
    }

    /// Bytes to look for in a response: the original bytes, never the lossy text
    pub fn needle(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(self.value.as_bytes())
    }
}

/// Response body bytes after transport decoding.
///
/// Holds more than one candidate when the archive does not say how the body
/// was encoded; a value is reflected if it occurs in any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBody {
    candidates: Vec<Vec<u8>>,
}

impl ResponseBody {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            candidates: vec![bytes.into()],
        }
    }

    /// Body that is either `raw` as stored or `decoded` from it
    pub fn ambiguous(raw: impl Into<Vec<u8>>, decoded: impl Into<Vec<u8>>) -> Self {
        Self {
            candidates: vec![raw.into(), decoded.into()],
        }
    }

    pub fn candidates(&self) -> &[Vec<u8>] {
        &self.candidates
    }

    /// Exact, case-sensitive byte search; an empty needle never matches
    pub fn contains(&self, needle: &[u8]) -> bool {
        !needle.is_empty()
            && self
                .candidates
                .iter()
                .any(|body| memmem::find(body, needle).is_some())
    }
}

/// A name/value pair from the query string or a form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One captured request/response exchange
#[derive(Debug, Clone, Default)]
pub struct CapturedEntry {
    pub method: String,
    pub url: String,
    pub query: Vec<Param>,
    pub form: Vec<Param>,
    pub body_text: String,
    pub response_body: Option<ResponseBody>,
}

impl CapturedEntry {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Trait for parsing capture archives (HAR, etc.)
pub trait ArchiveParser {
    /// Parse archive content read from `source` into captured entries
    fn parse(&self, source: &str, content: &str) -> Result<Vec<CapturedEntry>, ArchiveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_query_param() {
        let path = KeyPath::param(ParamSource::Query, "redirect");
        assert_eq!(path.to_string(), r#"query["redirect"]"#);
    }

    #[test]
    fn display_nested_with_index() {
        let path = KeyPath::root(ParamSource::Body).key("items").index(2).key("name");
        assert_eq!(path.to_string(), r#"body["items"][2]["name"]"#);
    }

    #[test]
    fn display_escapes_quotes_in_keys() {
        let path = KeyPath::param(ParamSource::Form, "a\"b");
        assert_eq!(path.to_string(), r#"form["a\"b"]"#);
    }

    #[test]
    fn child_leaves_parent_untouched() {
        let parent = KeyPath::param(ParamSource::Form, "data");
        let child = parent.key("token");
        assert_eq!(parent.len(), 2);
        assert_eq!(child.len(), 3);
        assert_ne!(parent, child);
    }

    #[test]
    fn lossy_leaf_matches_on_original_bytes() {
        let leaf = Leaf::lossy(KeyPath::param(ParamSource::Query, "id"), vec![0xff, 0xff, 0xff]);
        assert_eq!(leaf.value, "\u{fffd}\u{fffd}\u{fffd}");
        assert_eq!(leaf.needle(), &[0xff, 0xff, 0xff]);

        let other_binary = ResponseBody::new(vec![0xfe, 0xfd, 0xfc]);
        assert!(!other_binary.contains(leaf.needle()));
        let same_binary = ResponseBody::new(vec![b'a', 0xff, 0xff, 0xff, b'b']);
        assert!(same_binary.contains(leaf.needle()));
    }

    #[test]
    fn response_body_checks_every_candidate() {
        let body = ResponseBody::ambiguous("abcd1234", vec![0x69, 0xb7, 0x1d]);
        assert!(body.contains(b"abcd1234"));
        assert!(body.contains(&[0xb7, 0x1d]));
        assert!(!body.contains(b""));
    }

    #[test]
    fn leaf_serializes_key_as_segment_array() {
        let leaf = Leaf::new(KeyPath::root(ParamSource::Body).index(0), "x");
        let json = serde_json::to_value(&leaf).unwrap();
        assert_eq!(json, serde_json::json!({ "key": ["body", 0], "value": "x" }));
    }
}
