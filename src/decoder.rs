// Recursive value decoding for Reflector
//
// Unwraps a parameter value through any nesting of JSON and base64 and yields
// every value found along the way, each labelled with its KeyPath.
//
// Example:
//   Input:  form["data"] = "eyJ0b2tlbiI6ImFiYzEyMyJ9"
//   Output: form["data"]          = eyJ0b2tlbiI6ImFiYzEyMyJ9
//           form["data"]          = {"token":"abc123"}
//           form["data"]["token"] = "abc123"
//           form["data"]["token"] = abc123
//
// Used by: correlator.rs for both dump and reflect modes

use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::models::{KeyPath, Leaf};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Standard padded alphabet that tolerates non-zero trailing bits
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

lazy_static! {
    // Letters, marks, numbers, punctuation, symbols and the ASCII space
    static ref PRINTABLE: Regex = Regex::new(r"^[\p{L}\p{M}\p{N}\p{P}\p{S} ]*$").unwrap();
}

/// How base64-decoded bytes are turned into a candidate text value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFilter {
    /// Valid UTF-8 made only of printable characters; anything else is dropped
    Printable,
    /// Any bytes, invalid UTF-8 replaced with U+FFFD
    Lossy,
}

/// Check that every character is printable
pub fn is_printable(text: &str) -> bool {
    PRINTABLE.is_match(text)
}

/// Decode standard padded base64, skipping line breaks.
pub fn decode_base64(value: &str) -> Option<Vec<u8>> {
    let result = if value.contains(|c| c == '\r' || c == '\n') {
        let unwrapped: String = value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        STANDARD_LENIENT.decode(unwrapped)
    } else {
        STANDARD_LENIENT.decode(value)
    };
    result.ok()
}

#[derive(Debug, Clone)]
pub struct Decoder {
    pub text_filter: TextFilter,
    pub max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(TextFilter::Printable)
    }
}

impl Decoder {
    pub fn new(text_filter: TextFilter) -> Self {
        Self {
            text_filter,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Lazily decode `value` found at `path` into leaves.
    ///
    /// The value itself is always the first leaf. Every interpretation that
    /// succeeds (JSON object, JSON array, JSON string, base64) contributes
    /// further leaves. Nothing past the first leaf is decoded until the
    /// iterator is advanced. Base64 output that is not valid UTF-8 (only
    /// kept with [`TextFilter::Lossy`]) is a leaf carrying its exact bytes
    /// and is not interpreted further.
    pub fn leaves(&self, path: KeyPath, value: impl Into<String>) -> Leaves<'_> {
        Leaves {
            decoder: self,
            stack: vec![Frame::text(path, value.into(), 0)],
        }
    }

    /// Eager variant of [`Decoder::leaves`]
    pub fn decode(&self, path: KeyPath, value: impl Into<String>) -> Vec<Leaf> {
        self.leaves(path, value).collect()
    }

    /// All single-step interpretations of `frame`, in emission order
    fn interpret(&self, frame: &Frame) -> Vec<Frame> {
        let (path, value, depth) = (&frame.path, frame.value.as_str(), frame.depth + 1);
        let mut children = Vec::new();

        if let Ok(object) = serde_json::from_str::<BTreeMap<String, Box<RawValue>>>(value) {
            for (key, raw) in object {
                children.push(Frame::text(path.key(&key), raw.get().to_string(), depth));
            }
        }

        if let Ok(array) = serde_json::from_str::<Vec<Box<RawValue>>>(value) {
            for (index, raw) in array.into_iter().enumerate() {
                children.push(Frame::text(path.index(index), raw.get().to_string(), depth));
            }
        }

        if let Ok(text) = serde_json::from_str::<String>(value) {
            children.push(Frame::text(path.clone(), text, depth));
        }

        if let Some(child) = self.base64_child(path, value, depth) {
            children.push(child);
        }

        children
    }

    fn base64_child(&self, path: &KeyPath, value: &str, depth: usize) -> Option<Frame> {
        let bytes = decode_base64(value)?;
        if bytes.is_empty() {
            return None;
        }
        match (String::from_utf8(bytes), self.text_filter) {
            (Ok(text), TextFilter::Printable) if is_printable(&text) => {
                Some(Frame::text(path.clone(), text, depth))
            }
            (Ok(_), TextFilter::Printable) | (Err(_), TextFilter::Printable) => None,
            (Ok(text), TextFilter::Lossy) => Some(Frame::text(path.clone(), text, depth)),
            (Err(e), TextFilter::Lossy) => {
                let bytes = e.into_bytes();
                Some(Frame {
                    path: path.clone(),
                    value: String::from_utf8_lossy(&bytes).into_owned(),
                    bytes: Some(bytes),
                    depth,
                })
            }
        }
    }
}

struct Frame {
    path: KeyPath,
    value: String,
    /// Set when `value` is a lossy rendering of these bytes
    bytes: Option<Vec<u8>>,
    depth: usize,
}

impl Frame {
    fn text(path: KeyPath, value: String, depth: usize) -> Self {
        Self {
            path,
            value,
            bytes: None,
            depth,
        }
    }

    fn into_leaf(self) -> Leaf {
        match self.bytes {
            Some(bytes) => Leaf::lossy(self.path, bytes),
            None => Leaf::new(self.path, self.value),
        }
    }
}

/// Depth-first worklist over the decoding tree of one value
pub struct Leaves<'a> {
    decoder: &'a Decoder,
    stack: Vec<Frame>,
}

impl Leaves<'_> {
    /// Queue `children` of `parent`, first child on top. A child identical to
    /// its parent is dropped.
    fn queue(&mut self, parent: &Frame, children: Vec<Frame>) {
        for child in children.into_iter().rev() {
            if child.path == parent.path && child.value == parent.value {
                trace!(path = %child.path, "value decodes to itself, skipping");
                continue;
            }
            self.stack.push(child);
        }
    }
}

impl Iterator for Leaves<'_> {
    type Item = Leaf;

    fn next(&mut self) -> Option<Leaf> {
        let frame = self.stack.pop()?;

        if frame.bytes.is_some() {
            trace!(path = %frame.path, "binary value, not descending");
        } else if frame.depth >= self.decoder.max_depth {
            debug!(
                path = %frame.path,
                depth = frame.depth,
                "max decode depth reached, not descending"
            );
        } else {
            let children = self.decoder.interpret(&frame);
            self.queue(&frame, children);
        }

        Some(frame.into_leaf())
    }
}
