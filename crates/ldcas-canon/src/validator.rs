//! Structural validation run before a document is canonicalized.
//!
//! Three independent rules; the context rule is checked first, then depth and
//! keys in a single walk, so the first violation found in document order is
//! the one reported.

use serde_json::Value;

use crate::error::ValidationError;

/// The root key that marks a document as sealable.
pub const CONTEXT_KEY: &str = "@context";

/// Default maximum container nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Structural gatekeeper for documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validator {
    max_depth: usize,
}

impl Validator {
    /// Create a validator with the given maximum nesting depth.
    ///
    /// The root container is depth 0; every nested object or array adds one.
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// The configured depth bound.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Check a parsed document against every rule.
    pub fn validate(&self, doc: &Value) -> Result<(), ValidationError> {
        check_context(doc)?;
        let mut path = Vec::new();
        self.walk(doc, 0, &mut path)
    }

    /// Check container nesting in raw bytes without parsing them.
    ///
    /// Used when a parse fails, since the parser gives up on nesting far
    /// beyond any sane bound before the tree walk could report it. Brackets
    /// inside strings are ignored; the path is the byte offset of the first
    /// container past the bound.
    pub fn check_raw_depth(&self, raw: &[u8]) -> Result<(), ValidationError> {
        let mut open = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, &byte) in raw.iter().enumerate() {
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' | b'[' => {
                    if open > self.max_depth {
                        return Err(ValidationError::TooDeep {
                            max: self.max_depth,
                            path: format!("byte {offset}"),
                        });
                    }
                    open += 1;
                }
                b'}' | b']' => open = open.saturating_sub(1),
                _ => {}
            }
        }
        Ok(())
    }

    fn walk<'a>(
        &self,
        value: &'a Value,
        depth: usize,
        path: &mut Vec<Segment<'a>>,
    ) -> Result<(), ValidationError> {
        match value {
            Value::Object(map) => {
                self.check_depth(depth, path)?;
                for (key, child) in map {
                    path.push(Segment::Key(key));
                    if let Some(byte) = forbidden_key_byte(key) {
                        return Err(ValidationError::ControlCharacterInKey {
                            path: render(path),
                            byte,
                        });
                    }
                    self.walk(child, depth + 1, path)?;
                    path.pop();
                }
                Ok(())
            }
            Value::Array(items) => {
                self.check_depth(depth, path)?;
                for (index, item) in items.iter().enumerate() {
                    path.push(Segment::Index(index));
                    self.walk(item, depth + 1, path)?;
                    path.pop();
                }
                Ok(())
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
        }
    }

    fn check_depth(&self, depth: usize, path: &[Segment<'_>]) -> Result<(), ValidationError> {
        if depth > self.max_depth {
            return Err(ValidationError::TooDeep {
                max: self.max_depth,
                path: render(path),
            });
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

/// Validate with the default depth bound.
pub fn validate(doc: &Value) -> Result<(), ValidationError> {
    Validator::default().validate(doc)
}

fn check_context(doc: &Value) -> Result<(), ValidationError> {
    let root = doc.as_object().ok_or(ValidationError::RootNotObject)?;
    match root.get(CONTEXT_KEY) {
        None => Err(ValidationError::MissingContext),
        Some(Value::String(_) | Value::Object(_) | Value::Array(_) | Value::Null) => Ok(()),
        Some(Value::Bool(_)) => Err(ValidationError::InvalidContext { found: "boolean" }),
        Some(Value::Number(_)) => Err(ValidationError::InvalidContext { found: "number" }),
    }
}

/// Control bytes below 0x20 are forbidden in keys, except tab and newline.
fn forbidden_key_byte(key: &str) -> Option<u8> {
    key.bytes()
        .find(|&b| b < 0x20 && b != b'\t' && b != b'\n')
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn render(path: &[Segment<'_>]) -> String {
    if path.is_empty() {
        return "root".to_string();
    }
    let mut out = String::from("root");
    for segment in path {
        match segment {
            Segment::Key(key) => out.push_str(&format!("[{key:?}]")),
            Segment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}
