//! Runtime error paths.
//!
//! Compiled functions that report problems (`typeErrors`, `getUnknownKeys`)
//! track where they are inside the value being walked. A path is a list of
//! segments, serialized as a JSON array of strings and numbers, the same
//! shape a client receives in a validation failure:
//!
//! ```json
//! { "path": ["users", 3, "email"], "expected": "string" }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step into a value: a named property or a positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Location of a value inside the root value. Empty means the root itself.
pub type ErrorPath = Vec<PathSegment>;

/// Formats a path as `/a/0/b`; the root path is `/`.
pub fn display_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().map(|segment| format!("/{}", segment)).collect()
}

/// A single mismatch reported by `typeErrors`.
///
/// This is data, never an error value: an empty list of these means the
/// value matched its schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunTypeError {
    pub path: ErrorPath,
    pub expected: String,
}

impl RunTypeError {
    pub fn new(path: ErrorPath, expected: impl Into<String>) -> Self {
        Self {
            path,
            expected: expected.into(),
        }
    }
}

impl fmt::Display for RunTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} at {}", self.expected, display_path(&self.path))
    }
}

/// Mutable walk state handed down through a compiled function.
///
/// Members push their segment before calling into their child and pop it
/// afterwards, so `path` always mirrors the position of the value currently
/// being inspected.
#[derive(Debug)]
pub struct PathWalker<T> {
    path: ErrorPath,
    found: Vec<T>,
}

impl<T> Default for PathWalker<T> {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            found: Vec::new(),
        }
    }
}

impl<T> PathWalker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with `segment` appended to the current path.
    pub fn scoped<R>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub fn push(&mut self, item: T) {
        self.found.push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn into_found(self) -> Vec<T> {
        self.found
    }
}

/// Walker used by `typeErrors`.
pub type ErrorCollector = PathWalker<RunTypeError>;

impl PathWalker<RunTypeError> {
    /// Records that the value at the current path is not a `expected`.
    pub fn expected(&mut self, expected: &str) {
        let error = RunTypeError::new(self.path.clone(), expected);
        self.found.push(error);
    }
}

/// Walker used by `getUnknownKeys`.
pub type KeyCollector = PathWalker<ErrorPath>;

impl PathWalker<ErrorPath> {
    /// Records `key` as undeclared on the object at the current path.
    pub fn unknown_key(&mut self, key: &str) {
        let mut path = self.path.clone();
        path.push(PathSegment::Key(key.to_string()));
        self.found.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(&[]), "/");
        let path = vec![PathSegment::from("users"), 3.into(), "email".into()];
        assert_eq!(display_path(&path), "/users/3/email");
    }

    #[test]
    fn test_segments_serialize_untagged() {
        let error = RunTypeError::new(vec!["a".into(), 0.into()], "number");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json, serde_json::json!({"path": ["a", 0], "expected": "number"}));
    }

    #[test]
    fn test_collector_tracks_scope() {
        let mut collector = ErrorCollector::new();
        collector.scoped("a".into(), |c| {
            c.scoped(1.into(), |c| c.expected("string"));
            assert_eq!(c.path(), &[PathSegment::from("a")]);
        });
        collector.expected("object");

        let errors = collector.into_found();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, vec![PathSegment::from("a"), PathSegment::Index(1)]);
        assert!(errors[1].path.is_empty());
    }

    #[test]
    fn test_key_collector_appends_key() {
        let mut keys = KeyCollector::new();
        keys.scoped("user".into(), |k| k.unknown_key("extra"));
        assert_eq!(
            keys.into_found(),
            vec![vec![PathSegment::from("user"), PathSegment::from("extra")]]
        );
    }
}
