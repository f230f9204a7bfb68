//! Error types for schema compilation and compiled-function calls.
//!
//! There are two families:
//!
//! * [`JitError`] is raised while a schema is being finished, fingerprinted,
//!   compiled or mocked. It means the schema or the options are wrong, and it
//!   should stop application startup.
//! * [`DecodeError`] and [`EncodeError`] are returned by compiled codec
//!   functions when one particular input cannot be converted. They belong to
//!   a single call and should be turned into a per-request error.
//!
//! Validation failures are neither: `typeErrors` returns a list of
//! [`RunTypeError`](crate::RunTypeError) values.

use crate::path::{ErrorPath, PathSegment, display_path};
use crate::schema::NodeId;
use thiserror::Error;

/// Configuration-time errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JitError {
    /// Traversal went deeper than `JitConfig::max_stack_depth`.
    #[error("max stack depth of {max} exceeded at {path}, schema is too deep or does not terminate")]
    MaxDepthExceeded { max: usize, path: String },

    /// A node was declared with `SchemaBuilder::declare` but never defined.
    #[error("node {0} was declared but never defined")]
    UndefinedNode(NodeId),

    /// The graph is structurally malformed.
    #[error("invalid schema at node {node}: {reason}")]
    InvalidSchema { node: NodeId, reason: String },

    /// The node cannot be compiled or mocked for the requested operation.
    #[error("{name} {operation} is not supported, {hint}")]
    UnsupportedOperation {
        name: String,
        operation: &'static str,
        hint: String,
    },

    /// A mock option is out of range.
    #[error("invalid mock option {option}: {reason}")]
    InvalidMockOption { option: &'static str, reason: String },
}

impl JitError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MaxDepthExceeded { .. } => "MAX_DEPTH_EXCEEDED",
            Self::UndefinedNode(_) => "UNDEFINED_NODE",
            Self::InvalidSchema { .. } => "INVALID_SCHEMA",
            Self::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            Self::InvalidMockOption { .. } => "INVALID_MOCK_OPTION",
        }
    }

    /// True for errors caused by asking a node for something it can never do,
    /// as opposed to a malformed schema.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }
}

/// Result type for configuration-time operations.
pub type JitResult<T> = Result<T, JitError>;

/// A transport value could not be turned back into a runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {found} as {expected} at {}", display_path(.path))]
pub struct DecodeError {
    pub path: ErrorPath,
    pub expected: String,
    pub found: String,
}

impl DecodeError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Prefixes the path with `segment` while the error unwinds to the root.
    pub fn at(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

/// A runtime value could not be turned into a transport value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode {found} as {expected} at {}", display_path(.path))]
pub struct EncodeError {
    pub path: ErrorPath,
    pub expected: String,
    pub found: String,
}

impl EncodeError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Prefixes the path with `segment` while the error unwinds to the root.
    pub fn at(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}
