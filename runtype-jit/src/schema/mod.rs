//! Schema graph
//!
//! The intermediate representation the compiler consumes. A schema is an
//! arena of [`SchemaNode`]s addressed by [`NodeId`]; edges are ids, so
//! self-referential shapes are ordinary graphs with cycles.
//!
//! Nodes come in four families:
//!
//! * **atomic** - no children (`number`, `string`, literals, ...)
//! * **collection** - aggregates children (`interface`, `array`, `tuple`,
//!   `set`, `map`, `union`, `params`)
//! * **member** - wraps exactly one child and adds an accessor (`property`,
//!   `indexSignature`, `tupleMember`, `rest`, `parameter`, `method`)
//! * **function** - a parameter list and a return type
//!
//! Graphs are built with [`SchemaBuilder`] and are immutable once finished.
//! Finishing computes, per node, whether it is circular and its
//! [`JitConstants`] (fingerprint and skip flags).

mod builder;
mod constants;
mod names;

pub use builder::SchemaBuilder;
pub use constants::{JitConstants, SkipFlags};
pub(crate) use names::static_path;

use crate::value::{RegExpValue, Value};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a node inside its [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Node kinds
// ============================================================================

/// The four node families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Atomic,
    Collection,
    Member,
    Function,
}

/// Value of a literal type.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
    BigInt(i128),
    Symbol(String),
    RegExp(RegExpValue),
}

impl LiteralValue {
    /// Whether `value` is exactly this literal.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Number(a), Value::Number(b)) => a == b,
            (Self::String(a), Value::String(b)) => a == b,
            (Self::Boolean(a), Value::Bool(b)) => a == b,
            (Self::BigInt(a), Value::BigInt(b)) => a == b,
            (Self::Symbol(a), Value::Symbol(Some(b))) => a == b,
            (Self::RegExp(a), Value::RegExp(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::Boolean(b) => Value::Bool(*b),
            Self::BigInt(n) => Value::BigInt(*n),
            Self::Symbol(s) => Value::Symbol(Some(s.clone())),
            Self::RegExp(re) => Value::RegExp(re.clone()),
        }
    }

    /// Canonical text used in fingerprints.
    pub fn canonical(&self) -> String {
        match self {
            Self::Number(n) => format!("number:{}", n),
            Self::String(s) => format!("string:{}", quoted(s)),
            Self::Boolean(b) => format!("boolean:{}", b),
            Self::BigInt(n) => format!("bigint:{}", n),
            Self::Symbol(s) => format!("symbol:{}", quoted(s)),
            Self::RegExp(re) => format!("regexp:{}/{}", quoted(&re.source), quoted(&re.flags)),
        }
    }

    /// Whether the transport form decodes to the same value without help.
    pub(crate) fn is_json_native(&self) -> bool {
        matches!(self, Self::Number(_) | Self::String(_) | Self::Boolean(_))
    }
}

/// Key type of an index signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKey {
    String,
    Number,
}

impl IndexKey {
    pub fn accepts(self, key: &str) -> bool {
        match self {
            Self::String => true,
            Self::Number => key.parse::<f64>().is_ok_and(f64::is_finite),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
        }
    }
}

/// Per-node choice between inlining and compiling as a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositionStrategy {
    /// Decided by the node's circularity and the context policy.
    #[default]
    Auto,
    /// Inline unless the node is circular.
    Inline,
    /// Always compile as a separate registry function.
    Dependency,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Atomic
    Any,
    Unknown,
    Never,
    Null,
    Undefined,
    Void,
    Boolean,
    Number,
    String,
    BigInt,
    Symbol,
    Date,
    RegExp,
    Object,
    Literal(LiteralValue),

    // Collection
    Interface { members: Vec<NodeId> },
    Array { item: NodeId },
    Tuple { members: Vec<NodeId> },
    Set { item: NodeId },
    Map { key: NodeId, value: NodeId },
    Union { variants: Vec<NodeId> },
    Params { params: Vec<NodeId> },

    // Member
    Property { name: String, optional: bool, child: NodeId },
    IndexSignature { key: IndexKey, child: NodeId },
    TupleMember { optional: bool, child: NodeId },
    Rest { child: NodeId },
    Parameter { name: String, optional: bool, child: NodeId },
    Method { name: String, child: NodeId },

    // Function
    Function { params: NodeId, ret: NodeId },
}

impl NodeKind {
    pub fn family(&self) -> Family {
        match self {
            Self::Interface { .. }
            | Self::Array { .. }
            | Self::Tuple { .. }
            | Self::Set { .. }
            | Self::Map { .. }
            | Self::Union { .. }
            | Self::Params { .. } => Family::Collection,
            Self::Property { .. }
            | Self::IndexSignature { .. }
            | Self::TupleMember { .. }
            | Self::Rest { .. }
            | Self::Parameter { .. }
            | Self::Method { .. } => Family::Member,
            Self::Function { .. } => Family::Function,
            _ => Family::Atomic,
        }
    }

    /// Ordered children. Order is significant for positional members.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Interface { members } | Self::Tuple { members } => members.clone(),
            Self::Union { variants } => variants.clone(),
            Self::Params { params } => params.clone(),
            Self::Array { item } | Self::Set { item } => vec![*item],
            Self::Map { key, value } => vec![*key, *value],
            Self::Property { child, .. }
            | Self::IndexSignature { child, .. }
            | Self::TupleMember { child, .. }
            | Self::Rest { child }
            | Self::Parameter { child, .. }
            | Self::Method { child, .. } => vec![*child],
            Self::Function { params, ret } => vec![*params, *ret],
            _ => Vec::new(),
        }
    }

    /// The wrapped child of a member node.
    pub fn member_child(&self) -> Option<NodeId> {
        match self {
            Self::Property { child, .. }
            | Self::IndexSignature { child, .. }
            | Self::TupleMember { child, .. }
            | Self::Rest { child }
            | Self::Parameter { child, .. }
            | Self::Method { child, .. } => Some(*child),
            _ => None,
        }
    }

    /// Whether a member may be absent.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Self::Property { optional: true, .. }
                | Self::TupleMember { optional: true, .. }
                | Self::Parameter { optional: true, .. }
        )
    }
}

/// A node: its kind plus metadata that does not affect its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    /// Declared type name. Never part of the fingerprint.
    pub name: Option<String>,
    pub strategy: CompositionStrategy,
}

impl SchemaNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            strategy: CompositionStrategy::Auto,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_strategy(mut self, strategy: CompositionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

// ============================================================================
// Graph
// ============================================================================

/// A finished, immutable schema graph.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    circular: Vec<bool>,
    constants: Vec<JitConstants>,
}

impl SchemaGraph {
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// True if the node can reach itself.
    pub fn is_circular(&self, id: NodeId) -> bool {
        self.circular[id.index()]
    }

    pub fn constants(&self, id: NodeId) -> &JitConstants {
        &self.constants[id.index()]
    }

    /// Structural identity of the node, independent of type names.
    pub fn fingerprint(&self, id: NodeId) -> &str {
        &self.constants[id.index()].fingerprint
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Whether `undefined` is a valid value of the node, looking through
    /// unions.
    pub fn accepts_undefined(&self, id: NodeId) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            match self.kind(id) {
                NodeKind::Undefined | NodeKind::Void | NodeKind::Any | NodeKind::Unknown => {
                    return true;
                }
                NodeKind::Union { variants } => pending.extend(variants),
                _ => {}
            }
        }
        false
    }

    pub(crate) fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }
}

fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
