//! Schema graph builder.
//!
//! Nodes are added bottom-up and get their [`NodeId`] immediately. A node
//! that refers to itself (directly or through other nodes) is first
//! `declare`d, used as a child, and `define`d once its children exist:
//!
//! ```rust,ignore
//! let mut b = SchemaBuilder::new();
//! let node = b.declare();                       // Node
//! let value = b.number();
//! let value_prop = b.property("value", value);
//! let next_prop = b.optional_property("next", node);
//! b.define(node, NodeKind::Interface { members: vec![value_prop, next_prop] });
//! let graph = b.finish()?;
//! ```

use super::constants::ConstantsWalker;
use super::{
    CompositionStrategy, Family, IndexKey, LiteralValue, NodeId, NodeKind, SchemaGraph,
    SchemaNode,
};
use crate::config::JitConfig;
use crate::error::{JitError, JitResult};
use tracing::debug;

/// Mutable graph under construction.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<Option<SchemaNode>>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves an id for a node defined later.
    pub fn declare(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(None);
        id
    }

    /// Defines a declared node. Redefining replaces the previous kind.
    pub fn define(&mut self, id: NodeId, kind: NodeKind) -> NodeId {
        self.define_node(id, SchemaNode::new(kind))
    }

    pub fn define_node(&mut self, id: NodeId, node: SchemaNode) -> NodeId {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = Some(node);
        }
        id
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.add_node(SchemaNode::new(kind))
    }

    pub fn add_node(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Sets the declared type name of a node.
    pub fn name(&mut self, id: NodeId, name: impl Into<String>) -> &mut Self {
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.name = Some(name.into());
        }
        self
    }

    pub fn strategy(&mut self, id: NodeId, strategy: CompositionStrategy) -> &mut Self {
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.strategy = strategy;
        }
        self
    }

    // ========================================================================
    // Atomic
    // ========================================================================

    pub fn any(&mut self) -> NodeId {
        self.add(NodeKind::Any)
    }

    pub fn unknown(&mut self) -> NodeId {
        self.add(NodeKind::Unknown)
    }

    pub fn never(&mut self) -> NodeId {
        self.add(NodeKind::Never)
    }

    pub fn null(&mut self) -> NodeId {
        self.add(NodeKind::Null)
    }

    pub fn undefined(&mut self) -> NodeId {
        self.add(NodeKind::Undefined)
    }

    pub fn void(&mut self) -> NodeId {
        self.add(NodeKind::Void)
    }

    pub fn boolean(&mut self) -> NodeId {
        self.add(NodeKind::Boolean)
    }

    pub fn number(&mut self) -> NodeId {
        self.add(NodeKind::Number)
    }

    pub fn string(&mut self) -> NodeId {
        self.add(NodeKind::String)
    }

    pub fn bigint(&mut self) -> NodeId {
        self.add(NodeKind::BigInt)
    }

    pub fn symbol(&mut self) -> NodeId {
        self.add(NodeKind::Symbol)
    }

    pub fn date(&mut self) -> NodeId {
        self.add(NodeKind::Date)
    }

    pub fn regexp(&mut self) -> NodeId {
        self.add(NodeKind::RegExp)
    }

    pub fn object(&mut self) -> NodeId {
        self.add(NodeKind::Object)
    }

    pub fn literal(&mut self, value: LiteralValue) -> NodeId {
        self.add(NodeKind::Literal(value))
    }

    // ========================================================================
    // Collection
    // ========================================================================

    pub fn interface(&mut self, members: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Interface { members })
    }

    pub fn array(&mut self, item: NodeId) -> NodeId {
        self.add(NodeKind::Array { item })
    }

    pub fn tuple(&mut self, members: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Tuple { members })
    }

    pub fn set(&mut self, item: NodeId) -> NodeId {
        self.add(NodeKind::Set { item })
    }

    pub fn map(&mut self, key: NodeId, value: NodeId) -> NodeId {
        self.add(NodeKind::Map { key, value })
    }

    pub fn union(&mut self, variants: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Union { variants })
    }

    pub fn params(&mut self, params: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Params { params })
    }

    // ========================================================================
    // Member
    // ========================================================================

    pub fn property(&mut self, name: &str, child: NodeId) -> NodeId {
        self.add(NodeKind::Property {
            name: name.to_string(),
            optional: false,
            child,
        })
    }

    pub fn optional_property(&mut self, name: &str, child: NodeId) -> NodeId {
        self.add(NodeKind::Property {
            name: name.to_string(),
            optional: true,
            child,
        })
    }

    pub fn index_signature(&mut self, key: IndexKey, child: NodeId) -> NodeId {
        self.add(NodeKind::IndexSignature { key, child })
    }

    pub fn tuple_member(&mut self, child: NodeId) -> NodeId {
        self.add(NodeKind::TupleMember {
            optional: false,
            child,
        })
    }

    pub fn optional_tuple_member(&mut self, child: NodeId) -> NodeId {
        self.add(NodeKind::TupleMember {
            optional: true,
            child,
        })
    }

    pub fn rest(&mut self, child: NodeId) -> NodeId {
        self.add(NodeKind::Rest { child })
    }

    pub fn parameter(&mut self, name: &str, child: NodeId) -> NodeId {
        self.add(NodeKind::Parameter {
            name: name.to_string(),
            optional: false,
            child,
        })
    }

    pub fn optional_parameter(&mut self, name: &str, child: NodeId) -> NodeId {
        self.add(NodeKind::Parameter {
            name: name.to_string(),
            optional: true,
            child,
        })
    }

    pub fn method(&mut self, name: &str, function: NodeId) -> NodeId {
        self.add(NodeKind::Method {
            name: name.to_string(),
            child: function,
        })
    }

    // ========================================================================
    // Function
    // ========================================================================

    pub fn function(&mut self, params: NodeId, ret: NodeId) -> NodeId {
        self.add(NodeKind::Function { params, ret })
    }

    // ========================================================================
    // Finish
    // ========================================================================

    /// Validates the graph and computes per-node constants with the default
    /// configuration.
    pub fn finish(self) -> JitResult<SchemaGraph> {
        self.finish_with(&JitConfig::default())
    }

    pub fn finish_with(self, config: &JitConfig) -> JitResult<SchemaGraph> {
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| node.ok_or(JitError::UndefinedNode(NodeId(i as u32))))
            .collect::<JitResult<Vec<_>>>()?;

        for (i, node) in nodes.iter().enumerate() {
            validate_node(&nodes, NodeId(i as u32), &node.kind)?;
        }

        let circular: Vec<bool> = (0..nodes.len())
            .map(|i| reaches_itself(&nodes, NodeId(i as u32)))
            .collect();

        let mut walker = ConstantsWalker::new(&nodes, &circular, config.max_stack_depth);
        let constants = (0..nodes.len())
            .map(|i| walker.constants(NodeId(i as u32)))
            .collect::<JitResult<Vec<_>>>()?;

        debug!(
            nodes = nodes.len(),
            circular = circular.iter().filter(|c| **c).count(),
            "Schema graph finished"
        );

        Ok(SchemaGraph {
            nodes,
            circular,
            constants,
        })
    }
}

fn invalid(node: NodeId, reason: impl Into<String>) -> JitError {
    JitError::InvalidSchema {
        node,
        reason: reason.into(),
    }
}

fn validate_node(nodes: &[SchemaNode], id: NodeId, kind: &NodeKind) -> JitResult<()> {
    let children = kind.children();
    if let Some(missing) = children.iter().find(|c| c.index() >= nodes.len()) {
        return Err(invalid(id, format!("child {} does not exist", missing)));
    }
    let kind_of = |child: NodeId| &nodes[child.index()].kind;
    let is_member = |child: NodeId| kind_of(child).family() == Family::Member;

    match kind {
        NodeKind::Interface { members } => {
            for member in members {
                if !matches!(
                    kind_of(*member),
                    NodeKind::Property { .. } | NodeKind::IndexSignature { .. } | NodeKind::Method { .. }
                ) {
                    return Err(invalid(id, "interface members must be properties, index signatures or methods"));
                }
            }
        }
        NodeKind::Tuple { members: positional } | NodeKind::Params { params: positional } => {
            let params = matches!(kind, NodeKind::Params { .. });
            let mut seen_optional = false;
            for (i, member) in positional.iter().enumerate() {
                let member_kind = kind_of(*member);
                let allowed = match member_kind {
                    NodeKind::Rest { .. } => true,
                    NodeKind::TupleMember { .. } => !params,
                    NodeKind::Parameter { .. } => params,
                    _ => false,
                };
                if !allowed {
                    return Err(invalid(id, format!("unexpected member at position {}", i)));
                }
                if matches!(member_kind, NodeKind::Rest { .. }) && i + 1 != positional.len() {
                    return Err(invalid(id, "rest member must be last"));
                }
                if member_kind.is_optional() {
                    seen_optional = true;
                } else if seen_optional && !matches!(member_kind, NodeKind::Rest { .. }) {
                    return Err(invalid(id, "required member cannot follow an optional member"));
                }
            }
        }
        NodeKind::Union { variants } => {
            if variants.is_empty() {
                return Err(invalid(id, "union has no variants"));
            }
            if variants.iter().any(|v| is_member(*v)) {
                return Err(invalid(id, "union variants cannot be members"));
            }
        }
        NodeKind::Array { item } | NodeKind::Set { item } => {
            if is_member(*item) {
                return Err(invalid(id, "collection item cannot be a member"));
            }
        }
        NodeKind::Map { key, value } => {
            if is_member(*key) || is_member(*value) {
                return Err(invalid(id, "map key and value cannot be members"));
            }
        }
        NodeKind::Method { child, .. } => {
            if !matches!(kind_of(*child), NodeKind::Function { .. }) {
                return Err(invalid(id, "method must wrap a function"));
            }
        }
        NodeKind::Property { child, .. }
        | NodeKind::IndexSignature { child, .. }
        | NodeKind::TupleMember { child, .. }
        | NodeKind::Rest { child }
        | NodeKind::Parameter { child, .. } => {
            if is_member(*child) {
                return Err(invalid(id, "member cannot wrap another member"));
            }
        }
        NodeKind::Function { params, ret } => {
            if !matches!(kind_of(*params), NodeKind::Params { .. }) {
                return Err(invalid(id, "function parameters must be a params node"));
            }
            if is_member(*ret) {
                return Err(invalid(id, "function return cannot be a member"));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Depth-first search from the children of `start` looking for `start`.
fn reaches_itself(nodes: &[SchemaNode], start: NodeId) -> bool {
    let mut visited = vec![false; nodes.len()];
    let mut pending = nodes[start.index()].kind.children();
    while let Some(id) = pending.pop() {
        if id == start {
            return true;
        }
        if std::mem::replace(&mut visited[id.index()], true) {
            continue;
        }
        pending.extend(nodes[id.index()].kind.children());
    }
    false
}
