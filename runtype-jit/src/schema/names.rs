//! Human-readable names for nodes.

use super::{LiteralValue, NodeId, NodeKind, SchemaGraph, SchemaNode};

impl SchemaGraph {
    /// Short name reported as `expected` in validation errors.
    pub fn display_name(&self, id: NodeId) -> String {
        display_name(self.nodes(), id)
    }

    /// TypeScript-like signature, e.g. `[a:number, b?:string]`.
    pub fn type_signature(&self, id: NodeId) -> String {
        let mut visiting = Vec::new();
        signature(self.nodes(), id, &mut visiting)
    }
}

pub(crate) fn display_name(nodes: &[SchemaNode], id: NodeId) -> String {
    let kind = &nodes[id.index()].kind;
    match kind {
        NodeKind::Any => "any",
        NodeKind::Unknown => "unknown",
        NodeKind::Never => "never",
        NodeKind::Null => "null",
        NodeKind::Undefined => "undefined",
        NodeKind::Void => "void",
        NodeKind::Boolean => "boolean",
        NodeKind::Number => "number",
        NodeKind::String => "string",
        NodeKind::BigInt => "bigint",
        NodeKind::Symbol => "symbol",
        NodeKind::Date => "date",
        NodeKind::RegExp => "regexp",
        NodeKind::Object => "object",
        NodeKind::Literal(_) => "literal",
        NodeKind::Interface { .. } => "object",
        NodeKind::Array { .. } => "array",
        NodeKind::Tuple { .. } => "tuple",
        NodeKind::Set { .. } => "set",
        NodeKind::Map { .. } => "map",
        NodeKind::Union { .. } => "union",
        NodeKind::Params { .. } => "params",
        NodeKind::Function { .. } => "function",
        NodeKind::Method { .. } => "method",
        NodeKind::Property { child, .. }
        | NodeKind::IndexSignature { child, .. }
        | NodeKind::TupleMember { child, .. }
        | NodeKind::Rest { child }
        | NodeKind::Parameter { child, .. } => return display_name(nodes, *child),
    }
    .to_string()
}

fn literal_signature(lit: &LiteralValue) -> String {
    match lit {
        LiteralValue::Number(n) => n.to_string(),
        LiteralValue::String(s) => super::quoted(s),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::BigInt(n) => format!("{}n", n),
        LiteralValue::Symbol(s) => format!("Symbol({})", s),
        LiteralValue::RegExp(re) => re.to_string(),
    }
}

fn signature(nodes: &[SchemaNode], id: NodeId, visiting: &mut Vec<NodeId>) -> String {
    let node = &nodes[id.index()];
    if visiting.contains(&id) {
        return node.name.clone().unwrap_or_else(|| "circular".to_string());
    }
    visiting.push(id);
    let list = |ids: &[NodeId], visiting: &mut Vec<NodeId>| {
        ids.iter()
            .map(|child| signature(nodes, *child, visiting))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let optional = |o: bool| if o { "?" } else { "" };
    let result = match &node.kind {
        NodeKind::Literal(lit) => literal_signature(lit),
        NodeKind::Interface { members } => format!("{{{}}}", list(members, visiting)),
        NodeKind::Tuple { members } => format!("[{}]", list(members, visiting)),
        NodeKind::Params { params } => format!("[{}]", list(params, visiting)),
        NodeKind::Union { variants } => variants
            .iter()
            .map(|v| signature(nodes, *v, visiting))
            .collect::<Vec<_>>()
            .join(" | "),
        NodeKind::Array { item } => format!("{}[]", signature(nodes, *item, visiting)),
        NodeKind::Set { item } => format!("Set<{}>", signature(nodes, *item, visiting)),
        NodeKind::Map { key, value } => format!(
            "Map<{}, {}>",
            signature(nodes, *key, visiting),
            signature(nodes, *value, visiting)
        ),
        NodeKind::Property { name, optional: o, child }
        | NodeKind::Parameter { name, optional: o, child } => {
            format!("{}{}:{}", name, optional(*o), signature(nodes, *child, visiting))
        }
        NodeKind::IndexSignature { key, child } => {
            format!("[key: {}]:{}", key.as_str(), signature(nodes, *child, visiting))
        }
        NodeKind::TupleMember { optional: o, child } => {
            format!("{}{}", signature(nodes, *child, visiting), optional(*o))
        }
        NodeKind::Rest { child } => format!("...{}[]", signature(nodes, *child, visiting)),
        NodeKind::Method { name, .. } => format!("{}()", name),
        NodeKind::Function { params, ret } => format!(
            "function<{}, {}>",
            signature(nodes, *params, visiting),
            signature(nodes, *ret, visiting)
        ),
        _ => display_name(nodes, id),
    };
    visiting.pop();
    result
}

/// Location of the innermost node of `stack`, as `/user/address/zip`.
///
/// Positional members use their index, array-like items use `*`.
pub(crate) fn static_path(nodes: &[SchemaNode], stack: &[NodeId]) -> String {
    let mut path = String::new();
    for pair in stack.windows(2) {
        let (parent, child) = (&nodes[pair[0].index()].kind, pair[1]);
        let segment = match (&nodes[child.index()].kind, parent) {
            (
                NodeKind::Property { name, .. }
                | NodeKind::Parameter { name, .. }
                | NodeKind::Method { name, .. },
                _,
            ) => Some(name.clone()),
            (NodeKind::TupleMember { .. } | NodeKind::Rest { .. }, _) => parent
                .children()
                .iter()
                .position(|m| *m == child)
                .map(|i| i.to_string()),
            (NodeKind::IndexSignature { .. }, _) => Some("*".to_string()),
            (_, NodeKind::Array { .. } | NodeKind::Set { .. }) => Some("*".to_string()),
            (_, NodeKind::Map { key, .. }) => {
                Some(if *key == child { "key" } else { "value" }.to_string())
            }
            (_, NodeKind::Function { params, .. }) => {
                Some(if *params == child { "params" } else { "return" }.to_string())
            }
            _ => None,
        };
        if let Some(segment) = segment {
            path.push('/');
            path.push_str(&segment);
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
