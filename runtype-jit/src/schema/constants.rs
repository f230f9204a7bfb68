//! Fingerprints and skip flags.
//!
//! Both are computed by one depth-first walk with an explicit stack. When the
//! walk meets a node that is already on the stack it emits a back-reference
//! `$ref<n>`, `n` being the distance up the stack, and stops. Back-references
//! are neutral for the skip flags.
//!
//! Results of nodes outside any cycle are cached, so shared subtrees are
//! walked once. A node on a cycle is walked afresh under every root: its
//! fingerprint depends on where the walk entered the cycle, and a cached
//! result would make it depend on declaration order instead.

use super::{NodeId, NodeKind, SchemaNode, static_path};
use crate::error::{JitError, JitResult};
use std::collections::HashMap;

/// Per-operation flags. `true` means the node needs no work for that
/// operation and the parent may drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkipFlags {
    /// `isType`/`typeErrors` accept every value.
    pub jit: bool,
    /// The schema-less transport conversion is exact.
    pub encode: bool,
    /// The schema-less decoding is exact.
    pub decode: bool,
    /// No object with declared keys is reachable.
    pub unknown_keys: bool,
}

impl SkipFlags {
    pub const ALL: Self = Self {
        jit: true,
        encode: true,
        decode: true,
        unknown_keys: true,
    };

    fn and(self, other: Self) -> Self {
        Self {
            jit: self.jit && other.jit,
            encode: self.encode && other.encode,
            decode: self.decode && other.decode,
            unknown_keys: self.unknown_keys && other.unknown_keys,
        }
    }

    /// What the node itself contributes, before its children.
    fn own(kind: &NodeKind) -> Self {
        use NodeKind::*;
        match kind {
            Any | Unknown => Self::ALL,
            Never => Self {
                jit: false,
                encode: false,
                decode: false,
                unknown_keys: true,
            },
            Null | Boolean | Number | String | Object => Self {
                jit: false,
                encode: true,
                decode: true,
                unknown_keys: true,
            },
            Undefined | Void | BigInt | Symbol | Date | RegExp => Self {
                jit: false,
                encode: true,
                decode: false,
                unknown_keys: true,
            },
            Literal(lit) => Self {
                jit: false,
                encode: true,
                decode: lit.is_json_native(),
                unknown_keys: true,
            },
            Interface { .. } => Self {
                jit: false,
                encode: false,
                decode: false,
                unknown_keys: false,
            },
            Union { .. } => Self {
                jit: false,
                encode: false,
                decode: false,
                unknown_keys: true,
            },
            Set { .. } | Map { .. } => Self {
                jit: false,
                encode: true,
                decode: false,
                unknown_keys: true,
            },
            Array { .. } | Tuple { .. } | Params { .. } => Self {
                jit: false,
                encode: true,
                decode: true,
                unknown_keys: true,
            },
            TupleMember { optional, .. } | Parameter { optional, .. } => Self {
                jit: true,
                encode: true,
                decode: !optional,
                unknown_keys: true,
            },
            Property { .. } | IndexSignature { .. } | Rest { .. } => Self::ALL,
            Method { .. } | Function { .. } => Self::ALL,
        }
    }
}

/// Compile-time constants of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JitConstants {
    pub fingerprint: String,
    pub skip: SkipFlags,
}

impl JitConstants {
    fn back_ref(distance: usize) -> Self {
        Self {
            fingerprint: format!("$ref{}", distance),
            skip: SkipFlags::ALL,
        }
    }
}

struct Walked {
    constants: JitConstants,
    /// Lowest stack position referenced from inside this subtree.
    lowest_ref: Option<usize>,
}

pub(crate) struct ConstantsWalker<'a> {
    nodes: &'a [SchemaNode],
    circular: &'a [bool],
    max_depth: usize,
    memo: HashMap<NodeId, JitConstants>,
    stack: Vec<NodeId>,
}

impl<'a> ConstantsWalker<'a> {
    pub(crate) fn new(nodes: &'a [SchemaNode], circular: &'a [bool], max_depth: usize) -> Self {
        Self {
            nodes,
            circular,
            max_depth,
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Constants of `id` as a root.
    pub(crate) fn constants(&mut self, id: NodeId) -> JitResult<JitConstants> {
        debug_assert!(self.stack.is_empty());
        Ok(self.walk(id)?.constants)
    }

    fn walk(&mut self, id: NodeId) -> JitResult<Walked> {
        if let Some(constants) = self.memo.get(&id) {
            return Ok(Walked {
                constants: constants.clone(),
                lowest_ref: None,
            });
        }
        if let Some(pos) = self.stack.iter().position(|n| *n == id) {
            return Ok(Walked {
                constants: JitConstants::back_ref(self.stack.len() - pos),
                lowest_ref: Some(pos),
            });
        }
        if self.stack.len() >= self.max_depth {
            return Err(JitError::MaxDepthExceeded {
                max: self.max_depth,
                path: static_path(self.nodes, &self.stack),
            });
        }

        let pos = self.stack.len();
        self.stack.push(id);
        let result = self.walk_children(id);
        self.stack.pop();

        let walked = result?;
        let lowest_ref = walked.lowest_ref.filter(|p| *p < pos);
        if lowest_ref.is_none() && !self.circular[id.index()] {
            self.memo.insert(id, walked.constants.clone());
        }
        Ok(Walked {
            constants: walked.constants,
            lowest_ref,
        })
    }

    fn walk_children(&mut self, id: NodeId) -> JitResult<Walked> {
        let nodes = self.nodes;
        let kind = &nodes[id.index()].kind;
        let own = SkipFlags::own(kind);

        // methods are never compiled, so their signature is not walked
        if let NodeKind::Method { name, .. } = kind {
            return Ok(Walked {
                constants: JitConstants {
                    fingerprint: format!("method:{}", super::quoted(name)),
                    skip: own,
                },
                lowest_ref: None,
            });
        }

        let mut skip = own;
        let mut parts = Vec::new();
        let mut lowest_ref: Option<usize> = None;
        for child in kind.children() {
            let walked = self.walk(child)?;
            skip = skip.and(walked.constants.skip);
            parts.push(walked.constants.fingerprint);
            lowest_ref = match (lowest_ref, walked.lowest_ref) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        if matches!(kind, NodeKind::Function { .. }) {
            skip = own;
        }

        Ok(Walked {
            constants: JitConstants {
                fingerprint: fingerprint(kind, &parts),
                skip,
            },
            lowest_ref,
        })
    }
}

fn fingerprint(kind: &NodeKind, parts: &[String]) -> String {
    use NodeKind::*;
    let optional = |o: &bool| if *o { "?" } else { "" };
    match kind {
        Any => "any".to_string(),
        Unknown => "unknown".to_string(),
        Never => "never".to_string(),
        Null => "null".to_string(),
        Undefined => "undefined".to_string(),
        Void => "void".to_string(),
        Boolean => "boolean".to_string(),
        Number => "number".to_string(),
        String => "string".to_string(),
        BigInt => "bigint".to_string(),
        Symbol => "symbol".to_string(),
        Date => "date".to_string(),
        RegExp => "regexp".to_string(),
        Object => "object".to_string(),
        Literal(lit) => format!("lit:{}", lit.canonical()),
        Interface { .. } => format!("interface[{}]", parts.join(",")),
        Array { .. } => format!("array[{}]", parts.join(",")),
        Tuple { .. } => format!("tuple[{}]", parts.join(",")),
        Set { .. } => format!("set[{}]", parts.join(",")),
        Map { .. } => format!("map[{}]", parts.join(",")),
        Union { .. } => format!("union[{}]", parts.join(",")),
        Params { .. } => format!("params[{}]", parts.join(",")),
        Property { name, optional: o, .. } => {
            format!("prop:{}{}:{}", super::quoted(name), optional(o), parts.join(""))
        }
        IndexSignature { key, .. } => format!("[{}]:{}", key.as_str(), parts.join("")),
        TupleMember { optional: o, .. } => format!("tm{}:{}", optional(o), parts.join("")),
        Rest { .. } => format!("...:{}", parts.join("")),
        Parameter { name, optional: o, .. } => {
            format!("param:{}{}:{}", super::quoted(name), optional(o), parts.join(""))
        }
        Method { name, .. } => format!("method:{}", super::quoted(name)),
        Function { .. } => format!("fn({})=>{}", parts[0], parts[1]),
    }
}
