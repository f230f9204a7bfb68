use super::{UNDEFINED, object_plan, positional_plan};
use crate::error::JitResult;
use crate::jit::{Composer, Fragment, JitFnId, Operation, Slot};
use crate::schema::{NodeId, NodeKind, SkipFlags};
use crate::value::Value;
use std::sync::Arc;

pub type IsTypeFn = dyn Fn(&Value) -> bool + Send + Sync;

/// `isType(value) -> bool`
pub struct IsType;

/// Predicate for an atomic kind. `None` for kinds that accept everything.
pub(crate) fn atomic_check(kind: &NodeKind) -> Option<Arc<IsTypeFn>> {
    let check: Arc<IsTypeFn> = match kind {
        NodeKind::Any | NodeKind::Unknown => return None,
        NodeKind::Never => Arc::new(|_| false),
        NodeKind::Null => Arc::new(|v| matches!(v, Value::Null)),
        NodeKind::Undefined | NodeKind::Void => Arc::new(|v| matches!(v, Value::Undefined)),
        NodeKind::Boolean => Arc::new(|v| matches!(v, Value::Bool(_))),
        NodeKind::Number => Arc::new(|v| matches!(v, Value::Number(n) if n.is_finite())),
        NodeKind::String => Arc::new(|v| matches!(v, Value::String(_))),
        NodeKind::BigInt => Arc::new(|v| matches!(v, Value::BigInt(_))),
        NodeKind::Symbol => Arc::new(|v| matches!(v, Value::Symbol(_))),
        NodeKind::Date => Arc::new(|v| matches!(v, Value::Date(_))),
        NodeKind::RegExp => Arc::new(|v| matches!(v, Value::RegExp(_))),
        NodeKind::Object => Arc::new(Value::is_object_like),
        NodeKind::Literal(lit) => {
            let lit = lit.clone();
            Arc::new(move |v| lit.matches(v))
        }
        _ => return None,
    };
    Some(check)
}

impl Operation for IsType {
    type Func = IsTypeFn;
    const ID: JitFnId = JitFnId::IsType;

    fn skips(flags: &SkipFlags) -> bool {
        flags.jit
    }

    fn neutral() -> Arc<IsTypeFn> {
        Arc::new(|_| true)
    }

    fn late_bound(slot: Slot<IsTypeFn>) -> Arc<IsTypeFn> {
        Arc::new(move |v| slot.get().is_some_and(|f| f(v)))
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<IsTypeFn>> {
        let graph = c.graph();
        let f: Arc<IsTypeFn> = match graph.kind(id) {
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |v| match v {
                    Value::Object(map) => {
                        plan.properties.iter().all(|(name, f)| match f {
                            Some(f) => f(map.get(name).unwrap_or(&UNDEFINED)),
                            None => true,
                        }) && plan.indexes.iter().all(|(key, f)| match f {
                            Some(f) => map.iter().filter(|(k, _)| key.accepts(k)).all(|(_, v)| f(v)),
                            None => true,
                        })
                    }
                    _ => false,
                })
            }
            NodeKind::Array { item } => match c.child(*item)?.into_code() {
                Some(f) => Arc::new(move |v| match v {
                    Value::Array(items) => items.iter().all(|i| f(i)),
                    _ => false,
                }),
                None => Arc::new(|v| matches!(v, Value::Array(_))),
            },
            NodeKind::Set { item } => match c.child(*item)?.into_code() {
                Some(f) => Arc::new(move |v| match v {
                    Value::Set(items) => items.iter().all(|i| f(i)),
                    _ => false,
                }),
                None => Arc::new(|v| matches!(v, Value::Set(_))),
            },
            NodeKind::Map { key, value } => {
                let key = c.child_or_neutral(*key)?;
                let value = c.child_or_neutral(*value)?;
                Arc::new(move |v| match v {
                    Value::Map(entries) => entries.iter().all(|(k, v)| key(k) && value(v)),
                    _ => false,
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |v| match v {
                    Value::Array(items) => {
                        plan.accepts_len(items.len())
                            && plan.items.iter().enumerate().all(|(i, (_, f))| match f {
                                Some(f) => f(items.get(i).unwrap_or(&UNDEFINED)),
                                None => true,
                            })
                            && match &plan.rest {
                                Some(Some(f)) => items.iter().skip(plan.items.len()).all(|i| f(i)),
                                _ => true,
                            }
                    }
                    _ => false,
                })
            }
            NodeKind::Union { variants } => {
                let mut checks = Vec::with_capacity(variants.len());
                for variant in variants {
                    match c.child(*variant)?.into_code() {
                        Some(f) => checks.push(f),
                        // a variant that accepts everything makes the union accept everything
                        None => return Ok(Fragment::Empty),
                    }
                }
                Arc::new(move |v| checks.iter().any(|f| f(v)))
            }
            NodeKind::Property { optional, child, .. }
            | NodeKind::TupleMember { optional, child }
            | NodeKind::Parameter { optional, child, .. } => {
                let Some(f) = c.child(*child)?.into_code() else {
                    return Ok(Fragment::Empty);
                };
                if *optional {
                    Arc::new(move |v| v.is_undefined() || f(v))
                } else {
                    f
                }
            }
            NodeKind::IndexSignature { child, .. } | NodeKind::Rest { child } => {
                return c.child(*child);
            }
            NodeKind::Method { .. } | NodeKind::Function { .. } => return Ok(Fragment::Empty),
            atomic => match atomic_check(atomic) {
                Some(f) => f,
                None => return Ok(Fragment::Empty),
            },
        };
        Ok(Fragment::code(f))
    }
}
