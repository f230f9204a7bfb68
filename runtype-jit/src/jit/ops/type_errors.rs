use super::is_type::atomic_check;
use super::{IsType, UNDEFINED, object_plan, positional_plan};
use crate::error::JitResult;
use crate::jit::{Composer, Fragment, JitFnId, Operation, Slot};
use crate::path::{ErrorCollector, PathSegment};
use crate::schema::{NodeId, NodeKind, SkipFlags};
use crate::value::Value;
use std::sync::Arc;

pub type TypeErrorsFn = dyn Fn(&Value, &mut ErrorCollector) + Send + Sync;

/// `typeErrors(value) -> [{path, expected}]`
///
/// Reports every mismatch instead of stopping at the first one. A value has
/// no errors exactly when `isType` accepts it.
pub struct TypeErrors;

impl Operation for TypeErrors {
    type Func = TypeErrorsFn;
    const ID: JitFnId = JitFnId::TypeErrors;

    fn skips(flags: &SkipFlags) -> bool {
        flags.jit
    }

    fn neutral() -> Arc<TypeErrorsFn> {
        Arc::new(|_, _| {})
    }

    fn late_bound(slot: Slot<TypeErrorsFn>) -> Arc<TypeErrorsFn> {
        Arc::new(move |v, errors| {
            if let Some(f) = slot.get() {
                f(v, errors)
            }
        })
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<TypeErrorsFn>> {
        let graph = c.graph();
        let name = match graph.kind(id) {
            // argument lists are reported by their full signature
            NodeKind::Params { .. } => graph.type_signature(id),
            _ => graph.display_name(id),
        };
        let f: Arc<TypeErrorsFn> = match graph.kind(id) {
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |v, errors| match v {
                    Value::Object(map) => {
                        for (key, f) in &plan.properties {
                            if let Some(f) = f {
                                let value = map.get(key).unwrap_or(&UNDEFINED);
                                errors.scoped(PathSegment::Key(key.clone()), |e| f(value, e));
                            }
                        }
                        for (index, f) in &plan.indexes {
                            let Some(f) = f else { continue };
                            for (key, value) in map.iter().filter(|(k, _)| index.accepts(k)) {
                                errors.scoped(PathSegment::Key(key.clone()), |e| f(value, e));
                            }
                        }
                    }
                    _ => errors.expected(&name),
                })
            }
            NodeKind::Array { item } | NodeKind::Set { item } => {
                let is_set = matches!(graph.kind(id), NodeKind::Set { .. });
                let f = c.child(*item)?.into_code();
                Arc::new(move |v, errors| match (v, is_set) {
                    (Value::Array(items), false) | (Value::Set(items), true) => {
                        if let Some(f) = &f {
                            for (i, item) in items.iter().enumerate() {
                                errors.scoped(PathSegment::Index(i), |e| f(item, e));
                            }
                        }
                    }
                    _ => errors.expected(&name),
                })
            }
            NodeKind::Map { key, value } => {
                let key = c.child_or_neutral(*key)?;
                let value = c.child_or_neutral(*value)?;
                Arc::new(move |v, errors| match v {
                    Value::Map(entries) => {
                        for (i, (k, v)) in entries.iter().enumerate() {
                            errors.scoped(PathSegment::Index(i), |e| {
                                e.scoped(PathSegment::Index(0), |e| key(k, e));
                                e.scoped(PathSegment::Index(1), |e| value(v, e));
                            });
                        }
                    }
                    _ => errors.expected(&name),
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |v, errors| match v {
                    Value::Array(items) => {
                        if !plan.accepts_len(items.len()) {
                            errors.expected(&name);
                        }
                        for (i, (segment, f)) in plan.items.iter().enumerate() {
                            if let Some(f) = f {
                                let item = items.get(i).unwrap_or(&UNDEFINED);
                                errors.scoped(segment.clone(), |e| f(item, e));
                            }
                        }
                        if let Some(Some(f)) = &plan.rest {
                            for (i, item) in items.iter().enumerate().skip(plan.items.len()) {
                                errors.scoped(PathSegment::Index(i), |e| f(item, e));
                            }
                        }
                    }
                    _ => errors.expected(&name),
                })
            }
            NodeKind::Union { .. } => {
                let check = c.compile_other::<IsType>(id)?;
                Arc::new(move |v, errors| {
                    if !check(v) {
                        errors.expected(&name);
                    }
                })
            }
            NodeKind::Property { optional, child, .. }
            | NodeKind::TupleMember { optional, child }
            | NodeKind::Parameter { optional, child, .. } => {
                let Some(f) = c.child(*child)?.into_code() else {
                    return Ok(Fragment::Empty);
                };
                if *optional {
                    Arc::new(move |v, errors| {
                        if !v.is_undefined() {
                            f(v, errors)
                        }
                    })
                } else {
                    f
                }
            }
            NodeKind::IndexSignature { child, .. } | NodeKind::Rest { child } => {
                return c.child(*child);
            }
            NodeKind::Method { .. } | NodeKind::Function { .. } => return Ok(Fragment::Empty),
            atomic => match atomic_check(atomic) {
                Some(check) => Arc::new(move |v, errors| {
                    if !check(v) {
                        errors.expected(&name);
                    }
                }),
                None => return Ok(Fragment::Empty),
            },
        };
        Ok(Fragment::code(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::RunTypeError;
    use crate::registry::JitContext;
    use crate::schema::SchemaBuilder;

    fn run(f: &TypeErrorsFn, v: &Value) -> Vec<RunTypeError> {
        let mut errors = ErrorCollector::new();
        f(v, &mut errors);
        errors.into_found()
    }

    #[test]
    fn test_atomic_error_at_root() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let graph = b.finish().unwrap();
        let f = ctx.compile::<TypeErrors>(&graph, n).unwrap();

        assert_eq!(
            run(&**f.func(), &Value::from("x")),
            vec![RunTypeError::new(vec![], "number")]
        );
        assert!(run(&**f.func(), &Value::from(1)).is_empty());
    }

    #[test]
    fn test_collects_every_error() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let s = b.string();
        let n = b.number();
        let name = b.property("name", s);
        let tags = b.array(n);
        let tags_prop = b.property("tags", tags);
        let user = b.interface(vec![name, tags_prop]);
        let graph = b.finish().unwrap();
        let f = ctx.compile::<TypeErrors>(&graph, user).unwrap();

        let value = Value::object([
            ("name", Value::from(1)),
            ("tags", Value::array([Value::from(1), Value::from("two")])),
        ]);
        assert_eq!(
            run(&**f.func(), &value),
            vec![
                RunTypeError::new(vec!["name".into()], "string"),
                RunTypeError::new(vec!["tags".into(), 1.into()], "number"),
            ]
        );
    }

    #[test]
    fn test_too_many_arguments_reports_signature() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let bool_ = b.boolean();
        let s = b.string();
        let a = b.parameter("a", n);
        let flag = b.parameter("b", bool_);
        let c = b.optional_parameter("c", s);
        let params = b.params(vec![a, flag, c]);
        let graph = b.finish().unwrap();
        let f = ctx.compile::<TypeErrors>(&graph, params).unwrap();

        let args = Value::array([
            Value::from(1),
            Value::from(true),
            Value::from("x"),
            Value::from(4),
        ]);
        assert_eq!(
            run(&**f.func(), &args),
            vec![RunTypeError::new(vec![], "[a:number, b:boolean, c?:string]")]
        );
        assert_eq!(
            run(&**f.func(), &Value::array([Value::from(1), Value::from(2)])),
            vec![RunTypeError::new(vec!["b".into()], "boolean")]
        );
    }

    #[test]
    fn test_map_entry_paths() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let s = b.string();
        let n = b.number();
        let m = b.map(s, n);
        let graph = b.finish().unwrap();
        let f = ctx.compile::<TypeErrors>(&graph, m).unwrap();

        let value = Value::Map(vec![
            (Value::from("a"), Value::from(1)),
            (Value::from(2), Value::from("b")),
        ]);
        assert_eq!(
            run(&**f.func(), &value),
            vec![
                RunTypeError::new(vec![1.into(), 0.into()], "string"),
                RunTypeError::new(vec![1.into(), 1.into()], "number"),
            ]
        );
    }
}
