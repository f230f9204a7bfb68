//! Strict-mode object checks: find, detect, strip or blank out the keys an
//! object carries that its interface does not declare.
//!
//! A key is declared when a property names it or an index signature accepts
//! it. Every operation recurses into declared values, so nested objects are
//! checked too.

use super::{IsType, IsTypeFn, object_plan, positional_plan};
use crate::error::JitResult;
use crate::jit::{Composer, Fragment, JitFnId, Operation, Slot};
use crate::path::{KeyCollector, PathSegment};
use crate::schema::{NodeId, NodeKind, SkipFlags};
use crate::value::Value;
use std::sync::Arc;

pub type GetUnknownKeysFn = dyn Fn(&Value, &mut KeyCollector) + Send + Sync;
pub type HasUnknownKeysFn = dyn Fn(&Value) -> bool + Send + Sync;
pub type MutateFn = dyn Fn(&mut Value) + Send + Sync;

/// `getUnknownKeys(value) -> [path]`, one full path per undeclared key.
pub struct GetUnknownKeys;

/// `hasUnknownKeys(value) -> bool`
pub struct HasUnknownKeys;

/// `stripUnknownKeys(value)`, removing undeclared keys in place.
pub struct StripUnknownKeys;

/// `unknownKeysToUndefined(value)`, setting undeclared keys to `undefined`
/// in place.
pub struct UnknownKeysToUndefined;

/// Union variants paired with the predicate that selects them.
fn union_branches<O: Operation>(
    c: &mut Composer<'_, O>,
    variants: &[NodeId],
) -> JitResult<Vec<(Arc<IsTypeFn>, Arc<O::Func>)>> {
    let mut branches = Vec::with_capacity(variants.len());
    for variant in variants {
        let check = c.compile_other::<IsType>(*variant)?;
        let f = c.child_or_neutral(*variant)?;
        branches.push((check, f));
    }
    Ok(branches)
}

fn select<'b, F: ?Sized>(branches: &'b [(Arc<IsTypeFn>, Arc<F>)], v: &Value) -> Option<&'b Arc<F>> {
    branches.iter().find(|(check, _)| check(v)).map(|(_, f)| f)
}

impl Operation for GetUnknownKeys {
    type Func = GetUnknownKeysFn;
    const ID: JitFnId = JitFnId::GetUnknownKeys;

    fn skips(flags: &SkipFlags) -> bool {
        flags.unknown_keys
    }

    fn neutral() -> Arc<GetUnknownKeysFn> {
        Arc::new(|_, _| {})
    }

    fn late_bound(slot: Slot<GetUnknownKeysFn>) -> Arc<GetUnknownKeysFn> {
        Arc::new(move |v, keys| {
            if let Some(f) = slot.get() {
                f(v, keys)
            }
        })
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<GetUnknownKeysFn>> {
        let graph = c.graph();
        let f: Arc<GetUnknownKeysFn> = match graph.kind(id) {
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |v, keys| {
                    let Value::Object(map) = v else { return };
                    for (key, value) in map {
                        match plan.lookup(key) {
                            None => keys.unknown_key(key),
                            Some(Some(f)) => keys.scoped(PathSegment::Key(key.clone()), |k| f(value, k)),
                            Some(None) => {}
                        }
                    }
                })
            }
            NodeKind::Array { item } | NodeKind::Set { item } => {
                let Some(f) = c.child(*item)?.into_code() else {
                    return Ok(Fragment::Empty);
                };
                Arc::new(move |v, keys| {
                    if let Value::Array(items) | Value::Set(items) = v {
                        for (i, item) in items.iter().enumerate() {
                            keys.scoped(PathSegment::Index(i), |k| f(item, k));
                        }
                    }
                })
            }
            NodeKind::Map { key, value } => {
                let key = c.child_or_neutral(*key)?;
                let value = c.child_or_neutral(*value)?;
                Arc::new(move |v, keys| {
                    if let Value::Map(entries) = v {
                        for (i, (k, v)) in entries.iter().enumerate() {
                            keys.scoped(PathSegment::Index(i), |keys| {
                                keys.scoped(PathSegment::Index(0), |keys| key(k, keys));
                                keys.scoped(PathSegment::Index(1), |keys| value(v, keys));
                            });
                        }
                    }
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |v, keys| {
                    let Value::Array(items) = v else { return };
                    for (i, item) in items.iter().enumerate() {
                        if let Some(Some(f)) = plan.at(i) {
                            keys.scoped(plan.segment(i), |k| f(item, k));
                        }
                    }
                })
            }
            NodeKind::Union { variants } => {
                let branches = union_branches(c, variants)?;
                Arc::new(move |v, keys| {
                    if let Some(f) = select(&branches, v) {
                        f(v, keys)
                    }
                })
            }
            NodeKind::Property { child, .. }
            | NodeKind::IndexSignature { child, .. }
            | NodeKind::TupleMember { child, .. }
            | NodeKind::Parameter { child, .. }
            | NodeKind::Rest { child } => return c.child(*child),
            _ => return Ok(Fragment::Empty),
        };
        Ok(Fragment::code(f))
    }
}

impl Operation for HasUnknownKeys {
    type Func = HasUnknownKeysFn;
    const ID: JitFnId = JitFnId::HasUnknownKeys;

    fn skips(flags: &SkipFlags) -> bool {
        flags.unknown_keys
    }

    fn neutral() -> Arc<HasUnknownKeysFn> {
        Arc::new(|_| false)
    }

    fn late_bound(slot: Slot<HasUnknownKeysFn>) -> Arc<HasUnknownKeysFn> {
        Arc::new(move |v| slot.get().is_some_and(|f| f(v)))
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<HasUnknownKeysFn>> {
        let graph = c.graph();
        let f: Arc<HasUnknownKeysFn> = match graph.kind(id) {
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |v| match v {
                    Value::Object(map) => map.iter().any(|(key, value)| match plan.lookup(key) {
                        None => true,
                        Some(Some(f)) => f(value),
                        Some(None) => false,
                    }),
                    _ => false,
                })
            }
            NodeKind::Array { item } | NodeKind::Set { item } => {
                let Some(f) = c.child(*item)?.into_code() else {
                    return Ok(Fragment::Empty);
                };
                Arc::new(move |v| match v {
                    Value::Array(items) | Value::Set(items) => items.iter().any(|i| f(i)),
                    _ => false,
                })
            }
            NodeKind::Map { key, value } => {
                let key = c.child_or_neutral(*key)?;
                let value = c.child_or_neutral(*value)?;
                Arc::new(move |v| match v {
                    Value::Map(entries) => entries.iter().any(|(k, v)| key(k) || value(v)),
                    _ => false,
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |v| match v {
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .any(|(i, item)| matches!(plan.at(i), Some(Some(f)) if f(item))),
                    _ => false,
                })
            }
            NodeKind::Union { variants } => {
                let branches = union_branches(c, variants)?;
                Arc::new(move |v| select(&branches, v).is_some_and(|f| f(v)))
            }
            NodeKind::Property { child, .. }
            | NodeKind::IndexSignature { child, .. }
            | NodeKind::TupleMember { child, .. }
            | NodeKind::Parameter { child, .. }
            | NodeKind::Rest { child } => return c.child(*child),
            _ => return Ok(Fragment::Empty),
        };
        Ok(Fragment::code(f))
    }
}

#[derive(Clone, Copy)]
enum Unknown {
    Remove,
    SetUndefined,
}

/// Shared visitor of the two in-place operations.
fn compose_mutate<O: Operation<Func = MutateFn>>(
    c: &mut Composer<'_, O>,
    id: NodeId,
    mode: Unknown,
) -> JitResult<Fragment<MutateFn>> {
    let graph = c.graph();
    let f: Arc<MutateFn> = match graph.kind(id) {
        NodeKind::Interface { members } => {
            let plan = object_plan(c, members)?;
            Arc::new(move |v| {
                let Value::Object(map) = v else { return };
                match mode {
                    Unknown::Remove => map.retain(|key, _| plan.is_known(key)),
                    Unknown::SetUndefined => {
                        for (key, value) in map.iter_mut() {
                            if !plan.is_known(key) {
                                *value = Value::Undefined;
                            }
                        }
                    }
                }
                for (key, value) in map.iter_mut() {
                    if let Some(Some(f)) = plan.lookup(key) {
                        f(value)
                    }
                }
            })
        }
        NodeKind::Array { item } | NodeKind::Set { item } => {
            let Some(f) = c.child(*item)?.into_code() else {
                return Ok(Fragment::Empty);
            };
            Arc::new(move |v| {
                if let Value::Array(items) | Value::Set(items) = v {
                    items.iter_mut().for_each(|i| f(i));
                }
            })
        }
        NodeKind::Map { key, value } => {
            let key = c.child_or_neutral(*key)?;
            let value = c.child_or_neutral(*value)?;
            Arc::new(move |v| {
                if let Value::Map(entries) = v {
                    for (k, v) in entries.iter_mut() {
                        key(k);
                        value(v);
                    }
                }
            })
        }
        NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
            let plan = positional_plan(c, members)?;
            Arc::new(move |v| {
                let Value::Array(items) = v else { return };
                for (i, item) in items.iter_mut().enumerate() {
                    if let Some(Some(f)) = plan.at(i) {
                        f(item)
                    }
                }
            })
        }
        NodeKind::Union { variants } => {
            let branches = union_branches(c, variants)?;
            Arc::new(move |v| {
                if let Some(f) = select(&branches, v) {
                    f(v)
                }
            })
        }
        NodeKind::Property { child, .. }
        | NodeKind::IndexSignature { child, .. }
        | NodeKind::TupleMember { child, .. }
        | NodeKind::Parameter { child, .. }
        | NodeKind::Rest { child } => return c.child(*child),
        _ => return Ok(Fragment::Empty),
    };
    Ok(Fragment::code(f))
}

fn late_bound_mutate(slot: Slot<MutateFn>) -> Arc<MutateFn> {
    Arc::new(move |v| {
        if let Some(f) = slot.get() {
            f(v)
        }
    })
}

impl Operation for StripUnknownKeys {
    type Func = MutateFn;
    const ID: JitFnId = JitFnId::StripUnknownKeys;

    fn skips(flags: &SkipFlags) -> bool {
        flags.unknown_keys
    }

    fn neutral() -> Arc<MutateFn> {
        Arc::new(|_| {})
    }

    fn late_bound(slot: Slot<MutateFn>) -> Arc<MutateFn> {
        late_bound_mutate(slot)
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<MutateFn>> {
        compose_mutate(c, id, Unknown::Remove)
    }
}

impl Operation for UnknownKeysToUndefined {
    type Func = MutateFn;
    const ID: JitFnId = JitFnId::UnknownKeysToUndefined;

    fn skips(flags: &SkipFlags) -> bool {
        flags.unknown_keys
    }

    fn neutral() -> Arc<MutateFn> {
        Arc::new(|_| {})
    }

    fn late_bound(slot: Slot<MutateFn>) -> Arc<MutateFn> {
        late_bound_mutate(slot)
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<MutateFn>> {
        compose_mutate(c, id, Unknown::SetUndefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ErrorPath;
    use crate::registry::JitContext;
    use crate::schema::{SchemaBuilder, SchemaGraph};

    /// `{name: string, address: {city: string}, tags: {city: string}[]}`
    fn person() -> (SchemaGraph, NodeId) {
        let mut b = SchemaBuilder::new();
        let s = b.string();
        let city = b.property("city", s);
        let address = b.interface(vec![city]);
        let name = b.property("name", s);
        let address_prop = b.property("address", address);
        let list = b.array(address);
        let list_prop = b.optional_property("previous", list);
        let root = b.interface(vec![name, address_prop, list_prop]);
        (b.finish().unwrap(), root)
    }

    fn dirty() -> Value {
        Value::object([
            ("name", Value::from("Ada")),
            ("extra", Value::from(1)),
            (
                "address",
                Value::object([("city", Value::from("London")), ("zip", Value::from("N1"))]),
            ),
            (
                "previous",
                Value::array([Value::object([("city", Value::from("Paris")), ("x", Value::Null)])]),
            ),
        ])
    }

    #[test]
    fn test_get_unknown_keys() {
        let ctx = JitContext::default();
        let (graph, root) = person();
        let f = ctx.compile::<GetUnknownKeys>(&graph, root).unwrap();

        let mut keys = KeyCollector::new();
        (f.func())(&dirty(), &mut keys);
        let expected: Vec<ErrorPath> = vec![
            vec!["extra".into()],
            vec!["address".into(), "zip".into()],
            vec!["previous".into(), 0.into(), "x".into()],
        ];
        assert_eq!(keys.into_found(), expected);
    }

    #[test]
    fn test_has_unknown_keys() {
        let ctx = JitContext::default();
        let (graph, root) = person();
        let f = ctx.compile::<HasUnknownKeys>(&graph, root).unwrap();

        assert!((f.func())(&dirty()));
        let clean = Value::object([
            ("name", Value::from("Ada")),
            ("address", Value::object([("city", Value::from("London"))])),
        ]);
        assert!(!(f.func())(&clean));
    }

    #[test]
    fn test_strip_unknown_keys() {
        let ctx = JitContext::default();
        let (graph, root) = person();
        let f = ctx.compile::<StripUnknownKeys>(&graph, root).unwrap();

        let mut value = dirty();
        (f.func())(&mut value);
        assert_eq!(
            value,
            Value::object([
                ("name", Value::from("Ada")),
                ("address", Value::object([("city", Value::from("London"))])),
                ("previous", Value::array([Value::object([("city", Value::from("Paris"))])])),
            ])
        );
    }

    #[test]
    fn test_unknown_keys_to_undefined() {
        let ctx = JitContext::default();
        let (graph, root) = person();
        let f = ctx.compile::<UnknownKeysToUndefined>(&graph, root).unwrap();

        let mut value = dirty();
        (f.func())(&mut value);
        let map = value.as_object().unwrap();
        assert_eq!(map.get("extra"), Some(&Value::Undefined));
        assert_eq!(map.len(), 4);
        let address = map.get("address").and_then(Value::as_object).unwrap();
        assert_eq!(address.get("zip"), Some(&Value::Undefined));
    }

    #[test]
    fn test_atomic_roots_need_no_work() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let arr = b.array(n);
        let graph = b.finish().unwrap();
        let f = ctx.compile::<HasUnknownKeys>(&graph, arr).unwrap();
        assert!(!(f.func())(&Value::array([Value::from(1)])));
    }
}
