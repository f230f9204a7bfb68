use super::{IsType, never_error, object_plan, positional_plan};
use crate::error::{EncodeError, JitResult};
use crate::jit::{Composer, Fragment, JitFnId, Operation, Slot};
use crate::schema::{NodeId, NodeKind, SkipFlags};
use crate::value::Value;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

pub type EncodeFn = dyn Fn(&Value) -> Result<JsonValue, EncodeError> + Send + Sync;

/// `encode(value) -> transport value`
///
/// Objects keep only declared keys. Unions encode as `[variantIndex, value]`,
/// sets as arrays, maps as arrays of `[key, value]` pairs.
pub struct Encode;

fn encode_with(f: &Option<Arc<EncodeFn>>, v: &Value) -> Result<JsonValue, EncodeError> {
    match f {
        Some(f) => f(v),
        None => Ok(v.to_transport()),
    }
}

fn encode_items(
    items: &[Value],
    f: &Option<Arc<EncodeFn>>,
) -> Result<Vec<JsonValue>, EncodeError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| encode_with(f, item).map_err(|e| e.at(i)))
        .collect()
}

impl Operation for Encode {
    type Func = EncodeFn;
    const ID: JitFnId = JitFnId::Encode;

    fn skips(flags: &SkipFlags) -> bool {
        flags.encode
    }

    fn neutral() -> Arc<EncodeFn> {
        Arc::new(|v| Ok(v.to_transport()))
    }

    fn late_bound(slot: Slot<EncodeFn>) -> Arc<EncodeFn> {
        Arc::new(move |v| match slot.get() {
            Some(f) => f(v),
            None => Err(EncodeError::new("compiled function", v.kind_name())),
        })
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<EncodeFn>> {
        let graph = c.graph();
        let f: Arc<EncodeFn> = match graph.kind(id) {
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |v| match v {
                    Value::Object(map) => {
                        let mut out = JsonMap::new();
                        for (key, value) in map {
                            if value.is_undefined() {
                                continue;
                            }
                            if let Some(f) = plan.lookup(key) {
                                let encoded = encode_with(f, value).map_err(|e| e.at(key.as_str()))?;
                                out.insert(key.clone(), encoded);
                            }
                        }
                        Ok(JsonValue::Object(out))
                    }
                    other => Err(EncodeError::new("object", other.kind_name())),
                })
            }
            NodeKind::Array { item } | NodeKind::Set { item } => {
                let is_set = matches!(graph.kind(id), NodeKind::Set { .. });
                let f = c.child(*item)?.into_code();
                Arc::new(move |v| match (v, is_set) {
                    (Value::Array(items), false) | (Value::Set(items), true) => {
                        Ok(JsonValue::Array(encode_items(items, &f)?))
                    }
                    (other, _) => Err(EncodeError::new(
                        if is_set { "set" } else { "array" },
                        other.kind_name(),
                    )),
                })
            }
            NodeKind::Map { key, value } => {
                let key = c.child_or_neutral(*key)?;
                let value = c.child_or_neutral(*value)?;
                Arc::new(move |v| match v {
                    Value::Map(entries) => entries
                        .iter()
                        .enumerate()
                        .map(|(i, (k, v))| {
                            let k = key(k).map_err(|e| e.at(0).at(i))?;
                            let v = value(v).map_err(|e| e.at(1).at(i))?;
                            Ok(JsonValue::Array(vec![k, v]))
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(JsonValue::Array),
                    other => Err(EncodeError::new("map", other.kind_name())),
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |v| match v {
                    Value::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| match plan.at(i) {
                            Some(f) => encode_with(f, item).map_err(|e| e.at(plan.segment(i))),
                            None => Ok(item.to_transport()),
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(JsonValue::Array),
                    other => Err(EncodeError::new("array", other.kind_name())),
                })
            }
            NodeKind::Union { variants } => {
                let mut branches = Vec::with_capacity(variants.len());
                for variant in variants {
                    let check = c.compile_other::<IsType>(*variant)?;
                    let encode = c.child_or_neutral(*variant)?;
                    branches.push((check, encode));
                }
                Arc::new(move |v| {
                    for (i, (check, encode)) in branches.iter().enumerate() {
                        if check(v) {
                            let encoded = encode(v).map_err(|e| e.at(1))?;
                            return Ok(JsonValue::Array(vec![JsonValue::from(i), encoded]));
                        }
                    }
                    Err(EncodeError::new("union", v.kind_name()))
                })
            }
            NodeKind::TupleMember { optional: true, child }
            | NodeKind::Parameter { optional: true, child, .. } => {
                let Some(f) = c.child(*child)?.into_code() else {
                    return Ok(Fragment::Empty);
                };
                Arc::new(move |v| match v {
                    Value::Undefined => Ok(JsonValue::Null),
                    v => f(v),
                })
            }
            NodeKind::Property { child, .. }
            | NodeKind::IndexSignature { child, .. }
            | NodeKind::TupleMember { child, .. }
            | NodeKind::Parameter { child, .. }
            | NodeKind::Rest { child } => return c.child(*child),
            NodeKind::Never => return Err(never_error(c)),
            _ => return Ok(Fragment::Empty),
        };
        Ok(Fragment::code(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JitContext;
    use crate::schema::SchemaBuilder;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_interface_drops_undeclared_keys() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let d = b.date();
        let at = b.property("at", d);
        let event = b.interface(vec![at]);
        let graph = b.finish().unwrap();
        let f = ctx.compile::<Encode>(&graph, event).unwrap();

        let date = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let value = Value::object([("at", Value::Date(date)), ("extra", Value::from(1))]);
        assert_eq!(
            (f.func())(&value).unwrap(),
            json!({"at": "2024-05-06T07:08:09.000Z"})
        );
    }

    #[test]
    fn test_union_wraps_with_index() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let s = b.string();
        let u = b.union(vec![n, s]);
        let graph = b.finish().unwrap();
        let f = ctx.compile::<Encode>(&graph, u).unwrap();

        assert_eq!((f.func())(&Value::from("a")).unwrap(), json!([1, "a"]));
        let err = (f.func())(&Value::Bool(true)).unwrap_err();
        assert_eq!(err.expected, "union");
    }

    #[test]
    fn test_never_is_unsupported() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let never = b.never();
        let graph = b.finish().unwrap();
        let err = ctx.compile::<Encode>(&graph, never).unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().starts_with("never json encode is not supported"));
    }
}
