use super::{never_error, object_plan, positional_plan};
use crate::error::{DecodeError, JitResult};
use crate::jit::{Composer, Fragment, JitFnId, Operation, Slot};
use crate::schema::{NodeId, NodeKind, SkipFlags};
use crate::value::{
    RegExpValue, Value, bigint_from_transport, date_from_transport, symbol_from_transport,
    transport_kind_name,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub type DecodeFn = dyn Fn(&JsonValue) -> Result<Value, DecodeError> + Send + Sync;

/// `decode(transport value) -> value`
///
/// The inverse of [`Encode`](super::Encode). Undeclared object keys in the
/// input are ignored. A missing required property whose type admits
/// `undefined` decodes as present and undefined. Decoding does not validate: run `typeErrors` on the
/// result.
pub struct Decode;

fn decode_with(f: &Option<Arc<DecodeFn>>, json: &JsonValue) -> Result<Value, DecodeError> {
    match f {
        Some(f) => f(json),
        None => Ok(Value::from_transport(json)),
    }
}

fn decode_items(items: &[JsonValue], f: &Option<Arc<DecodeFn>>) -> Result<Vec<Value>, DecodeError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_with(f, item).map_err(|e| e.at(i)))
        .collect()
}

fn mismatch(expected: &str, json: &JsonValue) -> DecodeError {
    DecodeError::new(expected, transport_kind_name(json))
}

fn string_decoder(
    expected: &'static str,
    parse: impl Fn(&str) -> Option<Value> + Send + Sync + 'static,
) -> Arc<DecodeFn> {
    Arc::new(move |json| match json {
        JsonValue::String(s) => parse(s).ok_or_else(|| mismatch(expected, json)),
        _ => Err(mismatch(expected, json)),
    })
}

impl Operation for Decode {
    type Func = DecodeFn;
    const ID: JitFnId = JitFnId::Decode;

    fn skips(flags: &SkipFlags) -> bool {
        flags.decode
    }

    fn neutral() -> Arc<DecodeFn> {
        Arc::new(|json| Ok(Value::from_transport(json)))
    }

    fn late_bound(slot: Slot<DecodeFn>) -> Arc<DecodeFn> {
        Arc::new(move |json| match slot.get() {
            Some(f) => f(json),
            None => Err(mismatch("compiled function", json)),
        })
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<DecodeFn>> {
        let graph = c.graph();
        let f: Arc<DecodeFn> = match graph.kind(id) {
            NodeKind::Undefined | NodeKind::Void => Arc::new(|_| Ok(Value::Undefined)),
            NodeKind::BigInt => Arc::new(|json| {
                bigint_from_transport(json)
                    .map(Value::BigInt)
                    .ok_or_else(|| mismatch("bigint", json))
            }),
            NodeKind::Symbol => string_decoder("symbol", |s| symbol_from_transport(s).map(Value::Symbol)),
            NodeKind::Date => string_decoder("date", |s| date_from_transport(s).map(Value::Date)),
            NodeKind::RegExp => string_decoder("regexp", |s| RegExpValue::parse(s).map(Value::RegExp)),
            NodeKind::Literal(lit) if !lit.is_json_native() => {
                let value = lit.to_value();
                Arc::new(move |_| Ok(value.clone()))
            }
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |json| match json {
                    JsonValue::Object(map) => {
                        let mut out = IndexMap::with_capacity(map.len());
                        for (key, value) in map {
                            if let Some(f) = plan.lookup(key) {
                                let decoded = decode_with(f, value).map_err(|e| e.at(key.as_str()))?;
                                out.insert(key.clone(), decoded);
                            }
                        }
                        for key in &plan.implicit_undefined {
                            if !out.contains_key(key) {
                                out.insert(key.clone(), Value::Undefined);
                            }
                        }
                        Ok(Value::Object(out))
                    }
                    _ => Err(mismatch("object", json)),
                })
            }
            NodeKind::Array { item } => {
                let f = c.child(*item)?.into_code();
                Arc::new(move |json| match json {
                    JsonValue::Array(items) => Ok(Value::Array(decode_items(items, &f)?)),
                    _ => Err(mismatch("array", json)),
                })
            }
            NodeKind::Set { item } => {
                let f = c.child(*item)?.into_code();
                Arc::new(move |json| match json {
                    JsonValue::Array(items) => Ok(Value::Set(decode_items(items, &f)?)),
                    _ => Err(mismatch("set", json)),
                })
            }
            NodeKind::Map { key, value } => {
                let key = c.child_or_neutral(*key)?;
                let value = c.child_or_neutral(*value)?;
                Arc::new(move |json| match json {
                    JsonValue::Array(entries) => entries
                        .iter()
                        .enumerate()
                        .map(|(i, entry)| match entry.as_array().map(Vec::as_slice) {
                            Some([k, v]) => {
                                let k = key(k).map_err(|e| e.at(0).at(i))?;
                                let v = value(v).map_err(|e| e.at(1).at(i))?;
                                Ok((k, v))
                            }
                            _ => Err(mismatch("map entry", entry).at(i)),
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Map),
                    _ => Err(mismatch("map", json)),
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |json| match json {
                    JsonValue::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| match plan.at(i) {
                            Some(f) => decode_with(f, item).map_err(|e| e.at(plan.segment(i))),
                            None => Ok(Value::from_transport(item)),
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Array),
                    _ => Err(mismatch("array", json)),
                })
            }
            NodeKind::Union { variants } => {
                let mut branches = Vec::with_capacity(variants.len());
                for variant in variants {
                    branches.push(c.child_or_neutral(*variant)?);
                }
                Arc::new(move |json| {
                    let pair = json.as_array().map(Vec::as_slice);
                    let Some([JsonValue::Number(index), value]) = pair else {
                        return Err(mismatch("union", json));
                    };
                    let branch = index
                        .as_u64()
                        .and_then(|i| branches.get(usize::try_from(i).ok()?));
                    match branch {
                        Some(decode) => decode(value).map_err(|e| e.at(1)),
                        None => Err(DecodeError::new("union variant index", index.to_string()).at(0)),
                    }
                })
            }
            NodeKind::TupleMember { optional: true, child }
            | NodeKind::Parameter { optional: true, child, .. } => {
                let f = c.child(*child)?.into_code();
                Arc::new(move |json| match json {
                    JsonValue::Null => Ok(Value::Undefined),
                    json => decode_with(&f, json),
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
