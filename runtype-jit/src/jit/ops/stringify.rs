use super::{IsType, never_error, object_plan, positional_plan};
use crate::error::{EncodeError, JitResult};
use crate::jit::{Composer, Fragment, JitFnId, Operation, Slot};
use crate::schema::{NodeId, NodeKind, SkipFlags};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub type StringifyFn = dyn Fn(&Value, &mut String) -> Result<(), EncodeError> + Send + Sync;

/// `stringify(value) -> transport string`
///
/// Writes the transport JSON directly, without building the intermediate
/// transport value. The output parses to exactly what `encode` returns.
pub struct Stringify;

fn write_with(
    f: &Option<Arc<StringifyFn>>,
    v: &Value,
    out: &mut String,
) -> Result<(), EncodeError> {
    match f {
        Some(f) => f(v, out),
        None => {
            v.write_transport(out);
            Ok(())
        }
    }
}

fn write_key(key: &str, out: &mut String) {
    out.push_str(&JsonValue::from(key).to_string());
    out.push(':');
}

fn write_items(
    items: &[Value],
    f: &Option<Arc<StringifyFn>>,
    out: &mut String,
) -> Result<(), EncodeError> {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_with(f, item, out).map_err(|e| e.at(i))?;
    }
    out.push(']');
    Ok(())
}

impl Operation for Stringify {
    type Func = StringifyFn;
    const ID: JitFnId = JitFnId::Stringify;

    fn skips(flags: &SkipFlags) -> bool {
        flags.encode
    }

    fn neutral() -> Arc<StringifyFn> {
        Arc::new(|v, out| {
            v.write_transport(out);
            Ok(())
        })
    }

    fn late_bound(slot: Slot<StringifyFn>) -> Arc<StringifyFn> {
        Arc::new(move |v, out| match slot.get() {
            Some(f) => f(v, out),
            None => Err(EncodeError::new("compiled function", v.kind_name())),
        })
    }

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<StringifyFn>> {
        let graph = c.graph();
        let f: Arc<StringifyFn> = match graph.kind(id) {
            NodeKind::Interface { members } => {
                let plan = object_plan(c, members)?;
                Arc::new(move |v, out| match v {
                    Value::Object(map) => {
                        out.push('{');
                        let mut first = true;
                        for (key, value) in map {
                            if value.is_undefined() {
                                continue;
                            }
                            let Some(f) = plan.lookup(key) else { continue };
                            if !first {
                                out.push(',');
                            }
                            first = false;
                            write_key(key, out);
                            write_with(f, value, out).map_err(|e| e.at(key.as_str()))?;
                        }
                        out.push('}');
                        Ok(())
                    }
                    other => Err(EncodeError::new("object", other.kind_name())),
                })
            }
            NodeKind::Array { item } | NodeKind::Set { item } => {
                let is_set = matches!(graph.kind(id), NodeKind::Set { .. });
                let f = c.child(*item)?.into_code();
                Arc::new(move |v, out| match (v, is_set) {
                    (Value::Array(items), false) | (Value::Set(items), true) => {
                        write_items(items, &f, out)
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
                Arc::new(move |v, out| match v {
                    Value::Map(entries) => {
                        out.push('[');
                        for (i, (k, v)) in entries.iter().enumerate() {
                            if i > 0 {
                                out.push(',');
                            }
                            out.push('[');
                            key(k, out).map_err(|e| e.at(0).at(i))?;
                            out.push(',');
                            value(v, out).map_err(|e| e.at(1).at(i))?;
                            out.push(']');
                        }
                        out.push(']');
                        Ok(())
                    }
                    other => Err(EncodeError::new("map", other.kind_name())),
                })
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                let plan = positional_plan(c, members)?;
                Arc::new(move |v, out| match v {
                    Value::Array(items) => {
                        out.push('[');
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push(',');
                            }
                            match plan.at(i) {
                                Some(f) => write_with(f, item, out).map_err(|e| e.at(plan.segment(i)))?,
                                None => item.write_transport(out),
                            }
                        }
                        out.push(']');
                        Ok(())
                    }
                    other => Err(EncodeError::new("array", other.kind_name())),
                })
            }
            NodeKind::Union { variants } => {
                let mut branches = Vec::with_capacity(variants.len());
                for variant in variants {
                    let check = c.compile_other::<IsType>(*variant)?;
                    let write = c.child_or_neutral(*variant)?;
                    branches.push((check, write));
                }
                Arc::new(move |v, out| {
                    for (i, (check, write)) in branches.iter().enumerate() {
                        if check(v) {
                            out.push('[');
                            out.push_str(&i.to_string());
                            out.push(',');
                            write(v, out).map_err(|e| e.at(1))?;
                            out.push(']');
                            return Ok(());
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
                Arc::new(move |v, out| match v {
                    Value::Undefined => {
                        out.push_str("null");
                        Ok(())
                    }
                    v => f(v, out),
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
