//! Random sample values for a schema.
//!
//! Every generated value satisfies `isType` for the schema it was generated
//! from. Recursive schemas terminate because optional members are always
//! omitted and open-ended collections are generated empty once the nesting
//! passes [`MockOptions::max_depth`].

use crate::config::MockOptions;
use crate::error::{JitError, JitResult};
use crate::schema::{Family, IndexKey, NodeId, NodeKind, SchemaGraph, static_path};
use crate::value::Value;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand_core::{OsRng, RngCore};
use tracing::trace;

const NUMBER_RANGE: f64 = 1e6;
const BIGINT_RANGE: u64 = 1_000_000;
const MAX_STRING_LEN: usize = 12;
const MAX_INDEX_ENTRIES: usize = 10;
/// 2100-01-01T00:00:00Z
const MAX_DATE_MILLIS: u64 = 4_102_444_800_000;
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a value for `root` using the operating system's random source.
pub fn mock(graph: &SchemaGraph, root: NodeId, options: &MockOptions) -> JitResult<Value> {
    mock_with_rng(graph, root, options, &mut OsRng)
}

/// Generates a value for `root` drawing from `rng`.
pub fn mock_with_rng(
    graph: &SchemaGraph,
    root: NodeId,
    options: &MockOptions,
    rng: &mut dyn RngCore,
) -> JitResult<Value> {
    options.validate()?;
    if !graph.contains(root) {
        return Err(JitError::UndefinedNode(root));
    }
    match graph.kind(root).family() {
        Family::Function => {
            return Err(JitError::UnsupportedOperation {
                name: graph.type_signature(root),
                operation: "mock",
                hint: "instead mock parameters or return type separately".to_string(),
            });
        }
        Family::Member => {
            return Err(JitError::InvalidSchema {
                node: root,
                reason: "a member cannot be mocked on its own".to_string(),
            });
        }
        _ => {}
    }
    trace!(fingerprint = graph.fingerprint(root), "Mocking");
    Mocker {
        graph,
        options,
        rng,
        stack: Vec::new(),
        depth: 0,
    }
    .value(root)
}

struct Mocker<'a> {
    graph: &'a SchemaGraph,
    options: &'a MockOptions,
    rng: &'a mut dyn RngCore,
    stack: Vec<NodeId>,
    /// Collections entered on the current path.
    depth: usize,
}

impl Mocker<'_> {
    fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.rng.next_u64() % n as u64) as usize
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn exhausted(&self) -> bool {
        self.depth >= self.options.max_depth
    }

    fn omit_optional(&mut self) -> bool {
        self.exhausted() || self.unit() < self.options.optional_probability
    }

    /// Length of an open-ended collection.
    fn collection_len(&mut self, max: usize) -> usize {
        if self.exhausted() { 0 } else { self.below(max) }
    }

    fn alphanumeric(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| ALPHANUMERIC[self.below(ALPHANUMERIC.len())] as char)
            .collect()
    }

    fn value(&mut self, id: NodeId) -> JitResult<Value> {
        self.stack.push(id);
        let collection = self.graph.kind(id).family() == Family::Collection;
        if collection {
            self.depth += 1;
        }
        let result = if self.depth > self.options.max_depth * 2 {
            Err(JitError::MaxDepthExceeded {
                max: self.options.max_depth * 2,
                path: static_path(self.graph.nodes(), &self.stack),
            })
        } else {
            self.generate(id)
        };
        if collection {
            self.depth -= 1;
        }
        self.stack.pop();
        result
    }

    fn generate(&mut self, id: NodeId) -> JitResult<Value> {
        let graph = self.graph;
        let value = match graph.kind(id) {
            NodeKind::Any | NodeKind::Unknown => self.primitive(),
            NodeKind::Never => {
                return Err(JitError::UnsupportedOperation {
                    name: "never".to_string(),
                    operation: "mock",
                    hint: format!(
                        "never type has no values (at {})",
                        static_path(graph.nodes(), &self.stack)
                    ),
                });
            }
            NodeKind::Null => Value::Null,
            NodeKind::Undefined | NodeKind::Void => Value::Undefined,
            NodeKind::Boolean => Value::Bool(self.rng.next_u32() & 1 == 1),
            NodeKind::Number => self.number(),
            NodeKind::String => {
                let len = self.below(MAX_STRING_LEN);
                Value::String(self.alphanumeric(len))
            }
            NodeKind::BigInt => Value::BigInt(i128::from(self.rng.next_u64() % BIGINT_RANGE)),
            NodeKind::Symbol => {
                let len = 1 + self.below(8);
                Value::Symbol(Some(self.alphanumeric(len)))
            }
            NodeKind::Date => {
                let millis = self.rng.next_u64() % MAX_DATE_MILLIS;
                let date = i64::try_from(millis)
                    .ok()
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .unwrap_or_default();
                Value::Date(date)
            }
            NodeKind::RegExp => {
                let i = self.below(self.options.regexp_list.len());
                Value::RegExp(self.options.regexp_list[i].clone())
            }
            NodeKind::Object => Value::Object(IndexMap::new()),
            NodeKind::Literal(lit) => lit.to_value(),
            NodeKind::Interface { members } => self.interface(members)?,
            NodeKind::Array { item } => Value::Array(self.items(*item)?),
            NodeKind::Set { item } => Value::Set(self.items(*item)?),
            NodeKind::Map { key, value } => {
                let len = self.collection_len(self.options.max_collection_len);
                let mut entries = Vec::with_capacity(len);
                for _ in 0..len {
                    entries.push((self.value(*key)?, self.value(*value)?));
                }
                Value::Map(entries)
            }
            NodeKind::Tuple { members } | NodeKind::Params { params: members } => {
                self.positional(members)?
            }
            NodeKind::Union { variants } => {
                let i = self.below(variants.len());
                self.value(variants[i])?
            }
            NodeKind::Function { .. } | NodeKind::Method { .. } => {
                return Err(JitError::UnsupportedOperation {
                    name: graph.type_signature(id),
                    operation: "mock",
                    hint: "instead mock parameters or return type separately".to_string(),
                });
            }
            // members are generated by their collection
            member => match member.member_child() {
                Some(child) => self.value(child)?,
                None => Value::Undefined,
            },
        };
        Ok(value)
    }

    fn primitive(&mut self) -> Value {
        match self.below(4) {
            0 => Value::Null,
            1 => Value::Bool(self.rng.next_u32() & 1 == 1),
            2 => self.number(),
            _ => {
                let len = self.below(MAX_STRING_LEN);
                Value::String(self.alphanumeric(len))
            }
        }
    }

    fn number(&mut self) -> Value {
        Value::Number((self.unit() * 2.0 - 1.0) * NUMBER_RANGE)
    }

    fn items(&mut self, item: NodeId) -> JitResult<Vec<Value>> {
        let len = self.collection_len(self.options.max_collection_len);
        (0..len).map(|_| self.value(item)).collect()
    }

    fn interface(&mut self, members: &[NodeId]) -> JitResult<Value> {
        let graph = self.graph;
        let mut map = IndexMap::new();
        for member in members {
            self.stack.push(*member);
            let result = self.member(graph.kind(*member), &mut map);
            self.stack.pop();
            result?;
        }
        Ok(Value::Object(map))
    }

    fn member(&mut self, kind: &NodeKind, map: &mut IndexMap<String, Value>) -> JitResult<()> {
        match kind {
            NodeKind::Property { name, optional, child } => {
                if self.graph.kind(*child).family() == Family::Function {
                    return Ok(());
                }
                if *optional && self.omit_optional() {
                    return Ok(());
                }
                let value = self.value(*child)?;
                // an optional undefined property is an omitted one
                if !(*optional && value.is_undefined()) {
                    map.insert(name.clone(), value);
                }
            }
            NodeKind::IndexSignature { key, child } => {
                let len = self.collection_len(MAX_INDEX_ENTRIES.min(self.options.max_collection_len));
                for i in 0..len {
                    let name = match key {
                        IndexKey::String => format!("key{}", i),
                        IndexKey::Number => i.to_string(),
                    };
                    if map.contains_key(&name) {
                        continue;
                    }
                    let value = self.value(*child)?;
                    if !value.is_undefined() {
                        map.insert(name, value);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn positional(&mut self, members: &[NodeId]) -> JitResult<Value> {
        let graph = self.graph;
        let mut items = Vec::with_capacity(members.len());
        // index of the last element that has to stay
        let mut required_len = 0;
        for member in members {
            self.stack.push(*member);
            let result = match graph.kind(*member) {
                NodeKind::Rest { child } => {
                    let len = self.collection_len(self.options.max_collection_len);
                    let rest = (0..len).map(|_| self.value(*child)).collect::<JitResult<Vec<_>>>();
                    rest.map(|rest| {
                        items.extend(rest);
                        required_len = items.len();
                    })
                }
                kind => match kind.member_child() {
                    Some(_) if kind.is_optional() && self.omit_optional() => {
                        items.push(Value::Undefined);
                        Ok(())
                    }
                    Some(child) => self.value(child).map(|value| {
                        items.push(value);
                        required_len = items.len();
                    }),
                    None => Ok(()),
                },
            };
            self.stack.pop();
            result?;
        }
        items.truncate(required_len);
        Ok(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    /// xorshift, for reproducible draws
    struct TestRng(u64);

    impl RngCore for TestRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            rand_core::impls::fill_bytes_via_next(self, dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn test_atomic_ranges() {
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let s = b.string();
        let bi = b.bigint();
        let d = b.date();
        let graph = b.finish().unwrap();
        let options = MockOptions::default();
        let mut rng = TestRng(7);

        for _ in 0..200 {
            match mock_with_rng(&graph, n, &options, &mut rng).unwrap() {
                Value::Number(x) => assert!(x.is_finite() && x.abs() <= NUMBER_RANGE),
                other => panic!("unexpected {:?}", other),
            }
            match mock_with_rng(&graph, s, &options, &mut rng).unwrap() {
                Value::String(s) => {
                    assert!(s.len() < MAX_STRING_LEN);
                    assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
                }
                other => panic!("unexpected {:?}", other),
            }
            match mock_with_rng(&graph, bi, &options, &mut rng).unwrap() {
                Value::BigInt(n) => assert!((0..1_000_000).contains(&n)),
                other => panic!("unexpected {:?}", other),
            }
            match mock_with_rng(&graph, d, &options, &mut rng).unwrap() {
                Value::Date(d) => {
                    assert!(d.timestamp() >= 0);
                    assert!(d.timestamp_millis() < MAX_DATE_MILLIS as i64);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_optional_probability_bounds() {
        let mut b = SchemaBuilder::new();
        let s = b.string();
        let a = b.optional_property("a", s);
        let obj = b.interface(vec![a]);
        let graph = b.finish().unwrap();
        let mut rng = TestRng(3);

        let never_omit = MockOptions::default().with_optional_probability(0.0);
        let always_omit = MockOptions::default().with_optional_probability(1.0);
        for _ in 0..20 {
            let v = mock_with_rng(&graph, obj, &never_omit, &mut rng).unwrap();
            assert!(v.as_object().unwrap().contains_key("a"));
            let v = mock_with_rng(&graph, obj, &always_omit, &mut rng).unwrap();
            assert!(v.as_object().unwrap().is_empty());
        }

        let invalid = MockOptions::default().with_optional_probability(1.5);
        let err = mock_with_rng(&graph, obj, &invalid, &mut rng).unwrap_err();
        assert!(matches!(err, JitError::InvalidMockOption { option: "optional_probability", .. }));
    }

    #[test]
    fn test_recursive_schema_terminates() {
        let mut b = SchemaBuilder::new();
        let node = b.declare();
        let n = b.number();
        let value = b.property("value", n);
        let next = b.optional_property("next", node);
        b.define(node, NodeKind::Interface { members: vec![value, next] });
        let graph = b.finish().unwrap();

        let options = MockOptions::default().with_optional_probability(0.0);
        let v = mock_with_rng(&graph, node, &options, &mut TestRng(11)).unwrap();

        let mut depth = 0;
        let mut current = &v;
        while let Some(next) = current.as_object().and_then(|m| m.get("next")) {
            depth += 1;
            current = next;
        }
        assert_eq!(depth, options.max_depth - 1);
    }

    #[test]
    fn test_required_cycle_fails() {
        let mut b = SchemaBuilder::new();
        let node = b.declare();
        let next = b.property("next", node);
        b.define(node, NodeKind::Interface { members: vec![next] });
        let graph = b.finish().unwrap();

        let err = mock(&graph, node, &MockOptions::default()).unwrap_err();
        assert!(matches!(err, JitError::MaxDepthExceeded { max: 12, .. }));
    }

    #[test]
    fn test_tuple_trailing_optional_is_trimmed() {
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let s = b.string();
        let first = b.tuple_member(n);
        let second = b.optional_tuple_member(s);
        let t = b.tuple(vec![first, second]);
        let graph = b.finish().unwrap();

        let options = MockOptions::default().with_optional_probability(1.0);
        let v = mock(&graph, t, &options).unwrap();
        assert_eq!(v.as_array().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn test_never_and_function_are_unsupported() {
        let mut b = SchemaBuilder::new();
        let never = b.never();
        let params = b.params(vec![]);
        let ret = b.void();
        let func = b.function(params, ret);
        let graph = b.finish().unwrap();

        let err = mock(&graph, never, &MockOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("never mock is not supported"));
        let err = mock(&graph, func, &MockOptions::default()).unwrap_err();
        assert!(err.is_unsupported());
    }
}
