//! Strategies for random schemas and random values.

use crate::schema::{IndexKey, LiteralValue, NodeId, NodeKind, SchemaBuilder, SchemaGraph};
use crate::value::{RegExpValue, Value};
use chrono::{DateTime, Utc};
use proptest::prelude::*;
use std::sync::Arc;

/// Schema description that proptest can generate and shrink.
#[derive(Debug, Clone)]
pub enum Shape {
    Null,
    Undefined,
    Void,
    Any,
    Unknown,
    Object,
    Boolean,
    Number,
    String,
    BigInt,
    Date,
    RegExp,
    Symbol,
    Literal(String),
    RegExpLiteral(String, String),
    /// `(optional, property type)`, named `p0`, `p1`, ...
    Interface(Vec<(bool, Shape)>),
    Dict(IndexKey, Box<Shape>),
    Array(Box<Shape>),
    Set(Box<Shape>),
    Map(Box<Shape>, Box<Shape>),
    /// Required members, optional members, then an optional rest member.
    Tuple(Vec<Shape>, Vec<Shape>, Option<Box<Shape>>),
    /// Required then optional parameters, named `p0`, `p1`, ...
    Params(Vec<Shape>, Vec<Shape>),
    /// Distinct atomic variants.
    Union(Vec<Shape>),
    Recursive(Recursion, Box<Shape>),
}

/// How a recursive shape refers back to itself.
#[derive(Debug, Clone, Copy)]
pub enum Recursion {
    /// `Node = {value: T, next?: Node}`
    List,
    /// `Node = {value: T, children: Node[]}`
    Tree,
    /// `A = {value: T, b: B}`, `B = {a?: A}`
    Mutual,
}

/// How a shape is laid out in the builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layout<'a> {
    /// Names every node with this prefix.
    pub names: Option<&'a str>,
    /// Declares children in reverse order.
    pub reversed: bool,
}

impl<'a> Layout<'a> {
    pub fn named(prefix: &'a str) -> Self {
        Self {
            names: Some(prefix),
            reversed: false,
        }
    }

    pub fn reversed() -> Self {
        Self {
            names: None,
            reversed: true,
        }
    }
}

/// Builds `shapes` in layout order and returns their ids in shape order.
fn build_all(b: &mut SchemaBuilder, shapes: &[Shape], layout: Layout<'_>) -> Vec<NodeId> {
    if layout.reversed {
        let mut ids: Vec<_> = shapes.iter().rev().map(|s| build(b, s, layout)).collect();
        ids.reverse();
        ids
    } else {
        shapes.iter().map(|s| build(b, s, layout)).collect()
    }
}

fn build_recursive(b: &mut SchemaBuilder, recursion: Recursion, item: &Shape, layout: Layout<'_>) -> NodeId {
    let declare_pair = |b: &mut SchemaBuilder| {
        if layout.reversed {
            let second = b.declare();
            (b.declare(), second)
        } else {
            let first = b.declare();
            (first, b.declare())
        }
    };
    match recursion {
        Recursion::List | Recursion::Tree => {
            let node = b.declare();
            let child = build(b, item, layout);
            let value = b.property("value", child);
            let link = match recursion {
                Recursion::List => b.optional_property("next", node),
                _ => {
                    let children = b.array(node);
                    b.property("children", children)
                }
            };
            b.define(node, NodeKind::Interface { members: vec![value, link] })
        }
        Recursion::Mutual => {
            let (a, other) = declare_pair(b);
            let child = build(b, item, layout);
            let value = b.property("value", child);
            let to_other = b.property("b", other);
            let back = b.optional_property("a", a);
            b.define(other, NodeKind::Interface { members: vec![back] });
            b.define(a, NodeKind::Interface { members: vec![value, to_other] })
        }
    }
}

/// Builds `shape` into `b`.
pub fn build(b: &mut SchemaBuilder, shape: &Shape, layout: Layout<'_>) -> NodeId {
    let id = match shape {
        Shape::Null => b.null(),
        Shape::Undefined => b.undefined(),
        Shape::Void => b.void(),
        Shape::Any => b.any(),
        Shape::Unknown => b.unknown(),
        Shape::Object => b.object(),
        Shape::Boolean => b.boolean(),
        Shape::Number => b.number(),
        Shape::String => b.string(),
        Shape::BigInt => b.bigint(),
        Shape::Date => b.date(),
        Shape::RegExp => b.regexp(),
        Shape::Symbol => b.symbol(),
        Shape::Literal(s) => b.literal(LiteralValue::String(s.clone())),
        Shape::RegExpLiteral(source, flags) => {
            b.literal(LiteralValue::RegExp(RegExpValue::new(source.as_str(), flags.as_str())))
        }
        Shape::Interface(props) => {
            let types: Vec<_> = props.iter().map(|(_, s)| s.clone()).collect();
            let children = build_all(b, &types, layout);
            let members = props
                .iter()
                .zip(children)
                .enumerate()
                .map(|(i, ((optional, _), child))| {
                    let name = format!("p{}", i);
                    if *optional {
                        b.optional_property(&name, child)
                    } else {
                        b.property(&name, child)
                    }
                })
                .collect();
            b.interface(members)
        }
        Shape::Dict(key, item) => {
            let child = build(b, item, layout);
            let index = b.index_signature(*key, child);
            b.interface(vec![index])
        }
        Shape::Array(item) => {
            let child = build(b, item, layout);
            b.array(child)
        }
        Shape::Set(item) => {
            let child = build(b, item, layout);
            b.set(child)
        }
        Shape::Map(key, value) => {
            let ids = build_all(b, &[(**key).clone(), (**value).clone()], layout);
            b.map(ids[0], ids[1])
        }
        Shape::Tuple(required, optional, rest) => {
            let mut members = Vec::new();
            for child in build_all(b, required, layout) {
                members.push(b.tuple_member(child));
            }
            for child in build_all(b, optional, layout) {
                members.push(b.optional_tuple_member(child));
            }
            if let Some(rest) = rest {
                let child = build(b, rest, layout);
                members.push(b.rest(child));
            }
            b.tuple(members)
        }
        Shape::Params(required, optional) => {
            let mut params = Vec::new();
            for (i, child) in build_all(b, required, layout).into_iter().enumerate() {
                params.push(b.parameter(&format!("p{}", i), child));
            }
            let offset = required.len();
            for (i, child) in build_all(b, optional, layout).into_iter().enumerate() {
                params.push(b.optional_parameter(&format!("p{}", offset + i), child));
            }
            b.params(params)
        }
        Shape::Union(variants) => {
            let variants = build_all(b, variants, layout);
            b.union(variants)
        }
        Shape::Recursive(recursion, item) => build_recursive(b, *recursion, item, layout),
    };
    if let Some(prefix) = layout.names {
        b.name(id, format!("{}{}", prefix, id));
    }
    id
}

pub fn finish(shape: &Shape, layout: Layout<'_>) -> (Arc<SchemaGraph>, NodeId) {
    let mut b = SchemaBuilder::new();
    let root = build(&mut b, shape, layout);
    let graph = b.finish().expect("generated schemas are valid");
    (Arc::new(graph), root)
}

fn atomic() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Null),
        Just(Shape::Undefined),
        Just(Shape::Void),
        Just(Shape::Any),
        Just(Shape::Unknown),
        Just(Shape::Object),
        Just(Shape::Boolean),
        Just(Shape::Number),
        Just(Shape::String),
        Just(Shape::BigInt),
        Just(Shape::Date),
        Just(Shape::RegExp),
        Just(Shape::Symbol),
        "[a-z]{1,5}".prop_map(Shape::Literal),
        ("[a-z/]{1,4}", "[gimsuy]{0,2}")
            .prop_map(|(source, flags)| Shape::RegExpLiteral(source, flags)),
    ]
}

fn union_variants() -> impl Strategy<Value = Vec<Shape>> {
    prop::sample::subsequence(
        vec![
            Shape::Null,
            Shape::Undefined,
            Shape::Boolean,
            Shape::Number,
            Shape::String,
            Shape::BigInt,
            Shape::Date,
        ],
        1..4,
    )
}

/// An omitted optional position is sent as `null`, so members that may
/// themselves hold `null` are left out.
fn optional_positions(shapes: Vec<Shape>) -> Vec<Shape> {
    shapes
        .into_iter()
        .filter(|s| !matches!(s, Shape::Null | Shape::Any | Shape::Unknown))
        .collect()
}

fn recursion() -> impl Strategy<Value = Recursion> {
    prop_oneof![
        Just(Recursion::List),
        Just(Recursion::Tree),
        Just(Recursion::Mutual),
    ]
}

fn index_key() -> impl Strategy<Value = IndexKey> {
    prop_oneof![Just(IndexKey::String), Just(IndexKey::Number)]
}

fn nested() -> impl Strategy<Value = Shape> {
    atomic().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec((any::<bool>(), inner.clone()), 0..4).prop_map(Shape::Interface),
            (index_key(), inner.clone()).prop_map(|(key, s)| Shape::Dict(key, Box::new(s))),
            inner.clone().prop_map(|s| Shape::Array(Box::new(s))),
            inner.clone().prop_map(|s| Shape::Set(Box::new(s))),
            (inner.clone(), inner.clone())
                .prop_map(|(k, v)| Shape::Map(Box::new(k), Box::new(v))),
            (
                prop::collection::vec(inner.clone(), 0..3),
                prop::collection::vec(inner.clone(), 0..2),
                prop::option::of(inner.clone()),
            )
                .prop_map(|(required, optional, rest)| {
                    Shape::Tuple(required, optional_positions(optional), rest.map(Box::new))
                }),
            union_variants().prop_map(Shape::Union),
            (recursion(), inner).prop_map(|(r, s)| Shape::Recursive(r, Box::new(s))),
        ]
    })
}

/// Any schema, including parameter lists at the root.
pub fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        9 => nested(),
        1 => (
            prop::collection::vec(nested(), 0..3),
            prop::collection::vec(nested(), 0..2),
        )
            .prop_map(|(required, optional)| Shape::Params(required, optional_positions(optional))),
    ]
}

/// Arbitrary values, most of which match no particular schema.
pub fn value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1e6f64..1e6).prop_map(Value::Number),
        Just(Value::Number(f64::NAN)),
        "[a-z]{0,5}".prop_map(Value::String),
        (0i128..1000).prop_map(Value::BigInt),
        (0i64..4_102_444_800_000).prop_map(|ms| {
            Value::Date(DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default())
        }),
        Just(Value::regexp("a/", "g")),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Set),
            prop::collection::vec((inner.clone(), inner.clone()), 0..3).prop_map(Value::Map),
            prop::collection::vec(("p[0-3]|key[0-2]|[0-2]|value|next|children|a|b|x", inner), 0..4)
                .prop_map(|entries| Value::object(entries)),
        ]
    })
}
