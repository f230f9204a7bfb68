//! One visitor per operation.
//!
//! Every visitor is a `match` over [`NodeKind`](crate::schema::NodeKind).
//! Member nodes produce the callable for their element; the enclosing
//! collection decides how elements are reached (by name, by position, for
//! every key accepted by an index signature, or for every remaining element
//! after a rest member). The plans below collect that layout once per
//! collection.

mod decode;
mod encode;
mod is_type;
mod stringify;
mod type_errors;
mod unknown_keys;

pub use decode::{Decode, DecodeFn};
pub use encode::{Encode, EncodeFn};
pub use is_type::{IsType, IsTypeFn};
pub use stringify::{Stringify, StringifyFn};
pub use type_errors::{TypeErrors, TypeErrorsFn};
pub use unknown_keys::{
    GetUnknownKeys, GetUnknownKeysFn, HasUnknownKeys, HasUnknownKeysFn, MutateFn,
    StripUnknownKeys, UnknownKeysToUndefined,
};

use super::{Composer, Operation};
use crate::error::{JitError, JitResult};
use crate::path::PathSegment;
use crate::schema::{IndexKey, NodeId, NodeKind};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Stand-in for a missing property or element.
pub(crate) static UNDEFINED: Value = Value::Undefined;

/// Layout of an interface: named properties and index signatures.
pub(crate) struct ObjectPlan<F: ?Sized> {
    pub properties: IndexMap<String, Option<Arc<F>>>,
    pub indexes: Vec<(IndexKey, Option<Arc<F>>)>,
    /// Required properties whose type admits `undefined`. The transport
    /// form drops undefined values, so decoding restores these keys.
    pub implicit_undefined: Vec<String>,
}

impl<F: ?Sized> ObjectPlan<F> {
    /// Index signature that accepts `key`, if any.
    pub fn index_for(&self, key: &str) -> Option<&Option<Arc<F>>> {
        self.indexes
            .iter()
            .find(|(index, _)| index.accepts(key))
            .map(|(_, f)| f)
    }

    /// Callable for the value under `key`: `Some(None)` for a declared key
    /// that needs no work, `None` for an undeclared key.
    pub fn lookup(&self, key: &str) -> Option<&Option<Arc<F>>> {
        self.properties.get(key).or_else(|| self.index_for(key))
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }
}

pub(crate) fn object_plan<O: Operation>(
    c: &mut Composer<'_, O>,
    members: &[NodeId],
) -> JitResult<ObjectPlan<O::Func>> {
    let graph = c.graph();
    let mut plan = ObjectPlan {
        properties: IndexMap::new(),
        indexes: Vec::new(),
        implicit_undefined: Vec::new(),
    };
    for member in members {
        match graph.kind(*member) {
            NodeKind::Property { name, optional, child } => {
                if !optional && graph.accepts_undefined(*child) {
                    plan.implicit_undefined.push(name.clone());
                }
                let f = c.child(*member)?.into_code();
                plan.properties.insert(name.clone(), f);
            }
            NodeKind::IndexSignature { key, .. } => {
                let f = c.child(*member)?.into_code();
                plan.indexes.push((*key, f));
            }
            _ => {}
        }
    }
    Ok(plan)
}

/// Layout of a tuple or parameter list.
pub(crate) struct PositionalPlan<F: ?Sized> {
    pub items: Vec<(PathSegment, Option<Arc<F>>)>,
    pub rest: Option<Option<Arc<F>>>,
}

impl<F: ?Sized> PositionalPlan<F> {
    /// Whether a list of `len` elements fits the declared positions.
    pub fn accepts_len(&self, len: usize) -> bool {
        self.rest.is_some() || len <= self.items.len()
    }

    /// Path segment of the element at `index`.
    pub fn segment(&self, index: usize) -> PathSegment {
        self.items
            .get(index)
            .map_or(PathSegment::Index(index), |(segment, _)| segment.clone())
    }

    /// Callable for the element at `index`, `None` past the last position.
    pub fn at(&self, index: usize) -> Option<&Option<Arc<F>>> {
        self.items
            .get(index)
            .map(|(_, f)| f)
            .or(self.rest.as_ref())
    }
}

pub(crate) fn positional_plan<O: Operation>(
    c: &mut Composer<'_, O>,
    members: &[NodeId],
) -> JitResult<PositionalPlan<O::Func>> {
    let graph = c.graph();
    let mut plan = PositionalPlan {
        items: Vec::new(),
        rest: None,
    };
    for (i, member) in members.iter().enumerate() {
        match graph.kind(*member) {
            NodeKind::Rest { .. } => plan.rest = Some(c.child(*member)?.into_code()),
            NodeKind::Parameter { name, .. } => {
                let f = c.child(*member)?.into_code();
                plan.items.push((PathSegment::Key(name.clone()), f));
            }
            _ => {
                let f = c.child(*member)?.into_code();
                plan.items.push((PathSegment::Index(i), f));
            }
        }
    }
    Ok(plan)
}

/// Error for `never` under a codec operation.
pub(crate) fn never_error<O: Operation>(c: &Composer<'_, O>) -> JitError {
    JitError::UnsupportedOperation {
        name: "never".to_string(),
        operation: O::ID.description(),
        hint: format!("never type has no values (at {})", c.static_path()),
    }
}
