//! The compiler.
//!
//! Each [`Operation`] turns a schema node into a closure. Collections build
//! their closure out of their children's closures, so a compiled function is
//! a tree of `Arc<dyn Fn>` mirroring the schema. The [`Composer`] drives the
//! recursion: it tracks the compile stack, enforces the depth limit, drops
//! children whose skip flag is set and decides which nodes become separate
//! registry functions.
//!
//! # Circular schemas
//!
//! A circular collection is always compiled as its own function. Before its
//! body is built, a [`Slot`] is registered for its fingerprint; when the body
//! reaches the same node again it gets a closure that calls through the slot.
//! The slot is filled once the body is complete, so by the time anything can
//! call the function every late-bound call resolves.

mod composer;
mod fragment;
pub mod ops;

pub use composer::Composer;
pub use fragment::{Fragment, Slot};

use crate::error::JitResult;
use crate::schema::{NodeId, SkipFlags};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shape of the code an operation produces.
///
/// * `Expression` - returns a value and has no side effects on the call state
///   (`isType`, `encode`, `decode`, `hasUnknownKeys`).
/// * `Statement` - works through side effects on a walker or on the value
///   (`typeErrors`, `getUnknownKeys`, `stripUnknownKeys`,
///   `unknownKeysToUndefined`).
/// * `Block` - writes its output into a buffer and must always write
///   something (`stringify`).
///
/// An empty fragment reconciles to the operation's neutral callable, whose
/// shape depends on the unit: a constant or identity conversion for
/// expressions, a no-op for statements, the schema-less writer for blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeUnit {
    Expression,
    Statement,
    Block,
}

/// The closed set of compilable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitFnId {
    IsType,
    TypeErrors,
    Encode,
    Decode,
    Stringify,
    GetUnknownKeys,
    HasUnknownKeys,
    StripUnknownKeys,
    UnknownKeysToUndefined,
}

impl JitFnId {
    pub const ALL: [JitFnId; 9] = [
        Self::IsType,
        Self::TypeErrors,
        Self::Encode,
        Self::Decode,
        Self::Stringify,
        Self::GetUnknownKeys,
        Self::HasUnknownKeys,
        Self::StripUnknownKeys,
        Self::UnknownKeysToUndefined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsType => "isType",
            Self::TypeErrors => "typeErrors",
            Self::Encode => "encode",
            Self::Decode => "decode",
            Self::Stringify => "stringify",
            Self::GetUnknownKeys => "getUnknownKeys",
            Self::HasUnknownKeys => "hasUnknownKeys",
            Self::StripUnknownKeys => "stripUnknownKeys",
            Self::UnknownKeysToUndefined => "unknownKeysToUndefined",
        }
    }

    /// Wording used in "is not supported" errors.
    pub fn description(&self) -> &'static str {
        match self {
            Self::IsType | Self::TypeErrors => "validation",
            Self::Encode => "json encode",
            Self::Decode => "json decode",
            Self::Stringify => "json stringify",
            _ => "unknown keys check",
        }
    }

    pub fn code_unit(&self) -> CodeUnit {
        match self {
            Self::IsType | Self::Encode | Self::Decode | Self::HasUnknownKeys => CodeUnit::Expression,
            Self::Stringify => CodeUnit::Block,
            _ => CodeUnit::Statement,
        }
    }

    /// Formal arguments of the compiled callable.
    pub fn arg_names(&self) -> &'static [&'static str] {
        match self {
            Self::TypeErrors | Self::GetUnknownKeys => &["value", "walker"],
            Self::Stringify => &["value", "out"],
            _ => &["value"],
        }
    }
}

impl fmt::Display for JitFnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One compilable operation.
///
/// `compose` builds the closure for a single node, asking the composer for
/// its children. It is called with the node already pushed on the compile
/// stack.
pub trait Operation: Sized + 'static {
    /// The callable this operation produces.
    type Func: ?Sized + Send + Sync + 'static;

    const ID: JitFnId;

    /// Whether a node with these flags needs no work for this operation.
    fn skips(flags: &SkipFlags) -> bool;

    fn compose(c: &mut Composer<'_, Self>, id: NodeId) -> JitResult<Fragment<Self::Func>>;

    /// Callable used in place of an empty fragment.
    fn neutral() -> Arc<Self::Func>;

    /// Callable that forwards to the function that will fill `slot`.
    fn late_bound(slot: Slot<Self::Func>) -> Arc<Self::Func>;
}
