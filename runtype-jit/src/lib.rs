//! Runtime type compiler.
//!
//! Describes data shapes as a schema graph and compiles each
//! `(shape, operation)` pair once into a tree of closures: validation,
//! error reporting, JSON transport encode/decode/stringify, strict-mode
//! unknown-key handling and random mocks.
//!
//! ```ignore
//! let mut b = SchemaBuilder::new();
//! let s = b.string();
//! let name = b.property("name", s);
//! let user = b.interface(vec![name]);
//! let graph = Arc::new(b.finish()?);
//!
//! let ctx = JitContext::default();
//! let user = RunType::new(graph, user)?.jit_functions(&ctx)?;
//! assert!(user.is_type(&Value::object([("name", Value::from("Ada"))])));
//! ```

mod config;
mod error;
pub mod jit;
mod mock;
mod path;
mod registry;
mod runtype;
pub mod schema;
mod value;

#[cfg(test)]
mod tests;

pub use config::{CompositionPolicy, DEFAULT_MAX_STACK_DEPTH, JitConfig, MockOptions};
pub use error::{DecodeError, EncodeError, JitError, JitResult};
pub use jit::{CodeUnit, JitFnId, Operation};
pub use mock::{mock, mock_with_rng};
pub use path::{
    ErrorCollector, ErrorPath, KeyCollector, PathSegment, PathWalker, RunTypeError, display_path,
};
pub use registry::{CompiledFunction, JitContext, JitRegistry, RegistryStats};
pub use runtype::{FunctionRunType, JitFunctions, RunType};
pub use schema::{
    CompositionStrategy, Family, IndexKey, LiteralValue, NodeId, NodeKind, SchemaBuilder,
    SchemaGraph, SchemaNode,
};
pub use value::{RegExpValue, Value};
