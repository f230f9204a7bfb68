//! Compiled-function registry and compiler context.
//!
//! [`JitContext`] is the one object an application owns to compile schemas:
//! it carries the [`JitConfig`] and the [`JitRegistry`]. There is no global
//! state; tests create a fresh context or call [`JitContext::reset`].
//!
//! The registry maps `(fingerprint, operation)` to a compiled function.
//! Because fingerprints ignore type names, structurally identical schemas
//! share their compiled functions.

use crate::config::JitConfig;
use crate::error::JitResult;
use crate::jit::{Composer, JitFnId, Operation};
use crate::schema::{NodeId, SchemaGraph};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{trace, warn};

/// A ready-to-call function for one `(fingerprint, operation)` pair.
///
/// Immutable once published.
pub struct CompiledFunction<O: Operation> {
    fingerprint: String,
    func: Arc<O::Func>,
    dependencies: Vec<String>,
    _op: PhantomData<fn() -> O>,
}

impl<O: Operation> CompiledFunction<O> {
    pub(crate) fn new(fingerprint: String, func: Arc<O::Func>, dependencies: Vec<String>) -> Self {
        Self {
            fingerprint,
            func,
            dependencies,
            _op: PhantomData,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn id(&self) -> JitFnId {
        O::ID
    }

    pub fn func(&self) -> &Arc<O::Func> {
        &self.func
    }

    pub fn arg_names(&self) -> &'static [&'static str] {
        O::ID.arg_names()
    }

    /// Fingerprints of the registry functions this one calls.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl<O: Operation> fmt::Debug for CompiledFunction<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("fingerprint", &self.fingerprint)
            .field("id", &O::ID)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    fingerprint: String,
    id: JitFnId,
}

/// Entry counts, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub by_operation: BTreeMap<JitFnId, usize>,
}

/// Concurrent cache of compiled functions.
#[derive(Default)]
pub struct JitRegistry {
    functions: DashMap<RegistryKey, Arc<dyn Any + Send + Sync>>,
}

impl JitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<O: Operation>(&self, fingerprint: &str) -> Option<Arc<CompiledFunction<O>>> {
        let key = RegistryKey {
            fingerprint: fingerprint.to_string(),
            id: O::ID,
        };
        let entry = self.functions.get(&key)?;
        Arc::clone(entry.value()).downcast::<CompiledFunction<O>>().ok()
    }

    pub fn contains(&self, fingerprint: &str, id: JitFnId) -> bool {
        self.functions.contains_key(&RegistryKey {
            fingerprint: fingerprint.to_string(),
            id,
        })
    }

    /// Inserts a function unless one is already registered for the same key,
    /// and returns the registered one.
    pub(crate) fn publish<O: Operation>(&self, function: CompiledFunction<O>) -> Arc<CompiledFunction<O>> {
        let key = RegistryKey {
            fingerprint: function.fingerprint.clone(),
            id: O::ID,
        };
        let function = Arc::new(function);
        match self.functions.entry(key) {
            Entry::Occupied(existing) => {
                warn!(
                    op = %O::ID,
                    fingerprint = %function.fingerprint,
                    "Function was compiled concurrently, keeping the first one"
                );
                Arc::clone(existing.get())
                    .downcast::<CompiledFunction<O>>()
                    .unwrap_or(function)
            }
            Entry::Vacant(slot) => {
                trace!(op = %O::ID, fingerprint = %function.fingerprint, "Function registered");
                slot.insert(Arc::clone(&function) as Arc<dyn Any + Send + Sync>);
                function
            }
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn clear(&self) {
        self.functions.clear();
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.functions.iter() {
            stats.total += 1;
            *stats.by_operation.entry(entry.key().id).or_default() += 1;
        }
        stats
    }
}

impl fmt::Debug for JitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitRegistry")
            .field("len", &self.functions.len())
            .finish()
    }
}

/// Explicit compiler context: configuration plus registry.
#[derive(Debug, Default)]
pub struct JitContext {
    config: JitConfig,
    registry: JitRegistry,
}

impl JitContext {
    pub fn new(config: JitConfig) -> Self {
        Self {
            config,
            registry: JitRegistry::new(),
        }
    }

    pub fn config(&self) -> &JitConfig {
        &self.config
    }

    pub fn registry(&self) -> &JitRegistry {
        &self.registry
    }

    /// Gets or compiles the function for `root` and operation `O`.
    #[tracing::instrument(skip(self, graph), fields(op = %O::ID))]
    pub fn compile<O: Operation>(
        &self,
        graph: &SchemaGraph,
        root: NodeId,
    ) -> JitResult<Arc<CompiledFunction<O>>> {
        Composer::<O>::compile(self, graph, root)
    }

    /// Drops every compiled function.
    pub fn reset(&self) {
        self.registry.clear();
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jit::ops::IsType;
    use crate::schema::SchemaBuilder;
    use crate::value::Value;

    #[test]
    fn test_publish_keeps_first() {
        let registry = JitRegistry::new();
        let first = registry.publish(CompiledFunction::<IsType>::new(
            "number".to_string(),
            Arc::new(|_: &Value| true),
            Vec::new(),
        ));
        let second = registry.publish(CompiledFunction::<IsType>::new(
            "number".to_string(),
            Arc::new(|_: &Value| false),
            Vec::new(),
        ));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_compile_once() {
        let ctx = JitContext::default();
        let mut b = SchemaBuilder::new();
        let n = b.number();
        let graph = b.finish().unwrap();

        let a = ctx.compile::<IsType>(&graph, n).unwrap();
        let b = ctx.compile::<IsType>(&graph, n).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.arg_names(), &["value"]);
        assert!(ctx.registry().contains("number", JitFnId::IsType));

        let stats = ctx.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_operation.get(&JitFnId::IsType), Some(&1));

        ctx.reset();
        assert!(ctx.registry().is_empty());
    }
}
