use super::{Fragment, Operation, Slot};
use crate::config::CompositionPolicy;
use crate::error::{JitError, JitResult};
use crate::registry::{CompiledFunction, JitContext};
use crate::schema::{CompositionStrategy, Family, NodeId, SchemaGraph, static_path};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

/// Recursive-descent driver for one operation over one schema graph.
///
/// Functions built during a compilation stay local until the whole
/// compilation succeeds; only then are they published to the registry, so a
/// failed compilation leaves no partial entries behind.
pub struct Composer<'a, O: Operation> {
    ctx: &'a JitContext,
    graph: &'a SchemaGraph,
    stack: Vec<NodeId>,
    pending: HashMap<String, Slot<O::Func>>,
    built: HashMap<String, Arc<O::Func>>,
    finished: Vec<CompiledFunction<O>>,
    /// Dependency fingerprints of each function under construction.
    frames: Vec<BTreeSet<String>>,
}

impl<'a, O: Operation> Composer<'a, O> {
    fn new(ctx: &'a JitContext, graph: &'a SchemaGraph) -> Self {
        Self {
            ctx,
            graph,
            stack: Vec::new(),
            pending: HashMap::new(),
            built: HashMap::new(),
            finished: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Gets the registered function for `root`, compiling it and any missing
    /// dependency first.
    pub(crate) fn compile(
        ctx: &'a JitContext,
        graph: &'a SchemaGraph,
        root: NodeId,
    ) -> JitResult<Arc<CompiledFunction<O>>> {
        if !graph.contains(root) {
            return Err(JitError::UndefinedNode(root));
        }
        match graph.kind(root).family() {
            Family::Function => {
                return Err(JitError::UnsupportedOperation {
                    name: graph.type_signature(root),
                    operation: O::ID.description(),
                    hint: "instead validate parameters or return type separately".to_string(),
                });
            }
            Family::Member => {
                return Err(JitError::InvalidSchema {
                    node: root,
                    reason: "a member cannot be compiled on its own".to_string(),
                });
            }
            _ => {}
        }

        let fingerprint = graph.fingerprint(root);
        if let Some(existing) = ctx.registry().get::<O>(fingerprint) {
            trace!(op = %O::ID, fingerprint, "Registry hit");
            return Ok(existing);
        }

        debug!(op = %O::ID, fingerprint, "Compiling");
        let mut composer = Self::new(ctx, graph);
        composer.function(root)?;

        let registered = composer.finished.len();
        let mut root_function = None;
        for function in composer.finished {
            let is_root = function.fingerprint() == fingerprint;
            let published = ctx.registry().publish(function);
            if is_root {
                root_function = Some(published);
            }
        }
        debug!(op = %O::ID, fingerprint, registered, "Compiled");

        root_function
            .or_else(|| ctx.registry().get::<O>(fingerprint))
            .ok_or(JitError::UndefinedNode(root))
    }

    pub fn graph(&self) -> &'a SchemaGraph {
        self.graph
    }

    pub fn context(&self) -> &'a JitContext {
        self.ctx
    }

    /// Human-readable location of the node being composed.
    pub fn static_path(&self) -> String {
        static_path(self.graph.nodes(), &self.stack)
    }

    /// Composes a child node: empty when its skip flag is set, a call to a
    /// separate function when it is compiled as a dependency, inlined
    /// otherwise.
    pub fn child(&mut self, id: NodeId) -> JitResult<Fragment<O::Func>> {
        if O::skips(&self.graph.constants(id).skip) {
            return Ok(Fragment::Empty);
        }
        if self.is_dependency(id) {
            return Ok(Fragment::Code(self.function(id)?));
        }
        self.inline(id)
    }

    /// Like [`child`](Self::child), with an empty fragment reconciled to the
    /// neutral callable.
    pub fn child_or_neutral(&mut self, id: NodeId) -> JitResult<Arc<O::Func>> {
        Ok(self.child(id)?.reconcile::<O>())
    }

    /// Compiles a node of the same graph under a different operation, as a
    /// separate registry function.
    pub fn compile_other<P: Operation>(&self, id: NodeId) -> JitResult<Arc<P::Func>> {
        let compiled = self.ctx.compile::<P>(self.graph, id)?;
        Ok(Arc::clone(compiled.func()))
    }

    fn is_dependency(&self, id: NodeId) -> bool {
        let node = self.graph.node(id);
        if node.kind.family() != Family::Collection {
            return false;
        }
        if self.graph.is_circular(id) {
            return true;
        }
        match node.strategy {
            CompositionStrategy::Dependency => true,
            CompositionStrategy::Inline => false,
            CompositionStrategy::Auto => {
                self.ctx.config().composition == CompositionPolicy::DependencyCollections
            }
        }
    }

    fn inline(&mut self, id: NodeId) -> JitResult<Fragment<O::Func>> {
        let max = self.ctx.config().max_stack_depth;
        if self.stack.len() >= max {
            self.stack.push(id);
            let path = self.static_path();
            self.stack.pop();
            return Err(JitError::MaxDepthExceeded { max, path });
        }
        self.stack.push(id);
        let result = O::compose(self, id);
        self.stack.pop();
        result
    }

    /// Resolves `id` to a separately compiled function: already registered,
    /// built earlier in this compilation, still being built (late-bound), or
    /// built now.
    fn function(&mut self, id: NodeId) -> JitResult<Arc<O::Func>> {
        let fingerprint = self.graph.fingerprint(id).to_string();

        let resolved = if let Some(existing) = self.ctx.registry().get::<O>(&fingerprint) {
            Some(Arc::clone(existing.func()))
        } else if let Some(built) = self.built.get(&fingerprint) {
            Some(Arc::clone(built))
        } else {
            self.pending
                .get(&fingerprint)
                .map(|slot| O::late_bound(slot.clone()))
        };
        if let Some(f) = resolved {
            self.record_dependency(fingerprint);
            return Ok(f);
        }

        trace!(op = %O::ID, fingerprint = %fingerprint, "Building dependency");
        let slot = Slot::new();
        self.pending.insert(fingerprint.clone(), slot.clone());
        self.frames.push(BTreeSet::new());
        let body = self.inline(id);
        let dependencies = self.frames.pop().unwrap_or_default();
        self.pending.remove(&fingerprint);
        let body = body?.reconcile::<O>();

        slot.fill(Arc::clone(&body));
        self.built.insert(fingerprint.clone(), Arc::clone(&body));
        self.finished.push(CompiledFunction::new(
            fingerprint.clone(),
            Arc::clone(&body),
            dependencies.into_iter().collect(),
        ));
        self.record_dependency(fingerprint);
        Ok(body)
    }

    fn record_dependency(&mut self, fingerprint: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(fingerprint);
        }
    }
}
