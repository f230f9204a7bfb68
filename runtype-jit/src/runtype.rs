//! Schema handles and their compiled operation bundles.

use crate::config::MockOptions;
use crate::error::{DecodeError, EncodeError, JitError, JitResult};
use crate::jit::Operation;
use crate::jit::ops::{
    Decode, Encode, GetUnknownKeys, HasUnknownKeys, IsType, Stringify, StripUnknownKeys,
    TypeErrors, UnknownKeysToUndefined,
};
use crate::mock::{mock, mock_with_rng};
use crate::path::{ErrorCollector, ErrorPath, KeyCollector, RunTypeError};
use crate::registry::{CompiledFunction, JitContext};
use crate::schema::{Family, NodeId, NodeKind, SchemaGraph};
use crate::value::Value;
use rand_core::RngCore;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// A compilable schema: a graph plus the node to start from.
#[derive(Debug, Clone)]
pub struct RunType {
    graph: Arc<SchemaGraph>,
    root: NodeId,
}

impl RunType {
    pub fn new(graph: Arc<SchemaGraph>, root: NodeId) -> JitResult<Self> {
        if !graph.contains(root) {
            return Err(JitError::UndefinedNode(root));
        }
        if graph.kind(root).family() == Family::Member {
            return Err(JitError::InvalidSchema {
                node: root,
                reason: "a member is not a standalone type".to_string(),
            });
        }
        Ok(Self { graph, root })
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn fingerprint(&self) -> &str {
        self.graph.fingerprint(self.root)
    }

    pub fn type_name(&self) -> String {
        self.graph.display_name(self.root)
    }

    pub fn signature(&self) -> String {
        self.graph.type_signature(self.root)
    }

    pub fn compile<O: Operation>(&self, ctx: &JitContext) -> JitResult<Arc<CompiledFunction<O>>> {
        ctx.compile::<O>(&self.graph, self.root)
    }

    /// Compiles every operation.
    pub fn jit_functions(&self, ctx: &JitContext) -> JitResult<JitFunctions> {
        Ok(JitFunctions {
            is_type: self.compile(ctx)?,
            type_errors: self.compile(ctx)?,
            encode: self.compile(ctx)?,
            decode: self.compile(ctx)?,
            stringify: self.compile(ctx)?,
            get_unknown_keys: self.compile(ctx)?,
            has_unknown_keys: self.compile(ctx)?,
            strip_unknown_keys: self.compile(ctx)?,
            unknown_keys_to_undefined: self.compile(ctx)?,
        })
    }

    pub fn mock(&self, options: &MockOptions) -> JitResult<Value> {
        mock(&self.graph, self.root, options)
    }

    pub fn mock_with_rng(&self, options: &MockOptions, rng: &mut dyn RngCore) -> JitResult<Value> {
        mock_with_rng(&self.graph, self.root, options, rng)
    }
}

/// Every compiled operation of one schema.
#[derive(Debug, Clone)]
pub struct JitFunctions {
    is_type: Arc<CompiledFunction<IsType>>,
    type_errors: Arc<CompiledFunction<TypeErrors>>,
    encode: Arc<CompiledFunction<Encode>>,
    decode: Arc<CompiledFunction<Decode>>,
    stringify: Arc<CompiledFunction<Stringify>>,
    get_unknown_keys: Arc<CompiledFunction<GetUnknownKeys>>,
    has_unknown_keys: Arc<CompiledFunction<HasUnknownKeys>>,
    strip_unknown_keys: Arc<CompiledFunction<StripUnknownKeys>>,
    unknown_keys_to_undefined: Arc<CompiledFunction<UnknownKeysToUndefined>>,
}

impl JitFunctions {
    pub fn is_type(&self, value: &Value) -> bool {
        (self.is_type.func())(value)
    }

    pub fn type_errors(&self, value: &Value) -> Vec<RunTypeError> {
        let mut errors = ErrorCollector::new();
        (self.type_errors.func())(value, &mut errors);
        errors.into_found()
    }

    pub fn encode(&self, value: &Value) -> Result<JsonValue, EncodeError> {
        (self.encode.func())(value)
    }

    pub fn decode(&self, json: &JsonValue) -> Result<Value, DecodeError> {
        (self.decode.func())(json)
    }

    pub fn stringify(&self, value: &Value) -> Result<String, EncodeError> {
        let mut out = String::new();
        (self.stringify.func())(value, &mut out)?;
        Ok(out)
    }

    /// Paths of every undeclared key, nested objects included.
    pub fn get_unknown_keys(&self, value: &Value) -> Vec<ErrorPath> {
        let mut keys = KeyCollector::new();
        (self.get_unknown_keys.func())(value, &mut keys);
        keys.into_found()
    }

    pub fn has_unknown_keys(&self, value: &Value) -> bool {
        (self.has_unknown_keys.func())(value)
    }

    pub fn strip_unknown_keys(&self, value: &mut Value) {
        (self.strip_unknown_keys.func())(value)
    }

    pub fn unknown_keys_to_undefined(&self, value: &mut Value) {
        (self.unknown_keys_to_undefined.func())(value)
    }
}

/// A function signature. Only its parameter list and its return type are
/// compilable.
#[derive(Debug, Clone)]
pub struct FunctionRunType {
    graph: Arc<SchemaGraph>,
    function: NodeId,
    params: NodeId,
    ret: NodeId,
}

impl FunctionRunType {
    /// Accepts a function node or a method wrapping one.
    pub fn new(graph: Arc<SchemaGraph>, id: NodeId) -> JitResult<Self> {
        if !graph.contains(id) {
            return Err(JitError::UndefinedNode(id));
        }
        let function = match graph.kind(id) {
            NodeKind::Method { child, .. } => *child,
            _ => id,
        };
        let NodeKind::Function { params, ret } = graph.kind(function) else {
            return Err(JitError::InvalidSchema {
                node: id,
                reason: format!("{} is not a function", graph.display_name(id)),
            });
        };
        let (params, ret) = (*params, *ret);
        Ok(Self {
            graph,
            function,
            params,
            ret,
        })
    }

    pub fn signature(&self) -> String {
        self.graph.type_signature(self.function)
    }

    pub fn param_names(&self) -> Vec<&str> {
        let NodeKind::Params { params } = self.graph.kind(self.params) else {
            return Vec::new();
        };
        params
            .iter()
            .filter_map(|p| match self.graph.kind(*p) {
                NodeKind::Parameter { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether the function returns a value, i.e. its return type is not
    /// `void`, `never` or `undefined`.
    pub fn has_return(&self) -> bool {
        !matches!(
            self.graph.kind(self.ret),
            NodeKind::Void | NodeKind::Never | NodeKind::Undefined
        )
    }

    pub fn params(&self) -> RunType {
        RunType {
            graph: Arc::clone(&self.graph),
            root: self.params,
        }
    }

    pub fn return_type(&self) -> RunType {
        RunType {
            graph: Arc::clone(&self.graph),
            root: self.ret,
        }
    }

    pub fn compiled_params(&self, ctx: &JitContext) -> JitResult<JitFunctions> {
        self.params().jit_functions(ctx)
    }

    pub fn compiled_return(&self, ctx: &JitContext) -> JitResult<JitFunctions> {
        self.return_type().jit_functions(ctx)
    }

    pub fn mock_params(&self, options: &MockOptions) -> JitResult<Value> {
        self.params().mock(options)
    }

    pub fn mock_return(&self, options: &MockOptions) -> JitResult<Value> {
        self.return_type().mock(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use serde_json::json;

    fn greet() -> (Arc<SchemaGraph>, NodeId) {
        let mut b = SchemaBuilder::new();
        let s = b.string();
        let n = b.number();
        let name = b.parameter("name", s);
        let times = b.optional_parameter("times", n);
        let params = b.params(vec![name, times]);
        let func = b.function(params, s);
        (Arc::new(b.finish().unwrap()), func)
    }

    #[test]
    fn test_member_root_rejected() {
        let mut b = SchemaBuilder::new();
        let s = b.string();
        let prop = b.property("a", s);
        let _ = b.interface(vec![prop]);
        let graph = Arc::new(b.finish().unwrap());
        assert!(matches!(
            RunType::new(graph, prop),
            Err(JitError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_function_params_and_return() {
        let ctx = JitContext::default();
        let (graph, func) = greet();
        let f = FunctionRunType::new(graph, func).unwrap();

        assert_eq!(f.param_names(), vec!["name", "times"]);
        assert!(f.has_return());

        let params = f.compiled_params(&ctx).unwrap();
        assert!(params.is_type(&Value::array([Value::from("Ada")])));
        assert!(!params.is_type(&Value::array([Value::from(1)])));
        assert_eq!(
            params.type_errors(&Value::array([Value::from("Ada"), Value::from("x")])),
            vec![RunTypeError::new(vec!["times".into()], "number")]
        );
        assert_eq!(
            params.encode(&Value::array([Value::from("Ada"), Value::Undefined])).unwrap(),
            json!(["Ada", null])
        );

        let ret = f.compiled_return(&ctx).unwrap();
        assert!(ret.is_type(&Value::from("hi")));
    }

    #[test]
    fn test_has_return() {
        let returning = |ret: fn(&mut SchemaBuilder) -> NodeId| {
            let mut b = SchemaBuilder::new();
            let params = b.params(vec![]);
            let ret = ret(&mut b);
            let func = b.function(params, ret);
            FunctionRunType::new(Arc::new(b.finish().unwrap()), func).unwrap()
        };
        assert!(returning(SchemaBuilder::string).has_return());
        assert!(!returning(SchemaBuilder::void).has_return());
        assert!(!returning(SchemaBuilder::never).has_return());
        assert!(!returning(SchemaBuilder::undefined).has_return());
    }

    #[test]
    fn test_function_itself_is_unsupported() {
        let ctx = JitContext::default();
        let (graph, func) = greet();
        let run_type = RunType::new(graph, func).unwrap();

        let err = run_type.compile::<IsType>(&ctx).unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("validate parameters or return type separately"));
        assert!(run_type.mock(&MockOptions::default()).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_mock_params() {
        let (graph, func) = greet();
        let f = FunctionRunType::new(graph, func).unwrap();
        let options = MockOptions::default();
        for _ in 0..20 {
            let params = f.mock_params(&options).unwrap();
            let items = params.as_array().unwrap();
            assert!(matches!(items.first(), Some(Value::String(_))));
            assert!(items.len() <= 2);
        }
        assert!(matches!(f.mock_return(&options).unwrap(), Value::String(_)));
    }
}
