//! Property-based tests for the transport codecs
//!
//! These tests validate the round-trip properties of encode, decode and
//! stringify over random schemas and mocked values:
//! - Property 1: Encode/Decode Round Trip
//! - Property 2: Stringify/Parse/Decode Round Trip
//! - Property 3: Mocks Are Valid

use super::shapes::{Layout, finish, shape};
use crate::config::MockOptions;
use crate::registry::JitContext;
use crate::runtype::RunType;
use proptest::prelude::*;

// =============================================================================
// Property 1: Encode/Decode Round Trip
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* schema and any mocked value v, decode(encode(v)) deep-equals v.
    #[test]
    fn prop_encode_decode_round_trip(shape in shape()) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let run_type = RunType::new(graph, root).unwrap();
        let jit = run_type.jit_functions(&ctx).unwrap();

        for _ in 0..5 {
            let value = run_type.mock(&MockOptions::default()).unwrap();
            let encoded = jit.encode(&value).unwrap();
            let decoded = jit.decode(&encoded).unwrap();
            prop_assert_eq!(&decoded, &value, "transport was {}", encoded);
        }
    }
}

// =============================================================================
// Property 2: Stringify/Parse/Decode Round Trip
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* schema and any mocked value v,
    /// decode(parse(stringify(v))) deep-equals v, and the parsed text equals
    /// encode(v).
    #[test]
    fn prop_stringify_round_trip(shape in shape()) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let run_type = RunType::new(graph, root).unwrap();
        let jit = run_type.jit_functions(&ctx).unwrap();

        for _ in 0..5 {
            let value = run_type.mock(&MockOptions::default()).unwrap();
            let text = jit.stringify(&value).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(&parsed, &jit.encode(&value).unwrap());
            prop_assert_eq!(&jit.decode(&parsed).unwrap(), &value, "text was {}", text);
        }
    }
}

// =============================================================================
// Property 3: Mocks Are Valid
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* schema, every mocked value passes isType, has no type errors
    /// and has no unknown keys.
    #[test]
    fn prop_mocks_are_valid(shape in shape()) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let run_type = RunType::new(graph, root).unwrap();
        let jit = run_type.jit_functions(&ctx).unwrap();

        for _ in 0..5 {
            let value = run_type.mock(&MockOptions::default()).unwrap();
            prop_assert!(jit.is_type(&value), "{:?} rejected by {}", value, run_type.signature());
            prop_assert!(jit.type_errors(&value).is_empty());
            prop_assert!(!jit.has_unknown_keys(&value));
        }
    }
}
