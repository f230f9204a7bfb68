//! Property-based tests for validation consistency
//!
//! These tests validate that the operations compiled for one schema agree
//! with each other on arbitrary input:
//! - Property 4: isType/typeErrors Consistency
//! - Property 5: Unknown Key Operations Agree

use super::shapes::{Layout, finish, shape, value};
use crate::registry::JitContext;
use crate::runtype::RunType;
use crate::value::Value;
use proptest::prelude::*;

// =============================================================================
// Property 4: isType/typeErrors Consistency
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* schema and any value v, typeErrors(v) is empty if and only if
    /// isType(v) is true.
    #[test]
    fn prop_is_type_matches_type_errors(shape in shape(), values in prop::collection::vec(value(), 1..8)) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let jit = RunType::new(graph, root).unwrap().jit_functions(&ctx).unwrap();

        for v in &values {
            let errors = jit.type_errors(v);
            prop_assert_eq!(
                errors.is_empty(),
                jit.is_type(v),
                "value {:?} gave errors {:?}", v, errors
            );
        }
    }

    /// Error paths never repeat.
    #[test]
    fn prop_error_paths_are_distinct(shape in shape(), v in value()) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let jit = RunType::new(graph, root).unwrap().jit_functions(&ctx).unwrap();

        let errors = jit.type_errors(&v);
        for (i, a) in errors.iter().enumerate() {
            for b in &errors[i + 1..] {
                prop_assert_ne!(&a.path, &b.path);
            }
        }
    }
}

// =============================================================================
// Property 5: Unknown Key Operations Agree
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* schema and value, hasUnknownKeys agrees with getUnknownKeys,
    /// and neither finds anything after stripUnknownKeys.
    #[test]
    fn prop_strip_removes_every_unknown_key(shape in shape(), v in value()) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let jit = RunType::new(graph, root).unwrap().jit_functions(&ctx).unwrap();

        prop_assert_eq!(jit.has_unknown_keys(&v), !jit.get_unknown_keys(&v).is_empty());

        let mut stripped = v.clone();
        jit.strip_unknown_keys(&mut stripped);
        prop_assert!(!jit.has_unknown_keys(&stripped));
        prop_assert!(jit.get_unknown_keys(&stripped).is_empty());
    }

    /// unknownKeysToUndefined keeps every key and blanks exactly the unknown
    /// ones.
    #[test]
    fn prop_unknown_keys_to_undefined(shape in shape(), v in value()) {
        let ctx = JitContext::default();
        let (graph, root) = finish(&shape, Layout::default());
        let jit = RunType::new(graph, root).unwrap().jit_functions(&ctx).unwrap();

        let unknown = jit.get_unknown_keys(&v);
        let mut blanked = v.clone();
        jit.unknown_keys_to_undefined(&mut blanked);
        if let (Value::Object(before), Value::Object(after)) = (&v, &blanked) {
            prop_assert_eq!(before.len(), after.len());
        }
        let still_unknown = jit.get_unknown_keys(&blanked);
        prop_assert_eq!(still_unknown, unknown);
    }
}
