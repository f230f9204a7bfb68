//! Configuration for the compiler and the mock generator.
//!
//! # Example
//! ```rust,ignore
//! use runtype_jit::{CompositionPolicy, JitConfig, MockOptions};
//!
//! let config = JitConfig::new()
//!     .with_max_stack_depth(64)
//!     .with_composition(CompositionPolicy::DependencyCollections);
//!
//! let mock = MockOptions::new().with_optional_probability(0.9);
//! ```

use crate::error::{JitError, JitResult};
use crate::value::RegExpValue;
use serde::{Deserialize, Serialize};

/// Default bound for schema traversal depth.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 100;

/// Which non-circular nodes are compiled as separate registry functions.
///
/// Circular nodes are always compiled as separate functions, whatever the
/// policy. Per-node overrides are set with
/// [`CompositionStrategy`](crate::schema::CompositionStrategy).
///
/// # Variants
///
/// * `InlineAll` - Every non-circular node is inlined into its parent.
///   Produces the fewest registry entries.
///
/// * `DependencyCollections` - Every collection node (object, array, tuple,
///   set, map, union) gets its own registry entry that parents call by
///   reference. Structurally identical collections across schemas then share
///   one compiled function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPolicy {
    #[default]
    InlineAll,
    DependencyCollections,
}

/// Compiler configuration.
///
/// # Fields
///
/// * `max_stack_depth` - Maximum nesting of schema nodes during fingerprinting
///   and composition. Exceeding it is a configuration error.
///   Default: 100.
///
/// * `composition` - Inline vs dependency policy for non-circular nodes.
///   Default: `InlineAll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    pub max_stack_depth: usize,
    pub composition: CompositionPolicy,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            composition: CompositionPolicy::default(),
        }
    }
}

impl JitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn with_composition(mut self, composition: CompositionPolicy) -> Self {
        self.composition = composition;
        self
    }
}

/// Options for mock generation.
///
/// # Fields
///
/// * `optional_probability` - Probability in `[0, 1]` that an optional member
///   is omitted. Default: 0.5.
///
/// * `regexp_list` - Pool of regular expressions a `regexp` node picks from.
///
/// * `max_depth` - Nesting depth after which optional members are always
///   omitted and open-ended collections are generated empty, so recursive
///   schemas terminate. Default: 6.
///
/// * `max_collection_len` - Upper bound (exclusive) for the length of
///   generated arrays, sets, maps and dictionaries. Default: 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockOptions {
    pub optional_probability: f64,
    pub regexp_list: Vec<RegExpValue>,
    pub max_depth: usize,
    pub max_collection_len: usize,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            optional_probability: 0.5,
            regexp_list: vec![
                RegExpValue::new("abc", "i"),
                RegExpValue::new("^[a-z]+$", "g"),
                RegExpValue::new(r"\d{3}-\d{4}", ""),
            ],
            max_depth: 6,
            max_collection_len: 10,
        }
    }
}

impl MockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optional_probability(mut self, probability: f64) -> Self {
        self.optional_probability = probability;
        self
    }

    pub fn with_regexp_list(mut self, list: Vec<RegExpValue>) -> Self {
        self.regexp_list = list;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    pub fn validate(&self) -> JitResult<()> {
        if !(0.0..=1.0).contains(&self.optional_probability) {
            return Err(JitError::InvalidMockOption {
                option: "optional_probability",
                reason: format!("{} is not between 0 and 1", self.optional_probability),
            });
        }
        if self.regexp_list.is_empty() {
            return Err(JitError::InvalidMockOption {
                option: "regexp_list",
                reason: "at least one regular expression is required".to_string(),
            });
        }
        if self.max_collection_len == 0 {
            return Err(JitError::InvalidMockOption {
                option: "max_collection_len",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
