//! Runtime values.
//!
//! [`Value`] models the dynamic values a compiled function checks and
//! converts. It is richer than JSON: it has `undefined` next to `null`, big
//! integers, symbols, dates, regular expressions, sets and maps. The
//! transport representation is [`serde_json::Value`].
//!
//! The conversions in this module are schema-less. They are what a node
//! reduces to when its schema says no per-type work is needed.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::LazyLock;

/// Transport prefix used for symbols.
pub const SYMBOL_PREFIX: &str = "Symbol:";

static REGEXP_LITERAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^/(.*)/([A-Za-z]*)$").ok());

/// A regular expression literal, kept as source and flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegExpValue {
    pub source: String,
    pub flags: String,
}

impl RegExpValue {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }

    /// Parses `/source/flags`. The source runs up to the last slash.
    pub fn parse(literal: &str) -> Option<Self> {
        let captures = REGEXP_LITERAL.as_ref()?.captures(literal)?;
        Some(Self::new(&captures[1], &captures[2]))
    }
}

impl fmt::Display for RegExpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A dynamic runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(i128),
    Symbol(Option<String>),
    Date(DateTime<Utc>),
    RegExp(RegExpValue),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Builds an object from key/value pairs, keeping their order.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    pub fn regexp(source: &str, flags: &str) -> Self {
        Self::RegExp(RegExpValue::new(source, flags))
    }

    pub fn symbol(description: &str) -> Self {
        Self::Symbol(Some(description.to_string()))
    }

    /// Name of the runtime kind, used as `found` in codec errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::BigInt(_) => "bigint",
            Self::Symbol(_) => "symbol",
            Self::Date(_) => "date",
            Self::RegExp(_) => "regexp",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// True for values that are not primitives.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Self::Date(_) | Self::RegExp(_) | Self::Array(_) | Self::Object(_) | Self::Set(_) | Self::Map(_)
        )
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Schema-less conversion to the transport format.
    ///
    /// `undefined` becomes `null` in arrays and disappears from objects,
    /// non-finite numbers become `null`.
    pub fn to_transport(&self) -> JsonValue {
        match self {
            Self::Undefined | Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => number_to_transport(*n),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::BigInt(n) => JsonValue::String(n.to_string()),
            Self::Symbol(description) => JsonValue::String(symbol_to_transport(description.as_deref())),
            Self::Date(date) => JsonValue::String(date_to_transport(date)),
            Self::RegExp(re) => JsonValue::String(re.to_string()),
            Self::Array(items) | Self::Set(items) => {
                JsonValue::Array(items.iter().map(Value::to_transport).collect())
            }
            Self::Object(map) => JsonValue::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_transport()))
                    .collect(),
            ),
            Self::Map(entries) => JsonValue::Array(
                entries
                    .iter()
                    .map(|(k, v)| JsonValue::Array(vec![k.to_transport(), v.to_transport()]))
                    .collect(),
            ),
        }
    }

    /// Schema-less conversion from the transport format.
    pub fn from_transport(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(items) => Self::Array(items.iter().map(Value::from_transport).collect()),
            JsonValue::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_transport(v)))
                    .collect(),
            ),
        }
    }

    /// Schema-less stringify, appended to `out`.
    pub fn write_transport(&self, out: &mut String) {
        out.push_str(&self.to_transport().to_string());
    }
}

/// Integral numbers in the safe range are written without a fraction.
pub fn number_to_transport(n: f64) -> JsonValue {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if !n.is_finite() {
        JsonValue::Null
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

pub fn symbol_to_transport(description: Option<&str>) -> String {
    format!("{}{}", SYMBOL_PREFIX, description.unwrap_or_default())
}

pub fn symbol_from_transport(s: &str) -> Option<Option<String>> {
    let description = s.strip_prefix(SYMBOL_PREFIX)?;
    Some((!description.is_empty()).then(|| description.to_string()))
}

/// RFC 3339, UTC, millisecond precision.
pub fn date_to_transport(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn date_from_transport(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

pub fn bigint_from_transport(json: &JsonValue) -> Option<i128> {
    match json {
        JsonValue::String(s) => s.parse().ok(),
        JsonValue::Number(n) => n.as_i64().map(i128::from),
        _ => None,
    }
}

/// Name of the transport kind, used as `found` in decode errors.
pub fn transport_kind_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}

impl From<RegExpValue> for Value {
    fn from(re: RegExpValue) -> Self {
        Self::RegExp(re)
    }
}
