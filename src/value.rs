//! Raw and bound value representations.
//!
//! A [`RawValue`] is what a transport location hands the engine: text from a
//! query/form/header/cookie accessor, a decoded JSON node from a body, a
//! multi-value list, or nothing at all. Null and empty string are distinct
//! raw states at extraction time; both count as "absent" for the required
//! check.
//!
//! All per-request containers here ([`RawValueMap`], [`BindResult`]) are
//! allocated fresh per bind call and owned by the caller; nothing is ever
//! written back onto a schema or field specification.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Per-request raw values keyed by wire key.
pub type RawValueMap = IndexMap<String, RawValue>;

/// One raw value as extracted from a transport location.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    /// The key was not present in the source.
    #[default]
    Null,
    /// A textual value from a key/value location.
    Text(String),
    /// All values for a multi-valued key.
    List(Vec<RawValue>),
    /// A decoded JSON node (from a JSON body or a nested object).
    Json(Value),
}

impl RawValue {
    /// Whether this value counts as absent for the required check.
    ///
    /// Empty strings and JSON nulls are absent; a list is absent when it has
    /// no non-null element.
    pub fn is_null(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.is_empty(),
            RawValue::List(items) => items.iter().all(RawValue::is_null),
            RawValue::Json(v) => match v {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            },
        }
    }

    /// String representation of a scalar, for length checks, predicates and
    /// textual coercion. Lists, objects and absent values have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null | RawValue::List(_) => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Json(v) => match v {
                Value::Null | Value::Array(_) | Value::Object(_) => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            },
        }
    }

    /// Converts back to a JSON value, for assembling nested objects.
    pub fn into_json(self) -> Value {
        match self {
            RawValue::Null => Value::Null,
            RawValue::Text(s) => Value::String(s),
            RawValue::List(items) => {
                Value::Array(items.into_iter().map(RawValue::into_json).collect())
            }
            RawValue::Json(v) => v,
        }
    }
}

impl From<Option<String>> for RawValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => RawValue::Text(s),
            None => RawValue::Null,
        }
    }
}

/// Aggregated result of binding one schema against one raw value map.
///
/// `data` holds coerced values for the fields that passed, keyed by field
/// name; `errors` holds one message per failing field, keyed by wire key.
/// Both preserve schema declaration order. Nested schema failures appear as
/// objects in `errors`, so the whole result serializes directly into an API
/// response.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BindResult {
    pub data: IndexMap<String, Value>,
    pub errors: IndexMap<String, Value>,
}

impl BindResult {
    /// Whether every field validated.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Splits into `(data, errors)`.
    pub fn into_parts(self) -> (IndexMap<String, Value>, IndexMap<String, Value>) {
        (self.data, self.errors)
    }
}
