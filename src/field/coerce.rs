//! Kind-specific coercion.
//!
//! Field kinds form a closed sum type; coercion is a pure function per
//! variant that turns the raw string (or decoded JSON node) into a typed
//! `serde_json::Value`, or reports which [`ErrorKind`] failed and with what
//! message arguments.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::field::{FieldSpec, TranslateFn};
use crate::messages::ErrorKind;
use crate::schema::SchemaSpec;
use crate::validate::ValidationError;
use crate::value::{RawValue, RawValueMap};

/// User-supplied coercion for [`FieldKind::Custom`].
pub type CoerceFn = dyn Fn(&RawValue) -> Result<Value, ValidationError> + Send + Sync;

/// The typed interpretation of a field's raw value.
#[derive(Clone)]
pub enum FieldKind {
    /// Integer literal with optional inclusive bounds.
    Integer { min: Option<f64>, max: Option<f64> },
    /// Float literal with optional inclusive bounds.
    Float { min: Option<f64>, max: Option<f64> },
    /// Pass-through string, subject to the length constraint.
    Text,
    /// Literal-set membership; raw JSON booleans and integers coerce as
    /// truthiness.
    Boolean { real: Vec<String>, fake: Vec<String> },
    /// Date or datetime parsed strictly against a strftime-style format.
    Date { format: String },
    /// Like `Date`, but must also be `>=` the named sibling start field.
    DateRange { format: String, start_field: String },
    /// Collection of primitive elements with size bounds and optional
    /// de-duplication.
    List {
        element: ElementKind,
        min_len: usize,
        max_len: Option<usize>,
        dedup: bool,
    },
    /// Recursively bound sub-schema.
    Nested { schema: Arc<SchemaSpec> },
    /// Decoded JSON payload; must be an array or an object.
    Json,
    /// User-supplied coercion function.
    Custom { coerce: Arc<CoerceFn> },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer { .. } => "Integer",
            FieldKind::Float { .. } => "Float",
            FieldKind::Text => "Text",
            FieldKind::Boolean { .. } => "Boolean",
            FieldKind::Date { .. } => "Date",
            FieldKind::DateRange { .. } => "DateRange",
            FieldKind::List { .. } => "List",
            FieldKind::Nested { .. } => "Nested",
            FieldKind::Json => "Json",
            FieldKind::Custom { .. } => "Custom",
        };
        write!(f, "FieldKind::{}", name)
    }
}

/// Primitive element types accepted inside a `List` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Int,
    Float,
    Text,
    Bool,
}

/// Why a coercion failed.
#[derive(Debug)]
pub(crate) enum CoerceFailure {
    /// Resolve the message from the field/catalog template for `kind`.
    Kind { kind: ErrorKind, args: Vec<String> },
    /// The failure carries its own message (custom coercion).
    Message { kind: ErrorKind, message: String },
    /// A nested schema reported per-field errors.
    Nested { errors: Value },
}

impl CoerceFailure {
    fn kind(kind: ErrorKind) -> Self {
        CoerceFailure::Kind { kind, args: vec![] }
    }

    fn with_args(kind: ErrorKind, args: Vec<String>) -> Self {
        CoerceFailure::Kind { kind, args }
    }
}

/// Truthy literals matched by the default `Boolean` configuration.
pub fn truthy_literals() -> Vec<String> {
    ["t", "true", "on", "y", "yes", "1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Falsy literals matched by the default `Boolean` configuration.
pub fn falsy_literals() -> Vec<String> {
    ["f", "false", "off", "n", "no", "0"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn integer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(0|[1-9]\d*)$").expect("built-in pattern"))
}

fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("built-in pattern"))
}

/// Formats a numeric bound without a trailing `.0` for whole numbers.
fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.is_finite() {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

/// Applies the field's kind coercion to a normalized raw value.
pub(crate) async fn apply(
    spec: &FieldSpec,
    raw: &RawValue,
    siblings: &RawValueMap,
    translate: Option<&TranslateFn<'_>>,
) -> Result<Value, CoerceFailure> {
    match &spec.kind {
        FieldKind::Integer { min, max } => coerce_integer(raw, *min, *max),
        FieldKind::Float { min, max } => coerce_float(raw, *min, *max),
        FieldKind::Text => coerce_text(raw),
        FieldKind::Boolean { real, fake } => coerce_boolean(raw, real, fake),
        FieldKind::Date { format } => coerce_date(raw, format),
        FieldKind::DateRange {
            format,
            start_field,
        } => coerce_date_range(raw, format, start_field, siblings),
        FieldKind::List {
            element,
            min_len,
            max_len,
            dedup,
        } => coerce_list(raw, *element, *min_len, *max_len, *dedup),
        FieldKind::Nested { schema } => {
            coerce_nested(schema, raw, spec.required, translate).await
        }
        FieldKind::Json => coerce_json(raw),
        FieldKind::Custom { coerce } => coerce(raw).map_err(|err| CoerceFailure::Message {
            kind: ErrorKind::Invalid,
            message: err.message,
        }),
    }
}

fn coerce_integer(
    raw: &RawValue,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value, CoerceFailure> {
    let text = raw
        .as_text()
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::Invalid))?;
    if !integer_regex().is_match(&text) {
        return Err(CoerceFailure::kind(ErrorKind::Invalid));
    }
    let value: i64 = text
        .parse()
        .map_err(|_| CoerceFailure::kind(ErrorKind::Invalid))?;
    check_bounds(value as f64, min, max)?;
    Ok(Value::from(value))
}

fn coerce_float(
    raw: &RawValue,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value, CoerceFailure> {
    let text = raw
        .as_text()
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::Invalid))?;
    if !float_regex().is_match(&text) {
        return Err(CoerceFailure::kind(ErrorKind::Invalid));
    }
    let value: f64 = text
        .parse()
        .map_err(|_| CoerceFailure::kind(ErrorKind::Invalid))?;
    check_bounds(value, min, max)?;
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::Invalid))
}

fn check_bounds(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), CoerceFailure> {
    if let Some(min) = min {
        if value < min {
            return Err(CoerceFailure::with_args(
                ErrorKind::MinInvalid,
                vec![format_bound(min)],
            ));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(CoerceFailure::with_args(
                ErrorKind::MaxInvalid,
                vec![format_bound(max)],
            ));
        }
    }
    Ok(())
}

fn coerce_text(raw: &RawValue) -> Result<Value, CoerceFailure> {
    raw.as_text()
        .map(Value::String)
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::Invalid))
}

fn coerce_boolean(raw: &RawValue, real: &[String], fake: &[String]) -> Result<Value, CoerceFailure> {
    let text = match raw {
        RawValue::Json(Value::Bool(b)) => return Ok(Value::Bool(*b)),
        RawValue::Json(Value::Number(n)) => {
            return Ok(Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)));
        }
        RawValue::Text(s) => s.clone(),
        RawValue::Json(Value::String(s)) => s.clone(),
        _ => return Err(CoerceFailure::kind(ErrorKind::InvalidBoolean)),
    };
    let lowered = text.to_lowercase();
    if real.iter().any(|r| r == &lowered) {
        Ok(Value::Bool(true))
    } else if fake.iter().any(|f| f == &lowered) {
        Ok(Value::Bool(false))
    } else {
        Err(CoerceFailure::kind(ErrorKind::InvalidBoolean))
    }
}

/// Strict parse: the value must reproduce itself when re-formatted, so
/// `2020-1-1` is rejected for `%Y-%m-%d` even though chrono would accept it.
pub(crate) fn parse_temporal(value: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
        if dt.format(format).to_string() == value {
            return Some(dt);
        }
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, format) {
        if date.format(format).to_string() == value {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Today/now rendered with `format`, used as the example in date messages.
fn format_example(format: &str) -> String {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return format.to_string();
    }
    Local::now()
        .naive_local()
        .format_with_items(items.iter())
        .to_string()
}

fn coerce_date(raw: &RawValue, format: &str) -> Result<Value, CoerceFailure> {
    let text = raw
        .as_text()
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::InvalidDate))?;
    match parse_temporal(&text, format) {
        Some(_) => Ok(Value::String(text)),
        None => Err(CoerceFailure::with_args(
            ErrorKind::InvalidDate,
            vec![text, format_example(format)],
        )),
    }
}

fn coerce_date_range(
    raw: &RawValue,
    format: &str,
    start_field: &str,
    siblings: &RawValueMap,
) -> Result<Value, CoerceFailure> {
    let text = raw
        .as_text()
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::InvalidDate))?;
    let start_text = siblings
        .get(start_field)
        .and_then(RawValue::as_text)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoerceFailure::kind(ErrorKind::InvalidDate))?;
    let start = parse_temporal(&start_text, format);
    let ended = parse_temporal(&text, format);
    match (start, ended) {
        (Some(start), Some(ended)) if ended >= start => Ok(Value::String(text)),
        _ => Err(CoerceFailure::kind(ErrorKind::InvalidDate)),
    }
}

fn coerce_list(
    raw: &RawValue,
    element: ElementKind,
    min_len: usize,
    max_len: Option<usize>,
    dedup: bool,
) -> Result<Value, CoerceFailure> {
    let items = match raw {
        RawValue::List(items) => items,
        _ => return Err(CoerceFailure::kind(ErrorKind::InvalidType)),
    };
    if items.len() < min_len {
        return Err(CoerceFailure::with_args(
            ErrorKind::TooShort,
            vec![min_len.to_string()],
        ));
    }
    if let Some(max_len) = max_len {
        if items.len() > max_len {
            return Err(CoerceFailure::with_args(
                ErrorKind::TooLong,
                vec![max_len.to_string()],
            ));
        }
    }
    let mut coerced = Vec::with_capacity(items.len());
    for item in items {
        let value = coerce_element(item, element)?;
        if !dedup || !coerced.contains(&value) {
            coerced.push(value);
        }
    }
    Ok(Value::Array(coerced))
}

fn coerce_element(item: &RawValue, element: ElementKind) -> Result<Value, CoerceFailure> {
    match element {
        ElementKind::Int => coerce_integer(item, None, None)
            .map_err(|_| CoerceFailure::kind(ErrorKind::Invalid)),
        ElementKind::Float => {
            coerce_float(item, None, None).map_err(|_| CoerceFailure::kind(ErrorKind::Invalid))
        }
        ElementKind::Text => coerce_text(item),
        ElementKind::Bool => coerce_boolean(item, &truthy_literals(), &falsy_literals())
            .map_err(|_| CoerceFailure::kind(ErrorKind::Invalid)),
    }
}

async fn coerce_nested(
    schema: &Arc<SchemaSpec>,
    raw: &RawValue,
    required: bool,
    translate: Option<&TranslateFn<'_>>,
) -> Result<Value, CoerceFailure> {
    let object = match raw {
        RawValue::Text(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => return Err(CoerceFailure::kind(ErrorKind::InvalidJson)),
        },
        RawValue::Json(Value::Object(map)) => map.clone(),
        _ => return Err(CoerceFailure::kind(ErrorKind::InvalidType)),
    };

    let nested_raw = schema.raw_map_from_object(&object);
    let result = Box::pin(schema.bind(&nested_raw, translate)).await;

    if result.errors.is_empty() {
        let data: serde_json::Map<String, Value> = result.data.into_iter().collect();
        return Ok(Value::Object(data));
    }

    // An optional nested field swallows errors unless the submission actually
    // carried nested scalar data.
    let significant = result
        .data
        .values()
        .any(|value| !value.is_null() && !value.is_object());
    if required || significant {
        let errors: serde_json::Map<String, Value> = result.errors.into_iter().collect();
        Err(CoerceFailure::Nested {
            errors: Value::Object(errors),
        })
    } else {
        let data: serde_json::Map<String, Value> = result.data.into_iter().collect();
        Ok(Value::Object(data))
    }
}

fn coerce_json(raw: &RawValue) -> Result<Value, CoerceFailure> {
    let decoded = match raw {
        RawValue::Text(s) => serde_json::from_str::<Value>(s)
            .map_err(|_| CoerceFailure::kind(ErrorKind::InvalidJson))?,
        RawValue::Json(v) => v.clone(),
        _ => return Err(CoerceFailure::kind(ErrorKind::InvalidJson)),
    };
    match decoded {
        Value::Array(_) | Value::Object(_) => Ok(decoded),
        _ => Err(CoerceFailure::kind(ErrorKind::InvalidJson)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_integer_literal() {
        assert_eq!(coerce_integer(&text("2"), None, None).unwrap(), json!(2));
        assert_eq!(coerce_integer(&text("-17"), None, None).unwrap(), json!(-17));
        assert!(coerce_integer(&text("05"), None, None).is_err());
        assert!(coerce_integer(&text("1.5"), None, None).is_err());
        assert!(coerce_integer(&text("-"), None, None).is_err());
        assert!(coerce_integer(&text("abc"), None, None).is_err());
    }

    #[test]
    fn test_integer_bounds() {
        assert!(matches!(
            coerce_integer(&text("0"), Some(1.0), None),
            Err(CoerceFailure::Kind {
                kind: ErrorKind::MinInvalid,
                ..
            })
        ));
        assert!(matches!(
            coerce_integer(&text("11"), Some(1.0), Some(10.0)),
            Err(CoerceFailure::Kind {
                kind: ErrorKind::MaxInvalid,
                ..
            })
        ));
        assert!(coerce_integer(&text("10"), Some(1.0), Some(10.0)).is_ok());
    }

    #[test]
    fn test_float_accepts_whole_numbers() {
        assert_eq!(coerce_float(&text("3"), None, None).unwrap(), json!(3.0));
        assert_eq!(coerce_float(&text("3.25"), None, None).unwrap(), json!(3.25));
        assert!(coerce_float(&text("3."), None, None).is_err());
    }

    #[test]
    fn test_boolean_literal_sets() {
        let real = truthy_literals();
        let fake = falsy_literals();
        assert_eq!(coerce_boolean(&text("Yes"), &real, &fake).unwrap(), json!(true));
        assert_eq!(coerce_boolean(&text("0"), &real, &fake).unwrap(), json!(false));
        assert!(coerce_boolean(&text("maybe"), &real, &fake).is_err());
    }

    #[test]
    fn test_boolean_raw_passthrough() {
        let real = truthy_literals();
        let fake = falsy_literals();
        let raw = RawValue::Json(json!(true));
        assert_eq!(coerce_boolean(&raw, &real, &fake).unwrap(), json!(true));
        let raw = RawValue::Json(json!(0));
        assert_eq!(coerce_boolean(&raw, &real, &fake).unwrap(), json!(false));
    }

    #[test]
    fn test_date_strictness() {
        assert!(parse_temporal("2020-01-01", "%Y-%m-%d").is_some());
        assert!(parse_temporal("2020-1-1", "%Y-%m-%d").is_none());
        assert!(parse_temporal("2020-13-01", "%Y-%m-%d").is_none());
        assert!(parse_temporal("2020-01-01 08:30:00", "%Y-%m-%d %H:%M:%S").is_some());
    }

    #[test]
    fn test_date_range_ordering() {
        let mut siblings = RawValueMap::new();
        siblings.insert("stime".into(), text("2020-01-01"));
        assert!(coerce_date_range(&text("2019-01-01"), "%Y-%m-%d", "stime", &siblings).is_err());
        assert!(coerce_date_range(&text("2021-01-01"), "%Y-%m-%d", "stime", &siblings).is_ok());
        // equal endpoints are allowed
        assert!(coerce_date_range(&text("2020-01-01"), "%Y-%m-%d", "stime", &siblings).is_ok());
    }

    #[test]
    fn test_date_range_requires_start() {
        let siblings = RawValueMap::new();
        assert!(coerce_date_range(&text("2021-01-01"), "%Y-%m-%d", "stime", &siblings).is_err());
    }

    #[test]
    fn test_list_bounds_and_dedup() {
        let raw = RawValue::List(vec![text("1"), text("2"), text("1")]);
        let coerced = coerce_list(&raw, ElementKind::Int, 1, None, true).unwrap();
        assert_eq!(coerced, json!([1, 2]));

        let coerced = coerce_list(&raw, ElementKind::Int, 1, None, false).unwrap();
        assert_eq!(coerced, json!([1, 2, 1]));

        assert!(matches!(
            coerce_list(&RawValue::List(vec![]), ElementKind::Int, 1, None, false),
            Err(CoerceFailure::Kind {
                kind: ErrorKind::TooShort,
                ..
            })
        ));
        assert!(matches!(
            coerce_list(&raw, ElementKind::Int, 0, Some(2), false),
            Err(CoerceFailure::Kind {
                kind: ErrorKind::TooLong,
                ..
            })
        ));
    }

    #[test]
    fn test_list_element_failure() {
        let raw = RawValue::List(vec![text("1"), text("x")]);
        assert!(coerce_list(&raw, ElementKind::Int, 0, None, false).is_err());
    }

    #[test]
    fn test_json_requires_container() {
        assert_eq!(
            coerce_json(&text(r#"{"a": 1}"#)).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(coerce_json(&text("[1, 2]")).unwrap(), json!([1, 2]));
        assert!(coerce_json(&text("42")).is_err());
        assert!(coerce_json(&text("{broken")).is_err());
    }

    #[test]
    fn test_format_bound_trims_whole_floats() {
        assert_eq!(format_bound(1.0), "1");
        assert_eq!(format_bound(0.5), "0.5");
    }
}
