//! Field specifications and the per-field validation engine.
//!
//! A [`FieldSpec`] is an immutable description of one value's constraints,
//! built once at schema-definition time and shared read-only across all
//! requests. Validation is a pure async function from `(spec, raw value,
//! sibling raw values)` to a fresh [`ValidationOutcome`]; nothing is ever
//! written back onto the spec, so any number of binds may run against the
//! same spec concurrently without synchronization.
//!
//! The engine runs these steps in order, stopping at the first failure:
//!
//! 1. list normalization (scalars become singletons, presence is list-aware)
//! 2. required / absence handling (absent optional values take the default,
//!    after the conditional-requirement predicate has had its say)
//! 3. length check on the string representation
//! 4. list element primitive check
//! 5. conditional requirement
//! 6. kind-specific coercion (see [`coerce`])
//! 7. custom validator chain

mod coerce;

pub use coerce::{falsy_literals, truthy_literals, CoerceFn, ElementKind, FieldKind};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::messages::{render, ErrorKind, MessageCatalog};
use crate::schema::SchemaSpec;
use crate::validate::Validator;
use crate::value::{RawValue, RawValueMap};

use self::coerce::CoerceFailure;

/// Optional localization hook applied to rendered messages.
pub type TranslateFn<'a> = dyn Fn(&str) -> String + Send + Sync + 'a;

/// String-length constraint, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// Inclusive `(min, max)` bounds.
    Between(usize, usize),
    /// Exact length.
    Exact(usize),
}

impl Length {
    fn check(&self, text: &str) -> Option<(ErrorKind, Vec<String>)> {
        let n = text.chars().count();
        match *self {
            Length::Between(min, max) if n < min || n > max => Some((
                ErrorKind::LengthOutOfRange,
                vec![min.to_string(), max.to_string()],
            )),
            Length::Exact(want) if n != want => {
                Some((ErrorKind::LengthMismatch, vec![want.to_string()]))
            }
            _ => None,
        }
    }
}

/// Normalized conditional-requirement predicate, resolved once at schema
/// construction time.
#[derive(Clone)]
pub enum Predicate {
    /// Sibling's string form equals this literal.
    Equals(String),
    /// Sibling's string form is one of these literals.
    MemberOf(Vec<String>),
    /// Arbitrary check over the sibling's raw value.
    Custom(Arc<dyn Fn(&RawValue) -> bool + Send + Sync>),
}

impl Predicate {
    fn matches(&self, sibling: &RawValue) -> bool {
        match self {
            Predicate::Equals(want) => {
                sibling.as_text().map(|t| &t == want).unwrap_or(false)
            }
            Predicate::MemberOf(set) => sibling
                .as_text()
                .map(|t| set.contains(&t))
                .unwrap_or(false),
            Predicate::Custom(check) => check(sibling),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals(v) => write!(f, "Equals({:?})", v),
            Predicate::MemberOf(v) => write!(f, "MemberOf({:?})", v),
            Predicate::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Makes a field required only when a sibling's value satisfies a predicate.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub(crate) on_field: String,
    pub(crate) predicate: Predicate,
}

/// Value used when an optional field is absent.
///
/// Thunks are invoked at bind time, not at construction time, so defaults
/// like "current date" are evaluated per request.
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    Absent,
    Value(Value),
    Thunk(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    fn materialize(&self) -> Value {
        match self {
            DefaultValue::Absent => Value::Null,
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Thunk(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Absent => write!(f, "Absent"),
            DefaultValue::Value(v) => write!(f, "Value({})", v),
            DefaultValue::Thunk(_) => write!(f, "Thunk(..)"),
        }
    }
}

/// Result of validating one raw value against one [`FieldSpec`].
///
/// Allocated fresh per invocation and returned by value; its lifetime is the
/// single bind call that produced it.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// The (list-normalized) raw value the field saw.
    pub raw: RawValue,
    /// Coerced value, when validation passed.
    pub value: Option<Value>,
    /// Which check failed, if any.
    pub error: Option<ErrorKind>,
    /// Rendered message: a string for flat failures, an object for nested
    /// schema propagation.
    pub message: Option<Value>,
}

impl ValidationOutcome {
    fn ok(raw: RawValue, value: Value) -> Self {
        Self {
            raw,
            value: Some(value),
            error: None,
            message: None,
        }
    }

    fn fail_with(raw: RawValue, kind: ErrorKind, message: Value) -> Self {
        Self {
            raw,
            value: None,
            error: Some(kind),
            message: Some(message),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Immutable constraint/coercion definition for one value.
pub struct FieldSpec {
    pub(crate) kind: FieldKind,
    pub(crate) wire_key: Option<String>,
    pub(crate) required: bool,
    pub(crate) default: DefaultValue,
    pub(crate) length: Option<Length>,
    pub(crate) is_list: bool,
    pub(crate) conditional: Option<Conditional>,
    pub(crate) validators: Vec<Arc<dyn Validator>>,
    pub(crate) messages: HashMap<ErrorKind, String>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("kind", &self.kind)
            .field("wire_key", &self.wire_key)
            .field("required", &self.required)
            .field("is_list", &self.is_list)
            .field("length", &self.length)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl FieldSpec {
    /// Creates a spec of the given kind; optional by default.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            wire_key: None,
            required: false,
            default: DefaultValue::Absent,
            length: None,
            is_list: false,
            conditional: None,
            validators: Vec::new(),
            messages: HashMap::new(),
        }
    }

    /// Integer literal field.
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer {
            min: None,
            max: None,
        })
    }

    /// Float literal field.
    pub fn float() -> Self {
        Self::new(FieldKind::Float {
            min: None,
            max: None,
        })
    }

    /// Pass-through string field, length-bounded to `(0, 255)` by default.
    pub fn text() -> Self {
        Self::new(FieldKind::Text).length(Length::Between(0, 255))
    }

    /// Boolean field with the default literal sets.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean {
            real: truthy_literals(),
            fake: falsy_literals(),
        })
    }

    /// Date/datetime field parsed against a strftime-style format.
    pub fn date(format: impl Into<String>) -> Self {
        Self::new(FieldKind::Date {
            format: format.into(),
        })
    }

    /// End-of-range date field: must parse like [`FieldSpec::date`] and be
    /// `>=` the named sibling start field.
    pub fn date_range(format: impl Into<String>, start_field: impl Into<String>) -> Self {
        Self::new(FieldKind::DateRange {
            format: format.into(),
            start_field: start_field.into(),
        })
        .message(ErrorKind::InvalidDate, "Invalid time format")
    }

    /// List of primitive elements; at least one element by default.
    pub fn list(element: ElementKind) -> Self {
        let mut spec = Self::new(FieldKind::List {
            element,
            min_len: 1,
            max_len: None,
            dedup: false,
        });
        spec.is_list = true;
        spec
    }

    /// Integer list with stable de-duplication, matching the common
    /// "ids=1&ids=2&ids=1" submission shape.
    pub fn int_list() -> Self {
        Self::list(ElementKind::Int).dedup(true)
    }

    /// Nested object field bound against its own schema.
    pub fn nested(schema: Arc<SchemaSpec>) -> Self {
        Self::new(FieldKind::Nested { schema })
    }

    /// JSON payload field; the decoded value must be an array or an object.
    pub fn json() -> Self {
        Self::new(FieldKind::Json)
    }

    /// Field with a user-supplied coercion function.
    pub fn custom<F>(coerce: F) -> Self
    where
        F: Fn(&RawValue) -> Result<Value, crate::validate::ValidationError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(FieldKind::Custom {
            coerce: Arc::new(coerce),
        })
    }

    // ---- builder-style configuration ----

    /// Marks the field required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Overrides the wire name; defaults to the declared field name.
    pub fn wire_key(mut self, key: impl Into<String>) -> Self {
        self.wire_key = Some(key.into());
        self
    }

    /// Sets a constant default for absent optional values.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = DefaultValue::Value(value);
        self
    }

    /// Sets a default computed at bind time.
    pub fn default_with<F>(mut self, thunk: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Thunk(Arc::new(thunk));
        self
    }

    /// Sets (or clears) the string-length constraint.
    pub fn length(mut self, length: Length) -> Self {
        self.length = Some(length);
        self
    }

    /// Removes the length constraint (e.g. for long text fields).
    pub fn unbounded(mut self) -> Self {
        self.length = None;
        self
    }

    /// Sets the inclusive minimum for numeric kinds; no-op otherwise.
    pub fn min(mut self, value: f64) -> Self {
        if let FieldKind::Integer { min, .. } | FieldKind::Float { min, .. } = &mut self.kind {
            *min = Some(value);
        }
        self
    }

    /// Sets the inclusive maximum for numeric kinds; no-op otherwise.
    pub fn max(mut self, value: f64) -> Self {
        if let FieldKind::Integer { max, .. } | FieldKind::Float { max, .. } = &mut self.kind {
            *max = Some(value);
        }
        self
    }

    /// Sets element-count bounds for list kinds; no-op otherwise.
    pub fn list_bounds(mut self, min: usize, max: Option<usize>) -> Self {
        if let FieldKind::List {
            min_len, max_len, ..
        } = &mut self.kind
        {
            *min_len = min;
            *max_len = max;
        }
        self
    }

    /// Enables stable de-duplication for list kinds; no-op otherwise.
    pub fn dedup(mut self, dedup: bool) -> Self {
        if let FieldKind::List { dedup: d, .. } = &mut self.kind {
            *d = dedup;
        }
        self
    }

    /// Replaces the boolean literal sets; no-op for other kinds.
    pub fn boolean_literals(mut self, real: Vec<String>, fake: Vec<String>) -> Self {
        if let FieldKind::Boolean { real: r, fake: f } = &mut self.kind {
            *r = real;
            *f = fake;
        }
        self
    }

    /// Requires the field only when `on_field`'s raw value satisfies the
    /// predicate.
    pub fn required_when(mut self, on_field: impl Into<String>, predicate: Predicate) -> Self {
        self.conditional = Some(Conditional {
            on_field: on_field.into(),
            predicate,
        });
        self
    }

    /// Appends a validator to the chain.
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Overrides the message template for one error kind.
    pub fn message(mut self, kind: ErrorKind, template: impl Into<String>) -> Self {
        self.messages.insert(kind, template.into());
        self
    }

    // ---- accessors ----

    /// The name used in the raw source.
    pub fn wire_name(&self) -> &str {
        self.wire_key.as_deref().unwrap_or("")
    }

    /// Whether the raw value is extracted with the multi-value accessor.
    pub fn is_list(&self) -> bool {
        self.is_list
    }

    pub(crate) fn kind(&self) -> &FieldKind {
        &self.kind
    }

    // ---- validation engine ----

    /// Validates one raw value against this spec.
    ///
    /// Pure and stateless: the outcome is allocated fresh per call, and
    /// sibling reads go against the immutable `siblings` map only.
    pub async fn validate(
        &self,
        raw: &RawValue,
        siblings: &RawValueMap,
        translate: Option<&TranslateFn<'_>>,
    ) -> ValidationOutcome {
        // 1. list normalization; presence is list-aware
        let work = if self.is_list {
            RawValue::List(normalize_list(raw))
        } else {
            raw.clone()
        };

        // 2. required / absence
        if work.is_null() {
            if self.required {
                return self.fail(work, ErrorKind::Required, &[], translate);
            }
            if let Some(cond) = &self.conditional {
                let sibling = siblings.get(&cond.on_field).cloned().unwrap_or_default();
                if cond.predicate.matches(&sibling) {
                    return self.fail(work, ErrorKind::Invalid, &[], translate);
                }
            }
            let value = self.default.materialize();
            return ValidationOutcome::ok(work, value);
        }

        // a present list drops its null placeholders
        let work = match work {
            RawValue::List(items) => {
                RawValue::List(items.into_iter().filter(|i| !i.is_null()).collect())
            }
            other => other,
        };

        // 3. length on the string representation
        if let Some(length) = self.length {
            let failure = match &work {
                RawValue::List(items) => items
                    .iter()
                    .filter_map(RawValue::as_text)
                    .find_map(|t| length.check(&t)),
                other => other.as_text().and_then(|t| length.check(&t)),
            };
            if let Some((kind, args)) = failure {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                return self.fail(work, kind, &args, translate);
            }
        }

        // 4. list elements must be primitive scalars
        if let RawValue::List(items) = &work {
            if items.iter().any(|i| i.as_text().is_none()) {
                return self.fail(work, ErrorKind::InvalidType, &[], translate);
            }
        }

        // 5. conditional requirement only bites on absent values, handled
        //    above; a present value proceeds regardless of the predicate.

        // 6. kind-specific coercion
        let value = match coerce::apply(self, &work, siblings, translate).await {
            Ok(value) => value,
            Err(failure) => return self.fail_coerce(work, failure, translate),
        };

        // 7. validator chain, first failure wins
        for validator in &self.validators {
            match validator.check(&value).await {
                Ok(true) => {}
                Ok(false) => return self.fail(work, ErrorKind::Invalid, &[], translate),
                Err(err) => {
                    let message = match translate {
                        Some(t) => t(&err.message),
                        None => err.message,
                    };
                    return ValidationOutcome::fail_with(
                        work,
                        ErrorKind::Invalid,
                        Value::String(message),
                    );
                }
            }
        }

        ValidationOutcome::ok(work, value)
    }

    fn message_for(
        &self,
        kind: ErrorKind,
        args: &[&str],
        translate: Option<&TranslateFn<'_>>,
    ) -> String {
        let template = self
            .messages
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| MessageCatalog::current().template(kind).to_string());
        let rendered = render(&template, args);
        match translate {
            Some(t) => t(&rendered),
            None => rendered,
        }
    }

    fn fail(
        &self,
        raw: RawValue,
        kind: ErrorKind,
        args: &[&str],
        translate: Option<&TranslateFn<'_>>,
    ) -> ValidationOutcome {
        let message = self.message_for(kind, args, translate);
        ValidationOutcome::fail_with(raw, kind, Value::String(message))
    }

    fn fail_coerce(
        &self,
        raw: RawValue,
        failure: CoerceFailure,
        translate: Option<&TranslateFn<'_>>,
    ) -> ValidationOutcome {
        match failure {
            CoerceFailure::Kind { kind, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                self.fail(raw, kind, &args, translate)
            }
            CoerceFailure::Message { kind, message } => {
                let message = match translate {
                    Some(t) => t(&message),
                    None => message,
                };
                ValidationOutcome::fail_with(raw, kind, Value::String(message))
            }
            CoerceFailure::Nested { errors } => {
                ValidationOutcome::fail_with(raw, ErrorKind::NestedPropagated, errors)
            }
        }
    }
}

/// Coerces a scalar to a singleton list; JSON arrays flatten to elements.
fn normalize_list(raw: &RawValue) -> Vec<RawValue> {
    match raw {
        RawValue::Null => vec![],
        RawValue::List(items) => items.clone(),
        RawValue::Json(Value::Array(items)) => {
            items.iter().cloned().map(RawValue::Json).collect()
        }
        other => vec![other.clone()],
    }
}
