//! Error kinds and the message catalog.
//!
//! Every field-level failure is classified by an [`ErrorKind`] and resolved
//! to a human message in three steps:
//!
//! 1. the field's own override (set at construction),
//! 2. the process-wide catalog (installed once, before any schema is built),
//! 3. the built-in default template.
//!
//! Templates take positional `{}` arguments (e.g. length bounds) which are
//! substituted before the optional translation hook runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::errors::SchemaBuildError;

/// Classification of a single field-level validation failure.
///
/// These are data, never panics: the binder collects them per field and
/// resolves each to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Value absent but the field is required.
    Required,
    /// String length outside the configured `(min, max)` bounds.
    LengthOutOfRange,
    /// String length differs from the configured exact length.
    LengthMismatch,
    /// Value is not one of the primitive kinds the field accepts.
    InvalidType,
    /// Value is not a member of the boolean literal sets.
    InvalidBoolean,
    /// Value does not parse against the date format, or violates the
    /// start/end ordering of a date range.
    InvalidDate,
    /// Numeric value below the configured minimum.
    MinInvalid,
    /// Numeric value above the configured maximum.
    MaxInvalid,
    /// List has fewer elements than `min_len`.
    TooShort,
    /// List has more elements than `max_len`.
    TooLong,
    /// Value is not decodable JSON, or decodes to a scalar.
    InvalidJson,
    /// Generic failure: custom validator, conditional requirement, or a
    /// coercion with no more specific kind.
    Invalid,
    /// A nested schema reported errors of its own.
    NestedPropagated,
}

impl ErrorKind {
    /// Returns the stable string name used in catalog overrides.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::LengthOutOfRange => "length_out_of_range",
            ErrorKind::LengthMismatch => "length_mismatch",
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::InvalidBoolean => "invalid_boolean",
            ErrorKind::InvalidDate => "invalid_date",
            ErrorKind::MinInvalid => "min_invalid",
            ErrorKind::MaxInvalid => "max_invalid",
            ErrorKind::TooShort => "too_short",
            ErrorKind::TooLong => "too_long",
            ErrorKind::InvalidJson => "invalid_json",
            ErrorKind::Invalid => "invalid",
            ErrorKind::NestedPropagated => "nested_propagated",
        }
    }

    /// Built-in default template for this kind.
    pub fn default_template(&self) -> &'static str {
        match self {
            ErrorKind::Required => "This field is required",
            ErrorKind::LengthOutOfRange => "Length must be between {} and {}",
            ErrorKind::LengthMismatch => "Length must be equal to {}",
            ErrorKind::InvalidType => "Invalid type",
            ErrorKind::InvalidBoolean => "Not a valid boolean",
            ErrorKind::InvalidDate => "{} cannot be formatted (e.g: {})",
            ErrorKind::MinInvalid => "The minimum value is {}",
            ErrorKind::MaxInvalid => "A maximum of {}",
            ErrorKind::TooShort => "Array length not less than {}",
            ErrorKind::TooLong => "Length of the array over {}",
            ErrorKind::InvalidJson => "Json data format error",
            ErrorKind::Invalid => "Verification failed",
            ErrorKind::NestedPropagated => "Nested object is invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Substitutes positional `{}` placeholders with `args`, in order.
///
/// Missing arguments render as empty strings; surplus arguments are ignored.
pub fn render(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut parts = template.split("{}");
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for (i, part) in parts.enumerate() {
        out.push_str(args.get(i).copied().unwrap_or(""));
        out.push_str(part);
    }
    out
}

/// Immutable mapping from [`ErrorKind`] to message template.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    overrides: HashMap<ErrorKind, String>,
}

/// Process-wide catalog, set at most once.
static CATALOG: OnceLock<MessageCatalog> = OnceLock::new();

impl MessageCatalog {
    /// Creates a catalog overriding the built-in templates for the given
    /// kinds.
    pub fn new(overrides: HashMap<ErrorKind, String>) -> Self {
        Self { overrides }
    }

    /// Installs `self` as the process-wide catalog.
    ///
    /// Precondition: must run before any schema is built, and at most once.
    /// A second install fails rather than silently racing with schemas that
    /// already resolved messages against the previous catalog.
    pub fn install(self) -> Result<(), SchemaBuildError> {
        CATALOG
            .set(self)
            .map_err(|_| SchemaBuildError::CatalogInstalled)
    }

    /// Returns the installed catalog, or the built-in defaults.
    pub fn current() -> &'static MessageCatalog {
        CATALOG.get_or_init(MessageCatalog::default)
    }

    /// Resolves the template for `kind`.
    pub fn template(&self, kind: ErrorKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_template())
    }
}
