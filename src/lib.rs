//! formbind - schema-driven binding of untyped request data
//!
//! Declares fields once, then turns raw query/form/JSON/header/cookie data
//! into typed values with a per-field error report in a single pass.

pub mod binder;
pub mod errors;
pub mod field;
pub mod messages;
pub mod schema;
pub mod source;
pub mod validate;
pub mod value;

pub use binder::Binder;
pub use errors::SchemaBuildError;
pub use field::{Conditional, DefaultValue, ElementKind, FieldKind, FieldSpec, Length, Predicate};
pub use messages::{ErrorKind, MessageCatalog};
pub use schema::{SchemaBuilder, SchemaSpec};
pub use source::{Location, MemorySource, RawSource};
pub use validate::{validator_fn, OneOf, Pattern, ValidationError, Validator};
pub use value::{BindResult, RawValue, RawValueMap};
