//! Construction-time errors.
//!
//! The only hard failure path in this crate: a schema that references a
//! sibling field that does not exist, a duplicate field name, or a second
//! message-catalog install. These surface when the schema is built, never
//! during a bind.

use thiserror::Error;

/// Programming errors in schema construction.
#[derive(Debug, Error)]
pub enum SchemaBuildError {
    /// A `conditional` or date-range field points at a field name that is
    /// not declared in the same schema.
    #[error("field '{field}' references unknown sibling field '{target}'")]
    UnknownSibling { field: String, target: String },

    /// The same field name was registered twice.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    /// The process-wide message catalog was already installed.
    #[error("message catalog already installed")]
    CatalogInstalled,
}
