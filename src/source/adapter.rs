//! The raw source accessor contract.
//!
//! One implementation per transport, supplied externally; the core only
//! depends on this trait. Accessors are async so adapters backed by lazy
//! body parsing or remote lookups fit naturally; synchronous adapters just
//! return ready values.
//!
//! Absent keys are `None`, never an empty string: "missing" and "submitted
//! empty" are distinct raw states and feed different branches of the
//! required check.

use async_trait::async_trait;

/// Read-only accessor over one request's raw key/value data.
#[async_trait]
pub trait RawSource: Send + Sync {
    /// First form/body value for `name`, if present.
    async fn get_argument(&self, name: &str) -> Option<String>;

    /// All form/body values for `name`.
    async fn get_arguments(&self, name: &str) -> Vec<String>;

    /// First query-string value for `name`, if present.
    async fn get_query_argument(&self, name: &str) -> Option<String>;

    /// All query-string values for `name`.
    async fn get_query_arguments(&self, name: &str) -> Vec<String>;

    /// Header value for `name` (case-insensitive), if present.
    async fn get_header(&self, name: &str) -> Option<String>;

    /// Cookie value for `name`, if present.
    async fn get_cookie(&self, name: &str) -> Option<String>;

    /// Raw textual payload, for the JSON body location.
    async fn get_body(&self) -> String;

    /// HTTP verb, upper-case.
    async fn get_method(&self) -> String;

    /// Localization hook applied to rendered error messages.
    fn translate(&self, message: &str) -> String {
        message.to_string()
    }
}
