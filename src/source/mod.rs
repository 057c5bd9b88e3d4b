//! Raw data sources and location resolution.
//!
//! Transports (web frameworks, test harnesses) sit behind the [`RawSource`]
//! accessor contract; the resolver decides, per request, which transport
//! location supplies each field's raw value and extracts a uniform
//! [`crate::value::RawValueMap`] regardless of transport.

mod adapter;
mod memory;
mod resolver;

pub use adapter::RawSource;
pub use memory::MemorySource;
pub use resolver::{resolve, Location, MIME_FORM, MIME_JSON, MIME_MULTIPART_FORM};
