//! Location negotiation and raw value extraction.
//!
//! A request carries candidate data in several places (query string, form
//! body, JSON body, headers, cookies). The resolver either walks an explicit
//! caller-supplied location list, keeping the first one that yields any
//! non-absent value, or negotiates a single location from the verb and
//! `Content-Type`. Extraction is schema-driven: only declared wire keys are
//! read, and nested fields are assembled from dotted keys (`user.uid`) in
//! the flat locations.

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::field::{FieldKind, FieldSpec};
use crate::schema::SchemaSpec;
use crate::value::{RawValue, RawValueMap};

use super::adapter::RawSource;

pub const MIME_JSON: &str = "application/json";
pub const MIME_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_MULTIPART_FORM: &str = "multipart/form-data";

/// Where a request's raw values are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Query,
    Form,
    Json,
    Headers,
    Cookies,
}

/// Extracts a raw value map for `schema` from `source`.
///
/// With an explicit location list, locations are tried in order and the
/// first one supplying at least one non-absent value wins; `None` means no
/// listed location had data. Without a list, a single location is
/// negotiated from the verb and `Content-Type` and its extraction is
/// returned as-is (an all-absent map still feeds the required checks).
pub async fn resolve(
    source: &dyn RawSource,
    schema: &SchemaSpec,
    locations: Option<&[Location]>,
) -> Option<RawValueMap> {
    if let Some(locations) = locations {
        for &location in locations {
            if let Some(raw) = extract(source, schema, location).await {
                if raw.values().any(|value| !value.is_null()) {
                    tracing::debug!(?location, "explicit location supplied data");
                    return Some(raw);
                }
            }
        }
        return None;
    }

    let method = source.get_method().await.to_ascii_uppercase();
    let content_type = source.get_header("Content-Type").await.unwrap_or_default();
    let location = if method == "GET" && content_type.is_empty() {
        Location::Query
    } else if content_type.contains(MIME_JSON) {
        Location::Json
    } else if content_type.contains(MIME_FORM) || content_type.contains(MIME_MULTIPART_FORM) {
        Location::Form
    } else {
        Location::Form
    };
    tracing::debug!(%method, %content_type, ?location, "negotiated raw data location");
    extract(source, schema, location).await
}

/// Reads every declared field from one location.
///
/// Returns `None` only for a JSON body that fails to parse into an object.
async fn extract(
    source: &dyn RawSource,
    schema: &SchemaSpec,
    location: Location,
) -> Option<RawValueMap> {
    if location == Location::Json {
        let body = source.get_body().await;
        let parsed: Value = serde_json::from_str(&body).ok()?;
        let object = parsed.as_object()?;
        return Some(schema.raw_map_from_object(object));
    }

    let mut raw = RawValueMap::with_capacity(schema.len());
    for (_, spec) in schema.fields() {
        let key = spec.wire_name().to_string();
        let value = extract_field(source, spec, location, key).await;
        raw.insert(spec.wire_name().to_string(), value);
    }
    Some(raw)
}

/// Reads one field from a flat location, recursing through nested schemas
/// with dotted keys.
fn extract_field<'a>(
    source: &'a dyn RawSource,
    spec: &'a FieldSpec,
    location: Location,
    key: String,
) -> BoxFuture<'a, RawValue> {
    Box::pin(async move {
        if let FieldKind::Nested { schema } = spec.kind() {
            let mut object = serde_json::Map::new();
            for (_, child) in schema.fields() {
                let child_key = format!("{key}.{}", child.wire_name());
                let value = extract_field(source, child, location, child_key).await;
                if !value.is_null() {
                    object.insert(child.wire_name().to_string(), value.into_json());
                }
            }
            // a group with no submitted children is absent, not an empty
            // object, so optional groups stay skippable
            if object.is_empty() {
                RawValue::Null
            } else {
                RawValue::Json(Value::Object(object))
            }
        } else if spec.is_list() {
            match location {
                Location::Query => list_of(source.get_query_arguments(&key).await),
                Location::Form => list_of(source.get_arguments(&key).await),
                Location::Headers => singleton(source.get_header(&key).await),
                Location::Cookies => singleton(source.get_cookie(&key).await),
                Location::Json => RawValue::Null,
            }
        } else {
            let value = match location {
                Location::Query => source.get_query_argument(&key).await,
                Location::Form => source.get_argument(&key).await,
                Location::Headers => source.get_header(&key).await,
                Location::Cookies => source.get_cookie(&key).await,
                Location::Json => None,
            };
            RawValue::from(value)
        }
    })
}

fn list_of(values: Vec<String>) -> RawValue {
    RawValue::List(values.into_iter().map(RawValue::Text).collect())
}

/// Headers and cookies carry one value per key; a present value becomes a
/// one-element list so list fields see a uniform shape.
fn singleton(value: Option<String>) -> RawValue {
    match value {
        Some(text) => RawValue::List(vec![RawValue::Text(text)]),
        None => RawValue::List(Vec::new()),
    }
}
