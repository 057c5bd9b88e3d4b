//! High-level entry point tying a schema to raw sources.

use std::sync::Arc;

use serde_json::Value;

use crate::field::TranslateFn;
use crate::schema::SchemaSpec;
use crate::source::{resolve, Location, RawSource};
use crate::value::{BindResult, RawValue, RawValueMap};

/// A schema plus its location policy, shared across requests.
///
/// Holds the schema behind an `Arc` so one binder can serve concurrent
/// requests; every call produces a fresh [`BindResult`].
#[derive(Debug, Clone)]
pub struct Binder {
    schema: Arc<SchemaSpec>,
    locations: Option<Vec<Location>>,
}

impl Binder {
    /// Binder with automatic location negotiation.
    pub fn new(schema: Arc<SchemaSpec>) -> Self {
        Self {
            schema,
            locations: None,
        }
    }

    /// Binder reading the given locations in order, keeping the first one
    /// that supplies data.
    pub fn with_locations(schema: Arc<SchemaSpec>, locations: Vec<Location>) -> Self {
        Self {
            schema,
            locations: Some(locations),
        }
    }

    pub fn schema(&self) -> &Arc<SchemaSpec> {
        &self.schema
    }

    /// Resolves raw values from `source` and validates them.
    ///
    /// A source with no usable data still runs every field, so required
    /// fields report their absence instead of the call failing.
    pub async fn bind(&self, source: &dyn RawSource) -> BindResult {
        let raw = resolve(source, &self.schema, self.locations.as_deref())
            .await
            .unwrap_or_default();
        let translate = |message: &str| source.translate(message);
        self.schema.bind(&raw, Some(&translate)).await
    }

    /// Validates an already-decoded JSON object, bypassing location
    /// resolution. Keys are matched by wire key; `translate` localizes
    /// rendered messages just as a source's hook would.
    pub async fn bind_from_map(
        &self,
        data: &serde_json::Map<String, Value>,
        translate: Option<&TranslateFn<'_>>,
    ) -> BindResult {
        let mut raw = RawValueMap::with_capacity(self.schema.len());
        for (_, spec) in self.schema.fields() {
            let value = match data.get(spec.wire_name()) {
                None => RawValue::Null,
                // string scalars for list fields arrive as singletons,
                // matching what a flat transport would hand over
                Some(Value::String(text)) if spec.is_list() => {
                    RawValue::List(vec![RawValue::Text(text.clone())])
                }
                Some(v) => RawValue::Json(v.clone()),
            };
            raw.insert(spec.wire_name().to_string(), value);
        }
        self.schema.bind(&raw, translate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::source::MemorySource;
    use serde_json::json;

    fn binder() -> Binder {
        let schema = SchemaSpec::builder()
            .field("id", FieldSpec::integer().required(true).min(1.0))
            .field("name", FieldSpec::text().required(true))
            .build()
            .unwrap();
        Binder::new(Arc::new(schema))
    }

    #[tokio::test]
    async fn test_bind_negotiates_location() {
        let source = MemorySource::new()
            .method("GET")
            .query_param("id", "3")
            .query_param("name", "tokio");
        let result = binder().bind(&source).await;
        assert!(result.is_ok());
        assert_eq!(result.data.get("id"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_empty_source_reports_required_fields() {
        let result = binder().bind(&MemorySource::new().method("GET")).await;
        assert_eq!(result.errors.len(), 2);
        assert_eq!(
            result.errors.get("id"),
            Some(&json!("This field is required"))
        );
    }

    #[tokio::test]
    async fn test_bind_from_map() {
        let data = json!({"id": 3, "name": "tokio"});
        let result = binder()
            .bind_from_map(data.as_object().unwrap(), None)
            .await;
        assert!(result.is_ok());
        assert_eq!(result.data.get("name"), Some(&json!("tokio")));
    }

    #[tokio::test]
    async fn test_bind_from_map_translates_messages() {
        let data = json!({"name": "tokio"});
        let upper = |msg: &str| msg.to_uppercase();
        let result = binder()
            .bind_from_map(data.as_object().unwrap(), Some(&upper))
            .await;
        assert_eq!(
            result.errors.get("id"),
            Some(&json!("THIS FIELD IS REQUIRED"))
        );
    }

    #[tokio::test]
    async fn test_translate_hook_applies_to_messages() {
        struct Shouting(MemorySource);

        #[async_trait::async_trait]
        impl RawSource for Shouting {
            async fn get_argument(&self, name: &str) -> Option<String> {
                self.0.get_argument(name).await
            }
            async fn get_arguments(&self, name: &str) -> Vec<String> {
                self.0.get_arguments(name).await
            }
            async fn get_query_argument(&self, name: &str) -> Option<String> {
                self.0.get_query_argument(name).await
            }
            async fn get_query_arguments(&self, name: &str) -> Vec<String> {
                self.0.get_query_arguments(name).await
            }
            async fn get_header(&self, name: &str) -> Option<String> {
                self.0.get_header(name).await
            }
            async fn get_cookie(&self, name: &str) -> Option<String> {
                self.0.get_cookie(name).await
            }
            async fn get_body(&self) -> String {
                self.0.get_body().await
            }
            async fn get_method(&self) -> String {
                self.0.get_method().await
            }
            fn translate(&self, message: &str) -> String {
                message.to_uppercase()
            }
        }

        let source = Shouting(MemorySource::new().method("GET"));
        let result = binder().bind(&source).await;
        assert_eq!(
            result.errors.get("id"),
            Some(&json!("THIS FIELD IS REQUIRED"))
        );
    }
}
