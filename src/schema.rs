//! Schema definition and orchestration.
//!
//! A [`SchemaSpec`] is an ordered collection of named field specs, built once
//! through [`SchemaBuilder`] and shared read-only across requests (wrap it in
//! an `Arc`). Fields are registered explicitly in declaration order; there is
//! no reflection-based harvesting, and cross-field references (conditional
//! requirements, date-range start fields) are resolved and checked when the
//! schema is built, not when a request arrives.
//!
//! Binding evaluates every field concurrently and aggregates outcomes in
//! declaration order, so the error report is deterministic no matter which
//! field's validator finishes first, and a failure in one field never blocks
//! its siblings.

use futures_util::future;
use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::SchemaBuildError;
use crate::field::{FieldKind, FieldSpec, TranslateFn};
use crate::value::{BindResult, RawValue, RawValueMap};

/// Ordered, immutable collection of named field specs.
#[derive(Debug)]
pub struct SchemaSpec {
    fields: IndexMap<String, FieldSpec>,
}

/// Explicit, ordered schema construction.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldSpec)>,
}

impl SchemaBuilder {
    /// Registers a field under `name`; declaration order is preserved.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Validates cross-field references and freezes the schema.
    ///
    /// # Errors
    ///
    /// Fails on duplicate field names and on `conditional`/date-range
    /// references to undeclared siblings. These are programming errors and
    /// surface here, never at bind time.
    pub fn build(self) -> Result<SchemaSpec, SchemaBuildError> {
        let mut wire_keys: IndexMap<String, String> = IndexMap::new();
        for (name, spec) in &self.fields {
            if wire_keys.contains_key(name) {
                return Err(SchemaBuildError::DuplicateField(name.clone()));
            }
            let wire = spec
                .wire_key
                .clone()
                .unwrap_or_else(|| name.clone());
            wire_keys.insert(name.clone(), wire);
        }

        // Sibling references are declared by field name but read from the
        // raw map at bind time, so rewrite them to the target's wire key.
        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (name, mut spec) in self.fields {
            if spec.wire_key.is_none() {
                spec.wire_key = Some(name.clone());
            }
            if let Some(cond) = &mut spec.conditional {
                match wire_keys.get(&cond.on_field) {
                    Some(wire) => cond.on_field = wire.clone(),
                    None => {
                        return Err(SchemaBuildError::UnknownSibling {
                            field: name,
                            target: cond.on_field.clone(),
                        })
                    }
                }
            }
            if let FieldKind::DateRange { start_field, .. } = &mut spec.kind {
                match wire_keys.get(start_field) {
                    Some(wire) => *start_field = wire.clone(),
                    None => {
                        return Err(SchemaBuildError::UnknownSibling {
                            field: name,
                            target: start_field.clone(),
                        })
                    }
                }
            }
            fields.insert(name, spec);
        }

        Ok(SchemaSpec { fields })
    }
}

impl SchemaSpec {
    /// Starts an empty schema definition.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a raw value map from a decoded JSON object, keyed by wire key.
    ///
    /// Used by the JSON body location and by nested-field recursion; absent
    /// keys stay distinct from empty strings.
    pub fn raw_map_from_object(&self, object: &serde_json::Map<String, Value>) -> RawValueMap {
        let mut raw = RawValueMap::with_capacity(self.fields.len());
        for spec in self.fields.values() {
            let value = match object.get(spec.wire_name()) {
                Some(v) => RawValue::Json(v.clone()),
                None => RawValue::Null,
            };
            raw.insert(spec.wire_name().to_string(), value);
        }
        raw
    }

    /// Validates one raw value map against every field.
    ///
    /// Fields run concurrently; `data` (keyed by field name) and `errors`
    /// (keyed by wire key) are aggregated in declaration order. Failing
    /// fields contribute to `errors` only.
    pub async fn bind(&self, raw: &RawValueMap, translate: Option<&TranslateFn<'_>>) -> BindResult {
        let outcomes = future::join_all(self.fields.iter().map(|(name, spec)| {
            let value = raw.get(spec.wire_name()).cloned().unwrap_or_default();
            async move {
                let outcome = spec.validate(&value, raw, translate).await;
                (name.as_str(), spec, outcome)
            }
        }))
        .await;

        let mut result = BindResult::default();
        for (name, spec, outcome) in outcomes {
            if outcome.is_valid() {
                result
                    .data
                    .insert(name.to_string(), outcome.value.unwrap_or(Value::Null));
            } else {
                result.errors.insert(
                    spec.wire_name().to_string(),
                    outcome.message.unwrap_or(Value::Null),
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ElementKind, Length, Predicate};
    use serde_json::json;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn user_schema() -> SchemaSpec {
        SchemaSpec::builder()
            .field("id", FieldSpec::integer().required(true).min(1.0))
            .field(
                "name",
                FieldSpec::text().required(true).length(Length::Between(3, 20)),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_bind_collects_typed_data() {
        let schema = user_schema();
        let mut raw = RawValueMap::new();
        raw.insert("id".into(), text("2"));
        raw.insert("name".into(), text("aiohttp"));

        let result = schema.bind(&raw, None).await;
        assert!(result.is_ok());
        assert_eq!(result.data.get("id"), Some(&json!(2)));
        assert_eq!(result.data.get("name"), Some(&json!("aiohttp")));
    }

    #[tokio::test]
    async fn test_bind_reports_all_errors_in_one_pass() {
        let schema = user_schema();
        let mut raw = RawValueMap::new();
        raw.insert("id".into(), text("0"));
        raw.insert("name".into(), text("ab"));

        let result = schema.bind(&raw, None).await;
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors.get("id"), Some(&json!("The minimum value is 1")));
        assert_eq!(
            result.errors.get("name"),
            Some(&json!("Length must be between 3 and 20"))
        );
        // failing fields are excluded from data
        assert!(!result.data.contains_key("id"));
        assert!(!result.data.contains_key("name"));
    }

    #[tokio::test]
    async fn test_error_order_follows_declaration_order() {
        let schema = SchemaSpec::builder()
            .field("z", FieldSpec::integer().required(true))
            .field("a", FieldSpec::integer().required(true))
            .field("m", FieldSpec::integer().required(true))
            .build()
            .unwrap();

        let result = schema.bind(&RawValueMap::new(), None).await;
        let keys: Vec<&String> = result.errors.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn test_wire_key_used_for_lookup_and_errors() {
        let schema = SchemaSpec::builder()
            .field(
                "query",
                FieldSpec::text().required(true).wire_key("q"),
            )
            .build()
            .unwrap();

        let mut raw = RawValueMap::new();
        raw.insert("q".into(), text("rust"));
        let result = schema.bind(&raw, None).await;
        assert_eq!(result.data.get("query"), Some(&json!("rust")));

        let result = schema.bind(&RawValueMap::new(), None).await;
        assert!(result.errors.contains_key("q"));
    }

    #[test]
    fn test_duplicate_field_rejected_at_build() {
        let result = SchemaSpec::builder()
            .field("id", FieldSpec::integer())
            .field("id", FieldSpec::text())
            .build();
        assert!(matches!(result, Err(SchemaBuildError::DuplicateField(_))));
    }

    #[test]
    fn test_unknown_conditional_sibling_rejected_at_build() {
        let result = SchemaSpec::builder()
            .field(
                "b",
                FieldSpec::text().required_when("missing", Predicate::Equals("x".into())),
            )
            .build();
        assert!(matches!(
            result,
            Err(SchemaBuildError::UnknownSibling { .. })
        ));
    }

    #[test]
    fn test_unknown_date_range_start_rejected_at_build() {
        let result = SchemaSpec::builder()
            .field("etime", FieldSpec::date_range("%Y-%m-%d", "stime"))
            .build();
        assert!(matches!(
            result,
            Err(SchemaBuildError::UnknownSibling { .. })
        ));
    }

    #[tokio::test]
    async fn test_conditional_reads_sibling_wire_key() {
        // sibling declared under a different wire key; the predicate must
        // follow the rename
        let schema = SchemaSpec::builder()
            .field("mode", FieldSpec::text().wire_key("m"))
            .field(
                "detail",
                FieldSpec::text().required_when("mode", Predicate::Equals("full".into())),
            )
            .build()
            .unwrap();

        let mut raw = RawValueMap::new();
        raw.insert("m".into(), text("full"));
        let result = schema.bind(&raw, None).await;
        assert!(result.errors.contains_key("detail"));
    }

    #[tokio::test]
    async fn test_list_field_binds_all_values() {
        let schema = SchemaSpec::builder()
            .field("roles", FieldSpec::list(ElementKind::Int).required(true))
            .build()
            .unwrap();

        let mut raw = RawValueMap::new();
        raw.insert("roles".into(), RawValue::List(vec![text("1"), text("2")]));
        let result = schema.bind(&raw, None).await;
        assert_eq!(result.data.get("roles"), Some(&json!([1, 2])));
    }
}
