//! In-memory raw source for tests and offline binding.

use async_trait::async_trait;

use super::adapter::RawSource;

/// A [`RawSource`] holding request data in plain vectors.
///
/// Built up with chained setters; defaults to a bodyless `POST`. Repeated
/// keys are kept in insertion order, which is what the multi-value
/// accessors return.
#[derive(Debug, Default)]
pub struct MemorySource {
    method: Option<String>,
    body: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body and the `Content-Type` header to `application/json`.
    pub fn json_body(self, body: impl Into<String>) -> Self {
        self.body(body).header("Content-Type", super::MIME_JSON)
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    fn first(pairs: &[(String, String)], name: &str) -> Option<String> {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn all(pairs: &[(String, String)], name: &str) -> Vec<String> {
        pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .collect()
    }
}

#[async_trait]
impl RawSource for MemorySource {
    async fn get_argument(&self, name: &str) -> Option<String> {
        Self::first(&self.form, name)
    }

    async fn get_arguments(&self, name: &str) -> Vec<String> {
        Self::all(&self.form, name)
    }

    async fn get_query_argument(&self, name: &str) -> Option<String> {
        Self::first(&self.query, name)
    }

    async fn get_query_arguments(&self, name: &str) -> Vec<String> {
        Self::all(&self.query, name)
    }

    async fn get_header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    async fn get_cookie(&self, name: &str) -> Option<String> {
        Self::first(&self.cookies, name)
    }

    async fn get_body(&self) -> String {
        self.body.clone()
    }

    async fn get_method(&self) -> String {
        self.method.clone().unwrap_or_else(|| "POST".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_multi_value_keys_preserve_order() {
        let source = MemorySource::new()
            .form_field("tag", "a")
            .form_field("tag", "b");
        assert_eq!(source.get_argument("tag").await, Some("a".to_string()));
        assert_eq!(source.get_arguments("tag").await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_header_lookup_is_case_insensitive() {
        let source = MemorySource::new().header("X-Token", "abc");
        assert_eq!(source.get_header("x-token").await, Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_absent_key_is_none_not_empty() {
        let source = MemorySource::new();
        assert_eq!(source.get_query_argument("missing").await, None);
        assert!(source.get_query_arguments("missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_defaults() {
        let source = MemorySource::new();
        assert_eq!(source.get_method().await, "POST");
        assert_eq!(source.get_body().await, "");
    }
}
