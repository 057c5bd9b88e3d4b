//! Custom validators.
//!
//! Validators run after kind coercion, in declaration order, against the
//! coerced value. A validator can fail two ways: returning `Ok(false)` sets
//! the field's generic `Invalid` message, returning `Err(ValidationError)`
//! sets the validator's own message. The first failure stops the chain.
//!
//! Validators may be asynchronous (e.g. a remote lookup); synchronous checks
//! wrap a plain closure via [`validator_fn`].

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// A validation failure carrying its own message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A single check over a coerced value.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Returns `Ok(true)` to pass, `Ok(false)` to fail with the field's
    /// generic message, or `Err` to fail with a specific message.
    async fn check(&self, value: &Value) -> Result<bool, ValidationError>;
}

/// Membership check against a fixed set of choices.
pub struct OneOf {
    choices: Vec<Value>,
    error: String,
}

impl OneOf {
    pub fn new(choices: impl Into<Vec<Value>>) -> Self {
        Self {
            choices: choices.into(),
            error: "Invalid option value".to_string(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }
}

#[async_trait]
impl Validator for OneOf {
    async fn check(&self, value: &Value) -> Result<bool, ValidationError> {
        if value.is_null() || !self.choices.contains(value) {
            return Err(ValidationError::new(self.error.clone()));
        }
        Ok(true)
    }
}

/// Regex match over the string form of the coerced value.
pub struct Pattern {
    regex: Regex,
    error: String,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            error: "Invalid character".to_string(),
        })
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }
}

#[async_trait]
impl Validator for Pattern {
    async fn check(&self, value: &Value) -> Result<bool, ValidationError> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(ValidationError::new(self.error.clone())),
        };
        if self.regex.is_match(&text) {
            Ok(true)
        } else {
            Err(ValidationError::new(self.error.clone()))
        }
    }
}

/// Email address check.
pub fn email() -> Pattern {
    Pattern::new(r"^\w+([-+.]\w+)*@\w+([-.]\w+)*\.\w+([-.]\w+)*$")
        .expect("built-in pattern")
        .with_error("Not a valid email address")
}

/// Username check: a letter followed by letters, digits or underscores.
pub fn username() -> Pattern {
    Pattern::new(r"^[a-zA-Z][a-zA-Z0-9_]*$")
        .expect("built-in pattern")
        .with_error("The username string entered is invalid")
}

struct FnValidator<F>(F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Result<bool, ValidationError> + Send + Sync,
{
    async fn check(&self, value: &Value) -> Result<bool, ValidationError> {
        (self.0)(value)
    }
}

/// Wraps a synchronous closure as a [`Validator`].
pub fn validator_fn<F>(f: F) -> Arc<dyn Validator>
where
    F: Fn(&Value) -> Result<bool, ValidationError> + Send + Sync + 'static,
{
    Arc::new(FnValidator(f))
}
