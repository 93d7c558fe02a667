//! Request body validation
//!
//! Request structs keep every field optional so that all problems can be
//! reported at once. [`ValidatedJson`] deserializes the body, runs
//! [`Validate`] and rejects with a `VALIDATION_ERROR` listing each field.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult, FieldError};

/// Accumulates field errors for one request
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    /// Field must be present and not blank
    pub fn require_text(&mut self, field: &str, value: Option<&str>) {
        match value {
            None => self.add(field, "is required"),
            Some(v) if v.trim().is_empty() => self.add(field, "must not be empty"),
            Some(_) => {}
        }
    }

    /// Field may be absent, but not blank when given
    pub fn reject_blank(&mut self, field: &str, value: Option<&str>) {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            self.add(field, "must not be empty");
        }
    }

    pub fn require<T>(&mut self, field: &str, value: &Option<T>) {
        if value.is_none() {
            self.add(field, "is required");
        }
    }

    /// Email must look like `local@domain` when given
    pub fn check_email(&mut self, field: &str, value: Option<&str>) {
        if let Some(email) = value.filter(|v| !v.trim().is_empty()) {
            if !is_plausible_email(email) {
                self.add(field, "must be a valid email address");
            }
        }
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.0))
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Field-level checks for a request body
pub trait Validate {
    fn validate(&self, errors: &mut FieldErrors);
}

/// JSON body that has passed [`Validate`]
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let parsed = parse_body::<T>(value)?;
        Ok(ValidatedJson(parsed))
    }
}

/// Deserialize and validate an already-parsed JSON body
pub fn parse_body<T: DeserializeOwned + Validate>(value: Value) -> ApiResult<T> {
    if !value.is_object() {
        return Err(ApiError::Validation {
            message: "Request body must be a JSON object".to_string(),
            fields: Vec::new(),
        });
    }

    let parsed: T = serde_json::from_value(value).map_err(|e| ApiError::Validation {
        message: format!("Invalid request body: {}", e),
        fields: Vec::new(),
    })?;

    let mut errors = FieldErrors::new();
    parsed.validate(&mut errors);
    errors.finish()?;
    Ok(parsed)
}
