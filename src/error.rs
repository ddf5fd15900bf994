//! Application error type and its HTTP mapping.
//!
//! Every failure leaves the service as `{"success": false, "message": ...}`.
//! Database detail is logged, never returned.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

// ---

/// Per-field validation messages, keyed by request field path
/// (e.g. `results.2.measurement_id`).
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed request fields.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// The request body or query string could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials. The message is shown verbatim.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A target distance was requested without an active calibration.
    #[error("no active camera calibration")]
    NotCalibrated,

    /// A batch of result rows could not be written and was rolled back.
    #[error("result batch write failed: {0}")]
    BatchWrite(#[source] sqlx::Error),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, body) = match &self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "success": false,
                    "message": "The given data was invalid.",
                    "errors": errors,
                }),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": msg }),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": msg }),
            ),
            AppError::NotFound(entity) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": format!("{entity} not found.") }),
            ),
            AppError::NotCalibrated => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "success": false,
                    "message": "No active camera calibration found. Calibrate the camera first.",
                }),
            ),
            AppError::BatchWrite(err) => {
                tracing::error!(error = %err, "Result batch rolled back");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "message": "Failed to save measurement results.",
                        "count": 0,
                    }),
                )
            }
            AppError::Database(err) => classify_sqlx_error(err),
        };

        (status, Json(body)).into_response()
    }
}

/// Map a sqlx error onto a status and a sanitized body.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations (`23505`) map to 409 naming the constraint.
/// - Everything else maps to 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, serde_json::Value) {
    // ---
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            json!({ "success": false, "message": "Resource not found." }),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            tracing::warn!(constraint, "Unique constraint violation");
            (
                StatusCode::CONFLICT,
                json!({
                    "success": false,
                    "message": format!("Duplicate value violates unique constraint: {constraint}"),
                }),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "message": "An internal error occurred." }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_field_errors_accumulate_per_field() {
        // ---
        let mut errors = FieldErrors::new();
        errors.add("size", "The size field is required.");
        errors.add("results.0.measurement_id", "must be positive");
        errors.add("size", "must not be blank");

        assert_eq!(errors.get("size").map(|m| m.len()), Some(2));
        assert!(errors.get("side").is_none());
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_empty_field_errors_pass() {
        // ---
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_status_codes() {
        // ---
        let cases = [
            (AppError::Validation(FieldErrors::new()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("Invalid or missing API key."), StatusCode::UNAUTHORIZED),
            (AppError::NotFound("Calibration"), StatusCode::NOT_FOUND),
            (AppError::NotCalibrated, StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::BatchWrite(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Database(sqlx::Error::RowNotFound), StatusCode::NOT_FOUND),
            (AppError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
