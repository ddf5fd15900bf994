//! Admin endpoints for measurement specs under `/admin/measurements`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{NewMeasurement, SizeValue};
use crate::store::{articles, measurements};
use crate::Config;

// ---

const DEFAULT_UNIT: &str = "cm";

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/measurements", post(create))
        .route("/measurements/{id}", axum::routing::delete(remove))
        .route("/measurements/{id}/sizes/{size}", put(set_size))
}

fn validate(input: &NewMeasurement) -> AppResult<()> {
    // ---
    let mut errors = FieldErrors::new();

    if input.article_id <= 0 {
        errors.add("article_id", "The article id must be positive.");
    }
    if input.code.trim().is_empty() {
        errors.add("code", "The code field is required.");
    }
    if input.measurement.trim().is_empty() {
        errors.add("measurement", "The measurement field is required.");
    }
    for (field, tol) in [("tol_plus", input.tol_plus), ("tol_minus", input.tol_minus)] {
        if tol.is_some_and(|t| !t.is_finite()) {
            errors.add(field, "The tolerance must be a number.");
        }
    }
    for (size, value) in &input.sizes {
        if size.trim().is_empty() {
            errors.add("sizes", "Size names must not be blank.");
        }
        if !value.is_finite() {
            errors.add(format!("sizes.{size}"), "The size value must be a number.");
        }
    }

    errors.into_result()
}

async fn create(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<NewMeasurement>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    // ---
    let Json(input) = body?;
    validate(&input)?;

    let mut conn = pool.acquire().await?;
    if articles::find_style(&mut conn, input.article_id).await?.is_none() {
        return Err(AppError::NotFound("Article"));
    }
    drop(conn);

    let (measurement, sizes) = measurements::create(&pool, &input).await?;
    tracing::info!(
        id = measurement.id,
        article_id = measurement.article_id,
        code = %measurement.code,
        sizes = sizes.len(),
        "Measurement created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "measurement": measurement,
            "sizes": sizes,
        })),
    ))
}

/// `PUT /measurements/{id}/sizes/{size}`: set the expected value for one size.
async fn set_size(
    State((pool, _)): State<(PgPool, Config)>,
    path: Result<Path<(i64, String)>, PathRejection>,
    body: Result<Json<SizeValue>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path((id, size)) = path?;
    let Json(input) = body?;

    let size = size.trim();
    let mut errors = FieldErrors::new();
    if size.is_empty() {
        errors.add("size", "The size field is required.");
    }
    if !input.value.is_finite() {
        errors.add("value", "The value must be a number.");
    }
    errors.into_result()?;

    let unit = input
        .unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_UNIT);

    let row = measurements::set_size_value(&pool, id, size, input.value, unit)
        .await?
        .ok_or(AppError::NotFound("Measurement"))?;

    Ok(Json(json!({ "success": true, "size": row })))
}

/// Soft delete. Results that reference the measurement are kept.
async fn remove(
    State((pool, _)): State<(PgPool, Config)>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    if !measurements::soft_delete(&pool, id).await? {
        return Err(AppError::NotFound("Measurement"));
    }
    tracing::info!(id, "Measurement soft-deleted");
    Ok(Json(json!({ "success": true, "message": "Measurement deleted." })))
}
