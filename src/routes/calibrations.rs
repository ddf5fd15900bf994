//! Admin calibration endpoints under `/admin/calibrations`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::geometry::fit_calibration;
use crate::models::NewCalibration;
use crate::store::calibrations;
use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/calibrations", get(list).post(create))
        .route("/calibrations/active", get(active))
        .route("/calibrations/{id}", axum::routing::delete(remove))
        .route("/calibrations/{id}/activate", post(activate))
}

async fn list(State((pool, _)): State<(PgPool, Config)>) -> AppResult<Json<Value>> {
    // ---
    let rows = calibrations::list(&pool).await?;
    Ok(Json(json!({ "success": true, "calibrations": rows })))
}

/// The active calibration, or `null` when the camera is not calibrated.
async fn active(State((pool, _)): State<(PgPool, Config)>) -> AppResult<Json<Value>> {
    // ---
    let mut conn = pool.acquire().await?;
    let calibration = calibrations::active(&mut conn).await?;
    Ok(Json(json!({ "success": true, "calibration": calibration })))
}

/// `POST /calibrations`: derive the scale from two wizard points and make
/// the new calibration active.
async fn create(
    State((pool, config)): State<(PgPool, Config)>,
    body: Result<Json<NewCalibration>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    // ---
    let Json(input) = body?;

    let fit = fit_calibration(
        &input.calibration_points,
        config.capture,
        input.reference_length_cm,
    )
    .map_err(AppError::Validation)?;

    let name = input
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Calibration {}", Utc::now().format("%Y-%m-%d %H:%M:%S")));

    let change = calibrations::create_active(&pool, &name, &fit, input.reference_length_cm).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Calibration saved and activated.",
            "calibration": change.calibration,
            "annotations_recomputed": change.annotations_recomputed,
        })),
    ))
}

async fn activate(
    State((pool, _)): State<(PgPool, Config)>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    let change = calibrations::activate(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Calibration"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Calibration activated.",
        "calibration": change.calibration,
        "annotations_recomputed": change.annotations_recomputed,
    })))
}

async fn remove(
    State((pool, _)): State<(PgPool, Config)>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    let deleted = calibrations::delete(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Calibration"))?;

    let message = if deleted.is_active {
        "Active calibration deleted. No calibration is active."
    } else {
        "Calibration deleted."
    };
    Ok(Json(json!({ "success": true, "message": message })))
}
