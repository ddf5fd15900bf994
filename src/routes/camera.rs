//! Operator panel endpoints under `/api/camera`.
//!
//! Every route here sits behind the API key extractor attached by the
//! gateway.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::auth::pin_matches;
use crate::engine;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::geometry::keypoints_to_native;
use crate::models::{
    DetailedResultBatch, GarmentColor, MeasurementSystemAnnotation, OperatorSummary, PinCheck,
    ResultBatch, SessionInput, Side,
};
use crate::resolver::resolve_specs;
use crate::store::{annotations, measurements, operators, results, sessions};
use crate::Config;

// ---

const INVALID_PIN: &str = "Invalid employee ID or PIN.";

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/measurement-specs", get(measurement_specs))
        .route("/available-sizes", get(available_sizes))
        .route(
            "/measurement-results",
            get(list_results).post(save_results),
        )
        .route("/measurement-results-detailed", post(save_results_detailed))
        .route(
            "/measurement-sessions",
            get(list_sessions).post(save_session),
        )
        .route("/verify-pin", post(verify_pin))
        .route("/annotation", get(annotation))
}

#[derive(Debug, Deserialize)]
struct SpecQuery {
    article_id: i64,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleQuery {
    article_id: i64,
}

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    po_article_id: i64,
    size: Option<String>,
    side: Option<Side>,
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    po_article_id: i64,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotationQuery {
    article_style: String,
    size: String,
    side: Option<Side>,
    color: Option<GarmentColor>,
}

/// Blank query values mean "not given".
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `GET /measurement-specs?article_id&size`
async fn measurement_specs(
    State((pool, _)): State<(PgPool, Config)>,
    query: Result<Query<SpecQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Query(params) = query?;
    let size = non_blank(params.size);

    let live = measurements::list_live_for_article(&pool, params.article_id).await?;
    let sizes = measurements::live_sizes_for_article(&pool, params.article_id, size.as_deref()).await?;
    let specs = resolve_specs(&live, &sizes, size.as_deref());

    debug!(article_id = params.article_id, size = ?size, specs = specs.len(), "Resolved measurement specs");

    Ok(Json(json!({
        "success": true,
        "article_id": params.article_id,
        "size": size,
        "specs": specs,
    })))
}

/// `GET /available-sizes?article_id`
async fn available_sizes(
    State((pool, _)): State<(PgPool, Config)>,
    query: Result<Query<ArticleQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Query(params) = query?;
    let sizes = measurements::available_sizes(&pool, params.article_id).await?;

    Ok(Json(json!({
        "success": true,
        "article_id": params.article_id,
        "sizes": sizes,
    })))
}

/// `GET /measurement-results?po_article_id&size&side`
///
/// Without `side` the aggregate rows are returned.
async fn list_results(
    State((pool, _)): State<(PgPool, Config)>,
    query: Result<Query<ResultsQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Query(params) = query?;
    let size = non_blank(params.size);

    let rows = results::list(&pool, params.po_article_id, size.as_deref(), params.side).await?;

    Ok(Json(json!({
        "success": true,
        "results": rows,
    })))
}

/// `POST /measurement-results`
async fn save_results(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<ResultBatch>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Json(batch) = body?;
    info!(rows = batch.results.len(), "POST /api/camera/measurement-results");

    let count = engine::upsert_aggregate(&pool, batch.results).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Measurement results saved successfully.",
        "count": count,
    })))
}

/// `POST /measurement-results-detailed`
async fn save_results_detailed(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<DetailedResultBatch>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Json(batch) = body?;
    info!(
        purchase_order_article_id = batch.purchase_order_article_id,
        size = %batch.size,
        side = %batch.side,
        rows = batch.results.len(),
        "POST /api/camera/measurement-results-detailed"
    );

    let count = engine::replace_detailed(&pool, batch).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Detailed measurement results saved successfully.",
        "count": count,
    })))
}

/// `POST /measurement-sessions`
async fn save_session(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<SessionInput>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Json(input) = body?;

    let mut errors = FieldErrors::new();
    if input.purchase_order_article_id <= 0 {
        errors.add(
            "purchase_order_article_id",
            "The purchase order article id must be positive.",
        );
    }
    if input.size.trim().is_empty() {
        errors.add("size", "The size field is required.");
    }
    errors.into_result()?;

    let session = sessions::upsert(&pool, &input).await?;
    info!(
        session_id = session.id,
        purchase_order_article_id = session.purchase_order_article_id,
        size = %session.size,
        status = %session.status,
        "Measurement session saved"
    );

    Ok(Json(json!({
        "success": true,
        "session": session,
    })))
}

/// `GET /measurement-sessions?po_article_id&size`
async fn list_sessions(
    State((pool, _)): State<(PgPool, Config)>,
    query: Result<Query<SessionsQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Query(params) = query?;
    let size = non_blank(params.size);
    let rows = sessions::list(&pool, params.po_article_id, size.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "sessions": rows,
    })))
}

/// `POST /verify-pin`
///
/// Unknown employees and wrong PINs get the same answer.
async fn verify_pin(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<PinCheck>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Json(check) = body?;

    let mut errors = FieldErrors::new();
    if check.employee_id.trim().is_empty() {
        errors.add("employee_id", "The employee id field is required.");
    }
    if check.pin.is_empty() {
        errors.add("pin", "The pin field is required.");
    }
    errors.into_result()?;

    let employee_id = check.employee_id.trim();
    let Some(operator) = operators::find_by_employee_id(&pool, employee_id).await? else {
        warn!(employee_id, "PIN check for unknown employee");
        return Err(AppError::Unauthorized(INVALID_PIN));
    };

    if !pin_matches(&operator.login_pin, &check.pin) {
        warn!(employee_id, "PIN check failed");
        return Err(AppError::Unauthorized(INVALID_PIN));
    }

    info!(operator_id = operator.id, "Operator verified");
    Ok(Json(json!({
        "success": true,
        "message": "PIN verified.",
        "operator": OperatorSummary::from(operator),
    })))
}

/// `GET /annotation?article_style&size&side&color`
///
/// The stored annotation in measurement-system form: keypoints scaled to
/// the native camera frame.
async fn annotation(
    State((pool, config)): State<(PgPool, Config)>,
    query: Result<Query<AnnotationQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Query(params) = query?;
    let side = params.side.unwrap_or(Side::Front);

    let found = annotations::find_by_key(
        &pool,
        params.article_style.trim(),
        params.size.trim(),
        side,
        params.color,
    )
    .await?
    .ok_or(AppError::NotFound("Annotation"))?;

    let export = MeasurementSystemAnnotation {
        keypoints: keypoints_to_native(&found.keypoints, config.native),
        target_distances: found.target_distances.0,
        placement_box: found.placement_box.map(|b| b.0).unwrap_or_default(),
        image_width: config.native.width,
        image_height: config.native.height,
        annotation_date: found.updated_at,
        article_style: found.article_style,
        size: found.size,
        side: found.side,
        color: found.color,
    };

    Ok(Json(json!({
        "success": true,
        "annotation": export,
    })))
}
