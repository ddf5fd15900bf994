//! Admin annotation endpoints under `/admin/annotations`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::geometry::{self, FrameSize};
use crate::models::SaveAnnotation;
use crate::store::{annotations, articles, calibrations};
use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/annotations", get(list).post(save))
        .route("/annotations/{id}", get(show).delete(remove))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    article_id: Option<i64>,
}

fn validate(input: &SaveAnnotation) -> AppResult<()> {
    // ---
    let mut errors = FieldErrors::new();

    if input.article_id <= 0 {
        errors.add("article_id", "The article id must be positive.");
    }
    if input.size.trim().is_empty() {
        errors.add("size", "The size field is required.");
    }
    if input.image_width <= 0 {
        errors.add("image_width", "The image width must be positive.");
    }
    if input.image_height <= 0 {
        errors.add("image_height", "The image height must be positive.");
    }
    for (i, kp) in input.keypoints.iter().enumerate() {
        if !geometry::is_percentage(kp.x) || !geometry::is_percentage(kp.y) {
            errors.add(
                format!("keypoints.{i}"),
                "Keypoint coordinates must be percentages between 0 and 100.",
            );
        }
    }
    if let Some(placement) = &input.placement_box {
        if placement.len() != 4 || !placement.iter().all(|v| v.is_finite()) {
            errors.add(
                "placement_box",
                "The placement box must contain four numbers.",
            );
        }
    }

    errors.into_result()
}

async fn list(
    State((pool, _)): State<(PgPool, Config)>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Query(params) = query?;
    let rows = annotations::list(&pool, params.article_id).await?;
    Ok(Json(json!({ "success": true, "annotations": rows })))
}

/// `POST /annotations`: create or replace the annotation for its key and
/// derive target distances from the active calibration.
async fn save(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<SaveAnnotation>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Json(input) = body?;
    validate(&input)?;

    let mut tx = pool.begin().await?;

    let article_style = articles::find_style(&mut tx, input.article_id)
        .await?
        .ok_or(AppError::NotFound("Article"))?;

    let calibration = calibrations::active(&mut tx)
        .await?
        .ok_or(AppError::NotCalibrated)?;

    let image = FrameSize {
        width: input.image_width as u32,
        height: input.image_height as u32,
    };
    let computed =
        geometry::target_distances(&input.keypoints, image, Some(calibration.pixels_per_cm));

    if computed.unpaired_trailing_point {
        tracing::warn!(
            article_style = %article_style,
            size = %input.size,
            keypoints = input.keypoints.len(),
            "Odd keypoint count; last keypoint has no pair"
        );
    }

    let saved = annotations::upsert(
        &mut tx,
        &article_style,
        &input,
        &computed.distances,
        calibration.id,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        id = saved.id,
        article_style = %saved.article_style,
        size = %saved.size,
        side = %saved.side,
        pairs = computed.distances.len(),
        "Annotation saved"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Annotation saved.",
        "annotation": saved,
        "unpaired_keypoint": computed.unpaired_trailing_point,
    })))
}

async fn show(
    State((pool, _)): State<(PgPool, Config)>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    let found = annotations::find(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Annotation"))?;
    Ok(Json(json!({ "success": true, "annotation": found })))
}

async fn remove(
    State((pool, _)): State<(PgPool, Config)>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    if !annotations::delete(&pool, id).await? {
        return Err(AppError::NotFound("Annotation"));
    }
    Ok(Json(json!({ "success": true, "message": "Annotation deleted." })))
}
