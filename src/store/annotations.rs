//! Keypoint annotations and their derived target distances.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::geometry::{self, FrameSize};
use crate::models::{Annotation, Calibration, GarmentColor, Keypoint, SaveAnnotation, Side, TargetDistances};

// ---

const COLUMNS: &str = "id, article_id, article_style, size, side, color, name, keypoints, \
    target_distances, image_width, image_height, placement_box, calibration_id, \
    created_at, updated_at";

/// Insert or replace the annotation for `(article_style, size, side, color)`.
pub async fn upsert(
    conn: &mut PgConnection,
    article_style: &str,
    input: &SaveAnnotation,
    distances: &TargetDistances,
    calibration_id: i64,
) -> Result<Annotation, sqlx::Error> {
    // ---
    let query = format!(
        "INSERT INTO article_annotations \
            (article_id, article_style, size, side, color, name, keypoints, target_distances, \
             image_width, image_height, placement_box, calibration_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT ON CONSTRAINT uq_article_annotations_key DO UPDATE SET \
            article_id       = EXCLUDED.article_id, \
            name             = EXCLUDED.name, \
            keypoints        = EXCLUDED.keypoints, \
            target_distances = EXCLUDED.target_distances, \
            image_width      = EXCLUDED.image_width, \
            image_height     = EXCLUDED.image_height, \
            placement_box    = EXCLUDED.placement_box, \
            calibration_id   = EXCLUDED.calibration_id, \
            updated_at       = now() \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Annotation>(&query)
        .bind(input.article_id)
        .bind(article_style)
        .bind(input.size.trim())
        .bind(input.side)
        .bind(input.color)
        .bind(&input.name)
        .bind(Json(&input.keypoints))
        .bind(Json(distances))
        .bind(input.image_width)
        .bind(input.image_height)
        .bind(input.placement_box.as_ref().map(Json))
        .bind(calibration_id)
        .fetch_one(conn)
        .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Annotation>, sqlx::Error> {
    // ---
    let query = format!("SELECT {COLUMNS} FROM article_annotations WHERE id = $1");
    sqlx::query_as::<_, Annotation>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Exact key lookup; a `None` color matches only the NULL-color row.
pub async fn find_by_key(
    pool: &PgPool,
    article_style: &str,
    size: &str,
    side: Side,
    color: Option<GarmentColor>,
) -> Result<Option<Annotation>, sqlx::Error> {
    // ---
    let query = format!(
        "SELECT {COLUMNS} FROM article_annotations \
         WHERE article_style = $1 AND size = $2 AND side = $3 \
           AND color IS NOT DISTINCT FROM $4"
    );
    sqlx::query_as::<_, Annotation>(&query)
        .bind(article_style)
        .bind(size)
        .bind(side)
        .bind(color)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool, article_id: Option<i64>) -> Result<Vec<Annotation>, sqlx::Error> {
    // ---
    let query = format!(
        "SELECT {COLUMNS} FROM article_annotations \
         WHERE ($1::BIGINT IS NULL OR article_id = $1) \
         ORDER BY article_style, size, side, color NULLS FIRST"
    );
    sqlx::query_as::<_, Annotation>(&query)
        .bind(article_id)
        .fetch_all(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    // ---
    let result = sqlx::query("DELETE FROM article_annotations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct GeometryRow {
    id: i64,
    keypoints: Json<Vec<Keypoint>>,
    image_width: i32,
    image_height: i32,
}

/// Re-derive target distances for every annotation from `calibration`.
///
/// With `None` all distances are cleared. Returns the number of rows updated.
pub async fn recompute_all(
    conn: &mut PgConnection,
    calibration: Option<&Calibration>,
) -> Result<u64, sqlx::Error> {
    // ---
    let rows = sqlx::query_as::<_, GeometryRow>(
        "SELECT id, keypoints, image_width, image_height FROM article_annotations ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;

    let scale = calibration.map(|c| c.pixels_per_cm);
    let calibration_id = calibration.map(|c| c.id);

    let mut updated = 0;
    for row in rows {
        let image = FrameSize {
            width: row.image_width.max(0) as u32,
            height: row.image_height.max(0) as u32,
        };
        let computed = geometry::target_distances(&row.keypoints, image, scale);

        sqlx::query(
            "UPDATE article_annotations \
             SET target_distances = $2, calibration_id = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(row.id)
        .bind(Json(&computed.distances))
        .bind(calibration_id)
        .execute(&mut *conn)
        .await?;
        updated += 1;
    }

    tracing::debug!(updated, calibrated = calibration.is_some(), "Recomputed annotation distances");
    Ok(updated)
}
