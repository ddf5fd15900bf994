//! Camera calibrations. At most one row is active; activation and deletion
//! re-derive every annotation's target distances in the same transaction.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::geometry::CalibrationFit;
use crate::models::Calibration;
use crate::store::annotations;

// ---

const COLUMNS: &str = "id, name, pixels_per_cm, reference_length_cm, pixel_distance, \
    calibration_points, is_active, created_at, updated_at";

/// Outcome of a write that changed which calibration is active.
#[derive(Debug)]
pub struct ActiveChange {
    pub calibration: Calibration,
    pub annotations_recomputed: u64,
}

pub async fn list(pool: &PgPool) -> Result<Vec<Calibration>, sqlx::Error> {
    // ---
    let query = format!("SELECT {COLUMNS} FROM camera_calibrations ORDER BY created_at DESC, id DESC");
    sqlx::query_as::<_, Calibration>(&query).fetch_all(pool).await
}

pub async fn active(conn: &mut PgConnection) -> Result<Option<Calibration>, sqlx::Error> {
    // ---
    let query = format!("SELECT {COLUMNS} FROM camera_calibrations WHERE is_active");
    sqlx::query_as::<_, Calibration>(&query)
        .fetch_optional(conn)
        .await
}

/// Insert a calibration and make it the active one.
pub async fn create_active(
    pool: &PgPool,
    name: &str,
    fit: &CalibrationFit,
    reference_length_cm: f64,
) -> Result<ActiveChange, sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    deactivate_all(&mut tx).await?;

    let query = format!(
        "INSERT INTO camera_calibrations \
            (name, pixels_per_cm, reference_length_cm, pixel_distance, calibration_points, is_active) \
         VALUES ($1, $2, $3, $4, $5, TRUE) \
         RETURNING {COLUMNS}"
    );
    let calibration = sqlx::query_as::<_, Calibration>(&query)
        .bind(name)
        .bind(fit.pixels_per_cm)
        .bind(reference_length_cm)
        .bind(fit.pixel_distance)
        .bind(Json(fit.points.to_vec()))
        .fetch_one(&mut *tx)
        .await?;

    let annotations_recomputed = annotations::recompute_all(&mut tx, Some(&calibration)).await?;

    tx.commit().await?;

    tracing::info!(
        id = calibration.id,
        pixels_per_cm = calibration.pixels_per_cm,
        annotations_recomputed,
        "Calibration created and activated"
    );
    Ok(ActiveChange {
        calibration,
        annotations_recomputed,
    })
}

/// Make `id` the single active calibration. `None` if it does not exist.
pub async fn activate(pool: &PgPool, id: i64) -> Result<Option<ActiveChange>, sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM camera_calibrations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_none() {
        return Ok(None);
    }

    deactivate_all(&mut tx).await?;

    let query = format!(
        "UPDATE camera_calibrations SET is_active = TRUE, updated_at = now() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    let calibration = sqlx::query_as::<_, Calibration>(&query)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    let annotations_recomputed = annotations::recompute_all(&mut tx, Some(&calibration)).await?;

    tx.commit().await?;

    tracing::info!(id, annotations_recomputed, "Calibration activated");
    Ok(Some(ActiveChange {
        calibration,
        annotations_recomputed,
    }))
}

/// Delete a calibration, returning the removed row.
///
/// Deleting the active calibration leaves none active and clears all
/// annotation target distances.
pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<Calibration>, sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    let query = format!("DELETE FROM camera_calibrations WHERE id = $1 RETURNING {COLUMNS}");
    let deleted = sqlx::query_as::<_, Calibration>(&query)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    if let Some(calibration) = &deleted {
        if calibration.is_active {
            let cleared = annotations::recompute_all(&mut tx, None).await?;
            tracing::warn!(
                id,
                annotations_cleared = cleared,
                "Active calibration deleted; no calibration is active"
            );
        }
    }

    tx.commit().await?;
    Ok(deleted)
}

async fn deactivate_all(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        "UPDATE camera_calibrations SET is_active = FALSE, updated_at = now() WHERE is_active",
    )
    .execute(conn)
    .await?;
    Ok(())
}
