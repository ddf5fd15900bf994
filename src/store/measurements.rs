//! Measurement specs (points of measure) and their per-size values.

use sqlx::{PgConnection, PgPool};

use crate::models::{Measurement, MeasurementSize, NewMeasurement};

// ---

const COLUMNS: &str = "id, article_id, code, measurement, tol_plus, tol_minus, side, deleted_at";
const SIZE_COLUMNS: &str = "id, measurement_id, size, value, unit";

/// Live measurements of an article, ordered by code.
pub async fn list_live_for_article(
    pool: &PgPool,
    article_id: i64,
) -> Result<Vec<Measurement>, sqlx::Error> {
    // ---
    let query = format!(
        "SELECT {COLUMNS} FROM measurements \
         WHERE article_id = $1 AND deleted_at IS NULL \
         ORDER BY code, id"
    );
    sqlx::query_as::<_, Measurement>(&query)
        .bind(article_id)
        .fetch_all(pool)
        .await
}

/// Live size values of an article's live measurements, optionally for one size.
pub async fn live_sizes_for_article(
    pool: &PgPool,
    article_id: i64,
    size: Option<&str>,
) -> Result<Vec<MeasurementSize>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, MeasurementSize>(
        r#"
        SELECT ms.id, ms.measurement_id, ms.size, ms.value, ms.unit
        FROM measurement_sizes ms
        JOIN measurements m ON m.id = ms.measurement_id
        WHERE m.article_id = $1
          AND m.deleted_at IS NULL
          AND ms.deleted_at IS NULL
          AND ($2::TEXT IS NULL OR ms.size = $2)
        ORDER BY ms.measurement_id
        "#,
    )
    .bind(article_id)
    .bind(size)
    .fetch_all(pool)
    .await
}

/// Distinct sizes configured for an article.
pub async fn available_sizes(pool: &PgPool, article_id: i64) -> Result<Vec<String>, sqlx::Error> {
    // ---
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT ms.size
        FROM measurement_sizes ms
        JOIN measurements m ON m.id = ms.measurement_id
        WHERE m.article_id = $1
          AND m.deleted_at IS NULL
          AND ms.deleted_at IS NULL
        ORDER BY ms.size
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
}

/// Measurements by id, soft-deleted ones included so callers can tell
/// "deleted" from "unknown".
pub async fn find_many(
    conn: &mut PgConnection,
    ids: &[i64],
) -> Result<Vec<Measurement>, sqlx::Error> {
    // ---
    let query = format!("SELECT {COLUMNS} FROM measurements WHERE id = ANY($1) ORDER BY id");
    sqlx::query_as::<_, Measurement>(&query)
        .bind(ids)
        .fetch_all(conn)
        .await
}

/// Live size values for the given measurements.
pub async fn live_sizes_for(
    conn: &mut PgConnection,
    measurement_ids: &[i64],
) -> Result<Vec<MeasurementSize>, sqlx::Error> {
    // ---
    let query = format!(
        "SELECT {SIZE_COLUMNS} FROM measurement_sizes \
         WHERE measurement_id = ANY($1) AND deleted_at IS NULL"
    );
    sqlx::query_as::<_, MeasurementSize>(&query)
        .bind(measurement_ids)
        .fetch_all(conn)
        .await
}

/// Create a measurement and its initial size values in one transaction.
pub async fn create(
    pool: &PgPool,
    input: &NewMeasurement,
) -> Result<(Measurement, Vec<MeasurementSize>), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    let query = format!(
        "INSERT INTO measurements (article_id, code, measurement, tol_plus, tol_minus, side) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {COLUMNS}"
    );
    let measurement = sqlx::query_as::<_, Measurement>(&query)
        .bind(input.article_id)
        .bind(input.code.trim())
        .bind(input.measurement.trim())
        .bind(input.tol_plus)
        .bind(input.tol_minus)
        .bind(input.side)
        .fetch_one(&mut *tx)
        .await?;

    let query = format!(
        "INSERT INTO measurement_sizes (measurement_id, size, value) \
         VALUES ($1, $2, $3) \
         RETURNING {SIZE_COLUMNS}"
    );
    let mut sizes = Vec::with_capacity(input.sizes.len());
    for (size, value) in &input.sizes {
        let row = sqlx::query_as::<_, MeasurementSize>(&query)
            .bind(measurement.id)
            .bind(size.trim())
            .bind(value)
            .fetch_one(&mut *tx)
            .await?;
        sizes.push(row);
    }

    tx.commit().await?;
    Ok((measurement, sizes))
}

/// Set the value for one size of a live measurement.
///
/// Returns `None` when the measurement is unknown or soft-deleted.
pub async fn set_size_value(
    pool: &PgPool,
    measurement_id: i64,
    size: &str,
    value: f64,
    unit: &str,
) -> Result<Option<MeasurementSize>, sqlx::Error> {
    // ---
    let query = format!(
        "INSERT INTO measurement_sizes (measurement_id, size, value, unit) \
         SELECT m.id, $2, $3, $4 FROM measurements m \
         WHERE m.id = $1 AND m.deleted_at IS NULL \
         ON CONFLICT (measurement_id, size) WHERE deleted_at IS NULL DO UPDATE SET \
            value      = EXCLUDED.value, \
            unit       = EXCLUDED.unit, \
            updated_at = now() \
         RETURNING {SIZE_COLUMNS}"
    );
    sqlx::query_as::<_, MeasurementSize>(&query)
        .bind(measurement_id)
        .bind(size)
        .bind(value)
        .bind(unit)
        .fetch_optional(pool)
        .await
}

/// Soft-delete a measurement. Existing results keep referencing it.
pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    // ---
    let result = sqlx::query(
        "UPDATE measurements SET deleted_at = now(), updated_at = now() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
