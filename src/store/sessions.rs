use sqlx::PgPool;

use crate::models::{MeasurementSession, SessionInput, SessionStatus};

// ---

const COLUMNS: &str = "id, purchase_order_article_id, size, article_style, article_id, \
    purchase_order_id, operator_id, status, front_side_complete, back_side_complete, \
    front_qc_result, back_qc_result, created_at, updated_at";

/// Insert or update the session for `(purchase_order_article_id, size)`.
pub async fn upsert(
    pool: &PgPool,
    input: &SessionInput,
) -> Result<MeasurementSession, sqlx::Error> {
    // ---
    let query = format!(
        "INSERT INTO measurement_sessions ( \
            purchase_order_article_id, size, article_style, article_id, purchase_order_id, \
            operator_id, status, front_side_complete, back_side_complete, \
            front_qc_result, back_qc_result \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT ON CONSTRAINT uq_measurement_sessions_key DO UPDATE SET \
            article_style       = EXCLUDED.article_style, \
            article_id          = EXCLUDED.article_id, \
            purchase_order_id   = EXCLUDED.purchase_order_id, \
            operator_id         = EXCLUDED.operator_id, \
            status              = EXCLUDED.status, \
            front_side_complete = EXCLUDED.front_side_complete, \
            back_side_complete  = EXCLUDED.back_side_complete, \
            front_qc_result     = EXCLUDED.front_qc_result, \
            back_qc_result      = EXCLUDED.back_qc_result, \
            updated_at          = now() \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, MeasurementSession>(&query)
        .bind(input.purchase_order_article_id)
        .bind(input.size.trim())
        .bind(&input.article_style)
        .bind(input.article_id)
        .bind(input.purchase_order_id)
        .bind(input.operator_id)
        .bind(input.status.unwrap_or(SessionStatus::InProgress))
        .bind(input.front_side_complete)
        .bind(input.back_side_complete)
        .bind(input.front_qc_result)
        .bind(input.back_qc_result)
        .fetch_one(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    purchase_order_article_id: i64,
    size: Option<&str>,
) -> Result<Vec<MeasurementSession>, sqlx::Error> {
    // ---
    let query = format!(
        "SELECT {COLUMNS} FROM measurement_sessions \
         WHERE purchase_order_article_id = $1 AND ($2::TEXT IS NULL OR size = $2) \
         ORDER BY size"
    );
    sqlx::query_as::<_, MeasurementSession>(&query)
        .bind(purchase_order_article_id)
        .bind(size)
        .fetch_all(pool)
        .await
}
