//! The `measurement_results` table. Aggregate rows have `side = NULL`,
//! per-side rows carry `front` / `back`; both go through [`upsert_row`].

use sqlx::{PgConnection, PgPool};

use crate::models::{MeasurementResult, ResultStatus, Side};

// ---

const COLUMNS: &str = "id, purchase_order_article_id, measurement_id, size, side, article_style, \
    measured_value, expected_value, tol_plus, tol_minus, status, operator_id, \
    created_at, updated_at";

/// A fully reconciled result ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    // ---
    pub purchase_order_article_id: i64,
    pub measurement_id: i64,
    pub size: String,
    pub side: Option<Side>,
    pub article_style: Option<String>,
    pub measured_value: Option<f64>,
    pub expected_value: Option<f64>,
    pub tol_plus: Option<f64>,
    pub tol_minus: Option<f64>,
    pub status: ResultStatus,
    pub operator_id: Option<i64>,
}

/// Insert or update the row keyed by (po article, measurement, size, side).
pub async fn upsert_row(conn: &mut PgConnection, row: &ResultRow) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO measurement_results (
            purchase_order_article_id, measurement_id, size, side, article_style,
            measured_value, expected_value, tol_plus, tol_minus, status, operator_id
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT ON CONSTRAINT uq_measurement_results_key DO UPDATE SET
            article_style  = EXCLUDED.article_style,
            measured_value = EXCLUDED.measured_value,
            expected_value = EXCLUDED.expected_value,
            tol_plus       = EXCLUDED.tol_plus,
            tol_minus      = EXCLUDED.tol_minus,
            status         = EXCLUDED.status,
            operator_id    = EXCLUDED.operator_id,
            updated_at     = now()
        "#,
    )
    .bind(row.purchase_order_article_id)
    .bind(row.measurement_id)
    .bind(&row.size)
    .bind(row.side)
    .bind(&row.article_style)
    .bind(row.measured_value)
    .bind(row.expected_value)
    .bind(row.tol_plus)
    .bind(row.tol_minus)
    .bind(row.status)
    .bind(row.operator_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Remove every per-side row for one (po article, size, side) key.
pub async fn delete_side(
    conn: &mut PgConnection,
    purchase_order_article_id: i64,
    size: &str,
    side: Side,
) -> Result<u64, sqlx::Error> {
    // ---
    let result = sqlx::query(
        "DELETE FROM measurement_results \
         WHERE purchase_order_article_id = $1 AND size = $2 AND side = $3",
    )
    .bind(purchase_order_article_id)
    .bind(size)
    .bind(side)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Results for a purchase-order article.
///
/// `side = None` selects the aggregate rows; a side selects that side's rows.
pub async fn list(
    pool: &PgPool,
    purchase_order_article_id: i64,
    size: Option<&str>,
    side: Option<Side>,
) -> Result<Vec<MeasurementResult>, sqlx::Error> {
    // ---
    let query = format!(
        "SELECT {COLUMNS} FROM measurement_results \
         WHERE purchase_order_article_id = $1 \
           AND ($2::TEXT IS NULL OR size = $2) \
           AND side IS NOT DISTINCT FROM $3::TEXT \
         ORDER BY measurement_id, size"
    );
    sqlx::query_as::<_, MeasurementResult>(&query)
        .bind(purchase_order_article_id)
        .bind(size)
        .bind(side)
        .fetch_all(pool)
        .await
}
