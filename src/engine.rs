//! Result upsert engine.
//!
//! Both submission modes are projections onto one canonical row writer:
//!
//! - **aggregate**: rows keyed by `(po article, measurement, size)` with no
//!   side, inserted or updated in submission order so a later duplicate key
//!   wins.
//! - **detailed**: every row of one `(po article, size, side)` is deleted
//!   and the submitted list takes its place.
//!
//! Each batch runs in a single transaction. Expected values and tolerances
//! are reconciled against the resolved measurement spec and the status is
//! always computed here, never trusted from the caller.

use std::collections::{BTreeSet, HashMap};

use sqlx::PgPool;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    DetailedResultBatch, DetailedResultInput, Measurement, ResolvedSpec, ResultInput,
    ResultStatus, Side,
};
use crate::resolver::resolve_specs;
use crate::store::measurements;
use crate::store::results::{self, ResultRow};

// ---

/// A submitted row normalized to the canonical key, before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
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
    pub status: Option<ResultStatus>,
    pub operator_id: Option<i64>,
}

impl From<ResultInput> for Submitted {
    fn from(input: ResultInput) -> Self {
        Submitted {
            purchase_order_article_id: input.purchase_order_article_id,
            measurement_id: input.measurement_id,
            size: input.size.trim().to_string(),
            side: None,
            article_style: input.article_style,
            measured_value: input.measured_value,
            expected_value: input.expected_value,
            tol_plus: input.tol_plus,
            tol_minus: input.tol_minus,
            status: input.status,
            operator_id: input.operator_id,
        }
    }
}

impl Submitted {
    fn detailed(purchase_order_article_id: i64, size: &str, side: Side, input: DetailedResultInput) -> Self {
        Submitted {
            purchase_order_article_id,
            measurement_id: input.measurement_id,
            size: size.trim().to_string(),
            side: Some(side),
            article_style: input.article_style,
            measured_value: input.measured_value,
            expected_value: input.expected_value,
            tol_plus: input.tol_plus,
            tol_minus: input.tol_minus,
            status: input.status,
            operator_id: input.operator_id,
        }
    }
}

/// Merge a submitted row with its resolved spec and compute the status.
///
/// Expected value and tolerances come from the spec when it has them; the
/// caller's values fill only the gaps.
pub fn reconcile(submitted: Submitted, spec: Option<&ResolvedSpec>) -> ResultRow {
    // ---
    let expected_value = spec
        .and_then(|s| s.expected_value)
        .or(submitted.expected_value);
    let tol_plus = spec.and_then(|s| s.tol_plus).or(submitted.tol_plus);
    let tol_minus = spec.and_then(|s| s.tol_minus).or(submitted.tol_minus);

    let status = ResultStatus::evaluate(submitted.measured_value, expected_value, tol_plus, tol_minus);

    if let Some(claimed) = submitted.status {
        if claimed != status {
            tracing::warn!(
                measurement_id = submitted.measurement_id,
                size = %submitted.size,
                claimed = %claimed,
                computed = %status,
                "Submitted status overridden"
            );
        }
    }

    ResultRow {
        purchase_order_article_id: submitted.purchase_order_article_id,
        measurement_id: submitted.measurement_id,
        size: submitted.size,
        side: submitted.side,
        article_style: submitted.article_style,
        measured_value: submitted.measured_value,
        expected_value,
        tol_plus,
        tol_minus,
        status,
        operator_id: submitted.operator_id,
    }
}

/// Field-level checks for an aggregate batch.
pub fn validate_batch(rows: &[ResultInput]) -> AppResult<()> {
    // ---
    let mut errors = FieldErrors::new();

    if rows.is_empty() {
        errors.add("results", "The results field must contain at least one row.");
    }
    for (i, row) in rows.iter().enumerate() {
        if row.purchase_order_article_id <= 0 {
            errors.add(
                format!("results.{i}.purchase_order_article_id"),
                "The purchase order article id must be positive.",
            );
        }
        check_row(&mut errors, i, row.measurement_id, row.measured_value);
        if row.size.trim().is_empty() {
            errors.add(format!("results.{i}.size"), "The size field is required.");
        }
    }

    errors.into_result()
}

/// Field-level checks for a per-side batch.
pub fn validate_detailed(batch: &DetailedResultBatch) -> AppResult<()> {
    // ---
    let mut errors = FieldErrors::new();

    if batch.purchase_order_article_id <= 0 {
        errors.add(
            "purchase_order_article_id",
            "The purchase order article id must be positive.",
        );
    }
    if batch.size.trim().is_empty() {
        errors.add("size", "The size field is required.");
    }
    if batch.results.is_empty() {
        errors.add("results", "The results field must contain at least one row.");
    }
    for (i, row) in batch.results.iter().enumerate() {
        check_row(&mut errors, i, row.measurement_id, row.measured_value);
    }

    errors.into_result()
}

fn check_row(errors: &mut FieldErrors, i: usize, measurement_id: i64, measured: Option<f64>) {
    // ---
    if measurement_id <= 0 {
        errors.add(
            format!("results.{i}.measurement_id"),
            "The measurement id must be positive.",
        );
    }
    if measured.is_some_and(|v| !v.is_finite()) {
        errors.add(
            format!("results.{i}.measured_value"),
            "The measured value must be a number.",
        );
    }
}

/// Insert or update an aggregate batch. Returns the number of rows submitted.
pub async fn upsert_aggregate(pool: &PgPool, rows: Vec<ResultInput>) -> AppResult<usize> {
    // ---
    validate_batch(&rows)?;
    let submitted = rows.into_iter().map(Submitted::from).collect();
    write_batch(pool, submitted, None).await
}

/// Replace every row of one `(po article, size, side)` with the batch.
pub async fn replace_detailed(pool: &PgPool, batch: DetailedResultBatch) -> AppResult<usize> {
    // ---
    validate_detailed(&batch)?;

    let DetailedResultBatch {
        purchase_order_article_id,
        size,
        side,
        results,
    } = batch;
    let size = size.trim().to_string();

    let submitted = results
        .into_iter()
        .map(|row| Submitted::detailed(purchase_order_article_id, &size, side, row))
        .collect();
    write_batch(pool, submitted, Some((purchase_order_article_id, size.as_str(), side))).await
}

/// The shared write path. `replace` names the per-side key to clear first.
async fn write_batch(
    pool: &PgPool,
    rows: Vec<Submitted>,
    replace: Option<(i64, &str, Side)>,
) -> AppResult<usize> {
    // ---
    let ids: Vec<i64> = rows
        .iter()
        .map(|r| r.measurement_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tx = pool.begin().await.map_err(AppError::BatchWrite)?;

    let known = measurements::find_many(&mut tx, &ids)
        .await
        .map_err(AppError::BatchWrite)?;
    check_references(&rows, &known)?;

    let sizes = measurements::live_sizes_for(&mut tx, &ids)
        .await
        .map_err(AppError::BatchWrite)?;

    let mut specs: HashMap<(i64, &str), ResolvedSpec> = HashMap::new();
    let distinct_sizes: BTreeSet<&str> = rows.iter().map(|r| r.size.as_str()).collect();
    for size in distinct_sizes {
        for spec in resolve_specs(&known, &sizes, Some(size)) {
            specs.insert((spec.measurement_id, size), spec);
        }
    }

    if let Some((purchase_order_article_id, size, side)) = replace {
        let removed = results::delete_side(&mut tx, purchase_order_article_id, size, side)
            .await
            .map_err(AppError::BatchWrite)?;
        tracing::debug!(purchase_order_article_id, size, %side, removed, "Cleared side results");
    }

    let count = rows.len();
    let mut statuses = [0usize; 3];
    for submitted in &rows {
        let spec = specs.get(&(submitted.measurement_id, submitted.size.as_str()));
        let row = reconcile(submitted.clone(), spec);
        statuses[match row.status {
            ResultStatus::Pass => 0,
            ResultStatus::Fail => 1,
            ResultStatus::Pending => 2,
        }] += 1;
        results::upsert_row(&mut tx, &row)
            .await
            .map_err(AppError::BatchWrite)?;
    }

    tx.commit().await.map_err(AppError::BatchWrite)?;

    tracing::info!(
        count,
        side = ?replace.map(|(_, _, side)| side),
        pass = statuses[0],
        fail = statuses[1],
        pending = statuses[2],
        "Measurement results saved"
    );
    Ok(count)
}

/// Reject rows that reference unknown or soft-deleted measurements.
///
/// Whether a measurement belongs to the purchase-order article's article is
/// not checked; the panel only offers measurements of the article it loaded.
fn check_references(rows: &[Submitted], known: &[Measurement]) -> AppResult<()> {
    // ---
    let live: HashMap<i64, bool> = known.iter().map(|m| (m.id, m.deleted_at.is_none())).collect();

    let mut errors = FieldErrors::new();
    for (i, row) in rows.iter().enumerate() {
        match live.get(&row.measurement_id) {
            None => errors.add(
                format!("results.{i}.measurement_id"),
                format!("Measurement {} does not exist.", row.measurement_id),
            ),
            Some(false) => errors.add(
                format!("results.{i}.measurement_id"),
                format!("Measurement {} has been deleted.", row.measurement_id),
            ),
            Some(true) => {}
        }
    }
    errors.into_result()
}
