//! Measurement spec resolution.
//!
//! Given the live measurements of an article and their size overrides, pick
//! the expected value for a requested size. There is no base value and no
//! cross-size fallback: a size without an override resolves to `None`.

use std::collections::HashMap;

use crate::models::{Measurement, MeasurementSize, ResolvedSpec};

// ---

/// Resolve one spec per measurement, in the order given.
///
/// Soft-deleted measurements are skipped. Tolerances always come from the
/// measurement record. Without a `size` every expected value is `None`.
pub fn resolve_specs(
    measurements: &[Measurement],
    sizes: &[MeasurementSize],
    size: Option<&str>,
) -> Vec<ResolvedSpec> {
    // ---
    let overrides: HashMap<i64, f64> = match size {
        Some(size) => sizes
            .iter()
            .filter(|s| s.size == size)
            .map(|s| (s.measurement_id, s.value))
            .collect(),
        None => HashMap::new(),
    };

    measurements
        .iter()
        .filter(|m| m.deleted_at.is_none())
        .map(|m| ResolvedSpec {
            measurement_id: m.id,
            code: m.code.clone(),
            measurement: m.measurement.clone(),
            expected_value: overrides.get(&m.id).copied(),
            tol_plus: m.tol_plus,
            tol_minus: m.tol_minus,
            side: m.side,
        })
        .collect()
}
