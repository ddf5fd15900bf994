//! Database schema management for `codemetal-qctrack`.
//!
//! The schema is owned by the versioned SQL files under `migrations/`.
//! Applied once on startup from `main.rs` (EMBP: single gateway call),
//! before the HTTP listener is bound.

use anyhow::{Context, Result};
use sqlx::PgPool;

// ---

/// Apply all pending migrations (idempotent).
///
/// Already-applied versions are skipped, so this is safe to call on every
/// startup. Errors are propagated if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    // ---
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to apply database migrations")?;

    tracing::info!("Database migrations applied");
    Ok(())
}
