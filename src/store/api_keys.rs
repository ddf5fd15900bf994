use sqlx::PgPool;

use crate::models::ApiKey;

// ---

const COLUMNS: &str = "id, name, key, is_active, last_used_at, created_at";

/// Look up an active key and stamp `last_used_at`. `None` for unknown or
/// revoked keys.
pub async fn validate(pool: &PgPool, key: &str) -> Result<Option<ApiKey>, sqlx::Error> {
    // ---
    let query = format!(
        "UPDATE api_keys SET last_used_at = now() \
         WHERE key = $1 AND is_active \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ApiKey>(&query)
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, name: &str, key: &str) -> Result<ApiKey, sqlx::Error> {
    // ---
    let query = format!("INSERT INTO api_keys (name, key) VALUES ($1, $2) RETURNING {COLUMNS}");
    sqlx::query_as::<_, ApiKey>(&query)
        .bind(name)
        .bind(key)
        .fetch_one(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<ApiKey>, sqlx::Error> {
    // ---
    let query = format!("SELECT {COLUMNS} FROM api_keys ORDER BY created_at DESC, id DESC");
    sqlx::query_as::<_, ApiKey>(&query).fetch_all(pool).await
}

pub async fn revoke(pool: &PgPool, id: i64) -> Result<Option<ApiKey>, sqlx::Error> {
    // ---
    let query = format!("UPDATE api_keys SET is_active = FALSE WHERE id = $1 RETURNING {COLUMNS}");
    sqlx::query_as::<_, ApiKey>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}
