//! Admin API key management under `/admin/api-keys`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::generate_api_key;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::NewApiKey;
use crate::store::api_keys;
use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api-keys", get(list).post(create))
        .route("/api-keys/{id}/revoke", post(revoke))
}

async fn list(State((pool, _)): State<(PgPool, Config)>) -> AppResult<Json<Value>> {
    // ---
    let keys = api_keys::list(&pool).await?;
    Ok(Json(json!({ "success": true, "api_keys": keys })))
}

/// The plaintext key is returned once, here.
async fn create(
    State((pool, _)): State<(PgPool, Config)>,
    body: Result<Json<NewApiKey>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    // ---
    let Json(input) = body?;
    let name = input.name.trim();

    let mut errors = FieldErrors::new();
    if name.is_empty() {
        errors.add("name", "The name field is required.");
    }
    errors.into_result()?;

    let key = api_keys::create(&pool, name, &generate_api_key()).await?;
    tracing::info!(id = key.id, name = %key.name, "API key issued");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "key": key.key,
            "api_key": key,
        })),
    ))
}

async fn revoke(
    State((pool, _)): State<(PgPool, Config)>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    // ---
    let Path(id) = id?;
    let key = api_keys::revoke(&pool, id)
        .await?
        .ok_or(AppError::NotFound("API key"))?;

    tracing::info!(id, name = %key.name, "API key revoked");
    Ok(Json(json!({ "success": true, "api_key": key })))
}
