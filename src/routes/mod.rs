//! Route gateway. Every endpoint module exports a subrouter; this module
//! assembles them, attaches authentication per surface and adds request
//! tracing.

use axum::{middleware, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::auth::{AdminToken, PanelKey};
use crate::Config;

mod annotations;
mod api_keys;
mod calibrations;
mod camera;
mod health;
mod measurements;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    let state = (pool, config);

    let camera = camera::router().route_layer(middleware::from_extractor_with_state::<
        PanelKey,
        (PgPool, Config),
    >(state.clone()));

    let admin = Router::new()
        .merge(calibrations::router())
        .merge(annotations::router())
        .merge(measurements::router())
        .merge(api_keys::router())
        .route_layer(middleware::from_extractor_with_state::<
            AdminToken,
            (PgPool, Config),
        >(state.clone()));

    Router::new()
        .merge(health::router())
        .nest("/api/camera", camera)
        .nest("/admin", admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
