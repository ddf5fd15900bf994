//! `codemetal-qctrack`: backend for camera-assisted garment QC measurement.
//!
//! Module map:
//! - `config`: environment configuration
//! - `schema`: migrations applied at startup
//! - `models`: row and request types
//! - `geometry`: calibration and target-distance math
//! - `resolver`: expected value lookup per size
//! - `engine`: result reconciliation and batch writes
//! - `auth`: API key, admin token and PIN checks
//! - `store`: database access, one module per table group
//! - `routes`: HTTP surface (EMBP gateway)

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod schema;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
