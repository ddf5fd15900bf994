//! SQL access, one module per table family.
//!
//! Functions take either a `&PgPool` or a `&mut PgConnection` (a transaction
//! deref) depending on whether callers need to compose them atomically.

pub mod annotations;
pub mod api_keys;
pub mod articles;
pub mod calibrations;
pub mod measurements;
pub mod operators;
pub mod results;
pub mod sessions;
