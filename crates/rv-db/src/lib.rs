//! rv-db: catalog persistence layer.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, typed models, and query modules for libraries,
//! library paths, catalog entries, generated images, and jobs.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

/// Current time as a fixed-width RFC 3339 string.
///
/// Fixed microsecond precision keeps lexical and chronological order in
/// agreement for the `created_at` ordering the job queue relies on.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
