//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use rv_core::{Error, Result};

/// V1: initial schema -- libraries, catalog entries and the job queue.
const V1_INITIAL: &str = r#"
CREATE TABLE libraries (
    id         TEXT PRIMARY KEY,
    name       TEXT UNIQUE NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE library_paths (
    id         TEXT PRIMARY KEY,
    library_id TEXT NOT NULL REFERENCES libraries(id) ON DELETE CASCADE,
    root_path  TEXT UNIQUE NOT NULL,
    created_at TEXT NOT NULL
);

-- Catalog entries. on_disk = 0 is the scanner's soft tombstone; deleted is
-- only ever set by a user.
CREATE TABLE videos (
    id              TEXT PRIMARY KEY,
    library_path_id TEXT NOT NULL REFERENCES library_paths(id) ON DELETE CASCADE,
    relative_path   TEXT NOT NULL,
    title           TEXT NOT NULL,
    file_name       TEXT NOT NULL,
    width           INTEGER NOT NULL DEFAULT 0,
    height          INTEGER NOT NULL DEFAULT 0,
    runtime_secs    REAL NOT NULL DEFAULT 0.0,
    size_bytes      INTEGER NOT NULL DEFAULT 0,
    checksum        TEXT,
    on_disk         INTEGER NOT NULL DEFAULT 1,
    deleted         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (library_path_id, relative_path)
);

CREATE TABLE jobs (
    id         TEXT PRIMARY KEY,
    parent_id  TEXT REFERENCES jobs(id),
    job_type   TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'not_started',
    priority   INTEGER NOT NULL DEFAULT 3,
    payload    TEXT NOT NULL DEFAULT '{}',
    outcome    TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX idx_library_paths_library ON library_paths(library_id);
CREATE INDEX idx_videos_path_on_disk   ON videos(library_path_id, on_disk);
CREATE INDEX idx_videos_checksum_null  ON videos(checksum) WHERE checksum IS NULL;
CREATE INDEX idx_jobs_status_created   ON jobs(status, created_at);
CREATE INDEX idx_jobs_parent           ON jobs(parent_id);
"#;

/// V2: generated images and their typed relation to catalog entries.
const V2_IMAGES: &str = r#"
CREATE TABLE images (
    id         TEXT PRIMARY KEY,
    path       TEXT NOT NULL,
    width      INTEGER NOT NULL,
    height     INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE video_images (
    video_id       TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    image_id       TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
    kind           TEXT NOT NULL,
    timestamp_secs REAL NOT NULL,
    created_at     TEXT NOT NULL,
    PRIMARY KEY (video_id, image_id)
);

CREATE INDEX idx_video_images_video ON video_images(video_id, kind);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_IMAGES)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        tracing::debug!(version, "Applied catalog migration");
    }

    Ok(())
}
