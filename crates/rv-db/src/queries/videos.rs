//! Catalog entry operations.
//!
//! Rows are never physically deleted here: the scanner flips `on_disk` and a
//! user removal sets `deleted`.

use rusqlite::Connection;
use rv_core::{Error, LibraryId, LibraryPathId, Result, VideoId};

use crate::models::{NewVideo, Video};

const COLS: &str = "id, library_path_id, relative_path, title, file_name, width, height,
    runtime_secs, size_bytes, checksum, on_disk, deleted, created_at, updated_at";

const JOINED_COLS: &str = "v.id, v.library_path_id, v.relative_path, v.title, v.file_name,
    v.width, v.height, v.runtime_secs, v.size_bytes, v.checksum, v.on_disk, v.deleted,
    v.created_at, v.updated_at, lp.root_path";

/// Insert a batch of new catalog entries in a single transaction.
///
/// A row that already exists for the same relative path (a file the scanner
/// tombstoned earlier and has found again) is revived: its metadata is
/// replaced, `on_disk` is set and the stale checksum cleared. `deleted` is
/// left alone.
///
/// Returns the number of rows written.
pub fn insert_batch(
    conn: &Connection,
    library_path_id: LibraryPathId,
    batch: &[NewVideo],
) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let now = crate::now();
    let mut written = 0;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO videos (id, library_path_id, relative_path, title, file_name,
                    width, height, runtime_secs, size_bytes, checksum, on_disk, deleted,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, 1, 0, ?10, ?10)
                 ON CONFLICT(library_path_id, relative_path) DO UPDATE SET
                    title = excluded.title,
                    file_name = excluded.file_name,
                    width = excluded.width,
                    height = excluded.height,
                    runtime_secs = excluded.runtime_secs,
                    size_bytes = excluded.size_bytes,
                    checksum = NULL,
                    on_disk = 1,
                    updated_at = excluded.updated_at",
            )
            .map_err(|e| Error::database(e.to_string()))?;

        for v in batch {
            written += stmt
                .execute(rusqlite::params![
                    VideoId::new().to_string(),
                    library_path_id.to_string(),
                    v.relative_path,
                    v.title,
                    v.file_name,
                    v.width,
                    v.height,
                    v.runtime_secs,
                    v.size_bytes,
                    now,
                ])
                .map_err(|e| Error::database(e.to_string()))?;
        }
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(written)
}

/// Get a catalog entry by ID.
pub fn get_video(conn: &Connection, id: VideoId) -> Result<Option<Video>> {
    let q = format!("SELECT {COLS} FROM videos WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Video::from_row);
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a catalog entry together with the absolute root of its library path.
pub fn get_video_with_root(conn: &Connection, id: VideoId) -> Result<Option<(Video, String)>> {
    let q = format!(
        "SELECT {JOINED_COLS} FROM videos v
         JOIN library_paths lp ON v.library_path_id = lp.id
         WHERE v.id = ?1"
    );
    let result = conn.query_row(&q, [id.to_string()], |row| {
        Ok((Video::from_row(row)?, row.get::<_, String>(14)?))
    });
    match result {
        Ok(pair) => Ok(Some(pair)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List the entries of a library path that are currently on disk.
pub fn list_on_disk_for_path(conn: &Connection, library_path_id: LibraryPathId) -> Result<Vec<Video>> {
    let q = format!(
        "SELECT {COLS} FROM videos WHERE library_path_id = ?1 AND on_disk = 1
         ORDER BY relative_path"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([library_path_id.to_string()], Video::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List every entry of a library path, tombstoned and deleted ones included.
pub fn list_all_for_path(conn: &Connection, library_path_id: LibraryPathId) -> Result<Vec<Video>> {
    let q = format!("SELECT {COLS} FROM videos WHERE library_path_id = ?1 ORDER BY relative_path");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([library_path_id.to_string()], Video::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Page through a library's live entries (on disk, not deleted) in creation
/// order. `limit = None` returns everything from `offset` onwards.
pub fn list_for_library(
    conn: &Connection,
    library_id: LibraryId,
    offset: i64,
    limit: Option<i64>,
) -> Result<Vec<Video>> {
    let q = format!(
        "SELECT {JOINED_COLS} FROM videos v
         JOIN library_paths lp ON v.library_path_id = lp.id
         WHERE lp.library_id = ?1 AND v.on_disk = 1 AND v.deleted = 0
         ORDER BY v.created_at ASC, v.rowid ASC
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![library_id.to_string(), limit.unwrap_or(-1), offset],
            Video::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List entries that still lack a checksum, with their library root.
///
/// User-deleted entries are included. Tombstoned ones are not, since their
/// file is gone.
pub fn list_missing_checksum(conn: &Connection) -> Result<Vec<(Video, String)>> {
    let q = format!(
        "SELECT {JOINED_COLS} FROM videos v
         JOIN library_paths lp ON v.library_path_id = lp.id
         WHERE v.checksum IS NULL AND v.on_disk = 1
         ORDER BY v.created_at ASC, v.rowid ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok((Video::from_row(row)?, row.get::<_, String>(14)?)))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Set or clear the on-disk flag of an entry.
pub fn set_on_disk(conn: &Connection, id: VideoId, on_disk: bool) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET on_disk = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![on_disk as i32, crate::now(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Store a content checksum.
pub fn set_checksum(conn: &Connection, id: VideoId, checksum: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET checksum = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![checksum, crate::now(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Store a recomputed file size.
pub fn set_size(conn: &Connection, id: VideoId, size_bytes: i64) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET size_bytes = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![size_bytes, crate::now(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Mark an entry as removed by the user.
pub fn mark_deleted(conn: &Connection, id: VideoId) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET deleted = 1, updated_at = ?1 WHERE id = ?2",
            rusqlite::params![crate::now(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
