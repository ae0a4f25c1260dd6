//! Library path operations.

use rusqlite::Connection;
use rv_core::{Error, LibraryId, LibraryPathId, Result};

use crate::models::LibraryPath;

const COLS: &str = "id, library_id, root_path, created_at";

/// Register a filesystem root under a library.
pub fn create_library_path(
    conn: &Connection,
    library_id: LibraryId,
    root_path: &str,
) -> Result<LibraryPath> {
    let id = LibraryPathId::new();
    let created_at = crate::now();

    conn.execute(
        "INSERT INTO library_paths (id, library_id, root_path, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.to_string(), library_id.to_string(), root_path, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(LibraryPath {
        id,
        library_id,
        root_path: root_path.to_string(),
        created_at,
    })
}

/// Get a library path by ID.
pub fn get_library_path(conn: &Connection, id: LibraryPathId) -> Result<Option<LibraryPath>> {
    let q = format!("SELECT {COLS} FROM library_paths WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], LibraryPath::from_row);
    match result {
        Ok(lp) => Ok(Some(lp)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a library path by its absolute root.
pub fn get_library_path_by_root(conn: &Connection, root_path: &str) -> Result<Option<LibraryPath>> {
    let q = format!("SELECT {COLS} FROM library_paths WHERE root_path = ?1");
    let result = conn.query_row(&q, [root_path], LibraryPath::from_row);
    match result {
        Ok(lp) => Ok(Some(lp)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Return the library path for `root_path`, creating it under `library_id`
/// on first sight.
///
/// An existing root registered under a different library is returned as-is.
pub fn find_or_create_library_path(
    conn: &Connection,
    library_id: LibraryId,
    root_path: &str,
) -> Result<LibraryPath> {
    if let Some(existing) = get_library_path_by_root(conn, root_path)? {
        if existing.library_id != library_id {
            tracing::warn!(
                root = root_path,
                owner = %existing.library_id,
                requested = %library_id,
                "Library path already registered under another library"
            );
        }
        return Ok(existing);
    }
    tracing::info!(root = root_path, library_id = %library_id, "Registering new library path");
    create_library_path(conn, library_id, root_path)
}

/// List the roots registered under a library.
pub fn list_library_paths(conn: &Connection, library_id: LibraryId) -> Result<Vec<LibraryPath>> {
    let q = format!("SELECT {COLS} FROM library_paths WHERE library_id = ?1 ORDER BY root_path");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([library_id.to_string()], LibraryPath::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
