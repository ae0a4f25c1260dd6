//! Library CRUD operations.

use rusqlite::Connection;
use rv_core::{Error, LibraryId, Result};

use crate::models::Library;

const COLS: &str = "id, name, created_at";

/// Create a new library.
pub fn create_library(conn: &Connection, name: &str) -> Result<Library> {
    let id = LibraryId::new();
    let created_at = crate::now();

    conn.execute(
        "INSERT INTO libraries (id, name, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.to_string(), name, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Library {
        id,
        name: name.to_string(),
        created_at,
    })
}

/// Get a library by ID.
pub fn get_library(conn: &Connection, id: LibraryId) -> Result<Option<Library>> {
    let q = format!("SELECT {COLS} FROM libraries WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Library::from_row);
    match result {
        Ok(l) => Ok(Some(l)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a library by its unique name.
pub fn get_library_by_name(conn: &Connection, name: &str) -> Result<Option<Library>> {
    let q = format!("SELECT {COLS} FROM libraries WHERE name = ?1");
    let result = conn.query_row(&q, [name], Library::from_row);
    match result {
        Ok(l) => Ok(Some(l)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Return the library with `name`, creating it first if necessary.
pub fn find_or_create_library(conn: &Connection, name: &str) -> Result<Library> {
    match get_library_by_name(conn, name)? {
        Some(lib) => Ok(lib),
        None => create_library(conn, name),
    }
}

/// List all libraries ordered by name.
pub fn list_libraries(conn: &Connection) -> Result<Vec<Library>> {
    let q = format!("SELECT {COLS} FROM libraries ORDER BY name");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Library::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
