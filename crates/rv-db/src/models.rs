//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use std::fmt;
use std::str::FromStr;

use rv_core::{ImageId, JobId, LibraryId, LibraryPathId, VideoId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_opt_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(v) => {
            let uuid = Uuid::parse_str(&v).map_err(|e| conversion_error(idx, e))?;
            Ok(Some(T::from(uuid)))
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub created_at: String,
}

impl Library {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

// ---------------------------------------------------------------------------
// LibraryPath
// ---------------------------------------------------------------------------

/// A filesystem root registered for scanning under a library.
#[derive(Debug, Clone)]
pub struct LibraryPath {
    pub id: LibraryPathId,
    pub library_id: LibraryId,
    pub root_path: String,
    pub created_at: String,
}

impl LibraryPath {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            library_id: parse_id(row, 1)?,
            root_path: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// A catalog entry describing one discovered video file.
#[derive(Debug, Clone)]
pub struct Video {
    pub id: VideoId,
    pub library_path_id: LibraryPathId,
    /// Path relative to the owning library root.
    pub relative_path: String,
    pub title: String,
    pub file_name: String,
    pub width: i64,
    pub height: i64,
    pub runtime_secs: f64,
    pub size_bytes: i64,
    pub checksum: Option<String>,
    /// `false` once the scanner no longer finds the file on disk.
    pub exists: bool,
    /// Set only by an explicit user removal.
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Video {
    /// Build from a row selected as:
    /// id, library_path_id, relative_path, title, file_name, width, height,
    /// runtime_secs, size_bytes, checksum, on_disk, deleted, created_at,
    /// updated_at
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            library_path_id: parse_id(row, 1)?,
            relative_path: row.get(2)?,
            title: row.get(3)?,
            file_name: row.get(4)?,
            width: row.get(5)?,
            height: row.get(6)?,
            runtime_secs: row.get(7)?,
            size_bytes: row.get(8)?,
            checksum: row.get(9)?,
            exists: row.get::<_, i32>(10)? != 0,
            deleted: row.get::<_, i32>(11)? != 0,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

/// Column values for a catalog entry about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub relative_path: String,
    pub title: String,
    pub file_name: String,
    pub width: i64,
    pub height: i64,
    pub runtime_secs: f64,
    pub size_bytes: i64,
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Image {
    pub id: ImageId,
    pub path: String,
    pub width: i64,
    pub height: i64,
    pub created_at: String,
}

impl Image {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            path: row.get(1)?,
            width: row.get(2)?,
            height: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// Typed relation from a video to an image generated from it.
#[derive(Debug, Clone)]
pub struct VideoImage {
    pub video_id: VideoId,
    pub image_id: ImageId,
    /// `thumbnail` or `chapter`.
    pub kind: String,
    pub timestamp_secs: f64,
    pub created_at: String,
}

impl VideoImage {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            video_id: parse_id(row, 0)?,
            image_id: parse_id(row, 1)?,
            kind: row.get(2)?,
            timestamp_secs: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Lifecycle state of a job: `NotStarted -> Running -> Completed | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    NotStarted,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotStarted => "not_started",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// Completed and Error jobs never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownJobStatus(pub String);

impl fmt::Display for UnknownJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job status '{}'", self.0)
    }
}

impl std::error::Error for UnknownJobStatus {}

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(JobStatus::NotStarted),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// Seven fixed priority tiers; a lower value is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPriority {
    Highest = 0,
    Higher = 1,
    High = 2,
    Normal = 3,
    Low = 4,
    Lower = 5,
    Lowest = 6,
}

impl JobPriority {
    pub const ALL: [JobPriority; 7] = [
        JobPriority::Highest,
        JobPriority::Higher,
        JobPriority::High,
        JobPriority::Normal,
        JobPriority::Low,
        JobPriority::Lower,
        JobPriority::Lowest,
    ];

    pub fn value(self) -> i32 {
        self as i32
    }

    /// Map a stored value back to its tier, clamping out-of-range values.
    pub fn from_value(value: i32) -> Self {
        let idx = value.clamp(0, 6) as usize;
        Self::ALL[idx]
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub parent_id: Option<JobId>,
    pub job_type: String,
    pub status: JobStatus,
    pub priority: JobPriority,
    /// Type-specific JSON document, decoded only by the handler for `job_type`.
    pub payload: String,
    pub outcome: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Job {
    /// Build from a row selected as all columns in table order.
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let status: String = row.get(3)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            parent_id: parse_opt_id(row, 1)?,
            job_type: row.get(2)?,
            status: status.parse().map_err(|e| conversion_error(3, e))?,
            priority: JobPriority::from_value(row.get(4)?),
            payload: row.get(5)?,
            outcome: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            JobStatus::NotStarted,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::NotStarted.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn priority_tiers() {
        assert_eq!(JobPriority::Highest.value(), 0);
        assert_eq!(JobPriority::Lowest.value(), 6);
        assert!(JobPriority::Highest < JobPriority::Normal);
        assert_eq!(JobPriority::from_value(4), JobPriority::Low);
        assert_eq!(JobPriority::from_value(-3), JobPriority::Highest);
        assert_eq!(JobPriority::from_value(99), JobPriority::Lowest);
    }
}
