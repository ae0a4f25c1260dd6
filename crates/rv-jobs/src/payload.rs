//! Job types and their JSON payloads.
//!
//! A job row stores its type name and the bare payload object separately.
//! [`JobPayload`] is the externally tagged form used when submitting work:
//!
//! ```json
//! {"GenerateChapters": {"mediaId": "...", "interval": 300, "height": 0, "width": 0, "maxDimension": 320}}
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rv_core::{Error, LibraryId, LibraryPathId, Result, VideoId};
use rv_db::models::Job;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Image relation kind written by thumbnail jobs unless overridden.
pub const KIND_THUMBNAIL: &str = "thumbnail";
/// Image relation kind used for chapter stills.
pub const KIND_CHAPTER: &str = "chapter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    ScanPath,
    GenerateThumbnail,
    GenerateChapters,
    RefreshMetadata,
    RefreshLibraryMetadata,
    GenerateChecksum,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::ScanPath,
        JobKind::GenerateThumbnail,
        JobKind::GenerateChapters,
        JobKind::RefreshMetadata,
        JobKind::RefreshLibraryMetadata,
        JobKind::GenerateChecksum,
    ];

    /// Name stored in the `job_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ScanPath => "ScanPath",
            JobKind::GenerateThumbnail => "GenerateThumbnail",
            JobKind::GenerateChapters => "GenerateChapters",
            JobKind::RefreshMetadata => "RefreshMetadata",
            JobKind::RefreshLibraryMetadata => "RefreshLibraryMetadata",
            JobKind::GenerateChecksum => "GenerateChecksum",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JobKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown job type '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPathPayload {
    pub library_path_id: LibraryPathId,
}

/// Capture one still from a video into `path`.
///
/// Missing fields fall back to 25% of the runtime, the native frame size
/// and the `thumbnail` kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateThumbnailPayload {
    pub video_id: VideoId,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChaptersPayload {
    pub media_id: VideoId,
    /// Seconds between chapter stills; must be positive.
    pub interval: f64,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub max_dimension: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshFields {
    pub size: bool,
    pub checksum: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshMetadataPayload {
    pub media_id: VideoId,
    #[serde(default)]
    pub refresh_fields: RefreshFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshLibraryMetadataPayload {
    pub library_id: LibraryId,
    /// Page size; absent or 0 means a single unbounded page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub refresh_fields: RefreshFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateChecksumPayload {}

/// A job submission, tagged by job type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobPayload {
    ScanPath(ScanPathPayload),
    GenerateThumbnail(GenerateThumbnailPayload),
    GenerateChapters(GenerateChaptersPayload),
    RefreshMetadata(RefreshMetadataPayload),
    RefreshLibraryMetadata(RefreshLibraryMetadataPayload),
    GenerateChecksum(GenerateChecksumPayload),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::ScanPath(_) => JobKind::ScanPath,
            JobPayload::GenerateThumbnail(_) => JobKind::GenerateThumbnail,
            JobPayload::GenerateChapters(_) => JobKind::GenerateChapters,
            JobPayload::RefreshMetadata(_) => JobKind::RefreshMetadata,
            JobPayload::RefreshLibraryMetadata(_) => JobKind::RefreshLibraryMetadata,
            JobPayload::GenerateChecksum(_) => JobKind::GenerateChecksum,
        }
    }

    /// The bare payload object as stored in the job row.
    pub fn body_json(&self) -> Result<String> {
        let body = match self {
            JobPayload::ScanPath(p) => serde_json::to_string(p),
            JobPayload::GenerateThumbnail(p) => serde_json::to_string(p),
            JobPayload::GenerateChapters(p) => serde_json::to_string(p),
            JobPayload::RefreshMetadata(p) => serde_json::to_string(p),
            JobPayload::RefreshLibraryMetadata(p) => serde_json::to_string(p),
            JobPayload::GenerateChecksum(p) => serde_json::to_string(p),
        };
        body.map_err(|e| Error::payload(self.kind().as_str(), e))
    }

    /// Parse a tagged submission such as `{"GenerateChecksum": {}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Validation(format!("invalid job payload: {e}")))
    }
}

/// Decode a job's stored payload into the handler's payload type.
pub fn decode<T: DeserializeOwned>(job: &Job) -> Result<T> {
    serde_json::from_str(&job.payload).map_err(|e| Error::payload(&job.job_type, e))
}
