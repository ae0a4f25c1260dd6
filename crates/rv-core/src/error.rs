//! Unified error type for reelvault.
//!
//! Lower layers (prober, frame extractor, store) return these typed failures
//! with enough context for the reconciler and job runner to decide whether
//! to skip an item or abort the pass.

use std::fmt;

/// Unified error type covering all failure modes in reelvault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "library path").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input failed validation before any work was attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing or metadata extraction failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A job payload could not be decoded by its handler.
    #[error("Payload error [{job_type}]: {message}")]
    Payload {
        /// The job type whose payload was rejected.
        job_type: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Payload`].
    pub fn payload(job_type: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Payload {
            job_type: job_type.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error means the store itself could not be used.
    pub fn is_database(&self) -> bool {
        matches!(self, Error::Database { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("video", "abc-123");
        assert_eq!(err.to_string(), "video not found: abc-123");
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("width must be greater than 0".into());
        assert_eq!(err.to_string(), "Validation error: width must be greater than 0");
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert!(err.is_database());
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(!err.is_database());
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
    }

    #[test]
    fn payload_display() {
        let err = Error::payload("GenerateThumbnail", "missing field `videoId`");
        assert_eq!(
            err.to_string(),
            "Payload error [GenerateThumbnail]: missing field `videoId`"
        );
    }
}
