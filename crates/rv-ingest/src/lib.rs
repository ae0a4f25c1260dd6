//! # rv-ingest
//!
//! Filesystem ingestion for reelvault: the [`crawler`] finds video files
//! under a library root, the [`reconcile`] pass diffs them against the
//! catalog, and the [`checksum`] sweep fills in content hashes afterwards.

pub mod checksum;
pub mod crawler;
pub mod reconcile;

pub use checksum::{ChecksumEnricher, ChecksumReport};
pub use crawler::{crawl, VIDEO_EXTENSIONS};
pub use reconcile::{Reconciler, ScanReport};
