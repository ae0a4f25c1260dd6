//! Database query modules.

pub mod images;
pub mod jobs;
pub mod libraries;
pub mod library_paths;
pub mod videos;
