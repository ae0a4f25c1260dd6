//! Built-in job handlers, one per [`JobKind`](crate::payload::JobKind).

mod chapters;
mod checksum;
mod library_refresh;
mod refresh;
mod scan;
mod thumbnail;

pub use chapters::{chapter_size, GenerateChaptersHandler};
pub use checksum::GenerateChecksumHandler;
pub use library_refresh::RefreshLibraryMetadataHandler;
pub use refresh::RefreshMetadataHandler;
pub use scan::ScanPathHandler;
pub use thumbnail::GenerateThumbnailHandler;
