//! Fakes and fixtures shared by the unit tests of this crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rv_av::{FrameExtractor, ProbeFormat, ProbeResult, ProbeStream, Prober};
use rv_core::config::Config;
use rv_core::{LibraryId, LibraryPathId, Result};
use rv_db::models::{NewVideo, Video};
use rv_db::pool::init_memory_pool;
use rv_db::queries::{libraries, library_paths, videos};

use crate::context::JobContext;
use crate::queue::JobQueue;
use crate::runner::{HandlerRegistry, JobRunner};

/// Every file is a 1920x1080, 120 second video.
pub struct FakeProber;

#[async_trait]
impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, _path: &Path) -> Result<ProbeResult> {
        Ok(ProbeResult {
            streams: vec![ProbeStream {
                codec_type: Some("video".into()),
                width: Some(1920),
                height: Some(1080),
            }],
            format: ProbeFormat {
                duration: Some("120.0".into()),
                size: Some("2048".into()),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub src: PathBuf,
    pub timestamp: f64,
    pub dest: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Records each request and writes a placeholder file at `dest`.
#[derive(Default)]
pub struct RecordingExtractor {
    pub calls: Mutex<Vec<Extraction>>,
}

#[async_trait]
impl FrameExtractor for RecordingExtractor {
    async fn image_at(
        &self,
        src: &Path,
        timestamp: f64,
        dest: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"jpeg")?;
        self.calls.lock().push(Extraction {
            src: src.to_path_buf(),
            timestamp,
            dest: dest.to_path_buf(),
            width,
            height,
        });
        Ok(())
    }
}

pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub ctx: JobContext,
    pub extractor: Arc<RecordingExtractor>,
    pub library_id: LibraryId,
    pub library_path_id: LibraryPathId,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let db = init_memory_pool().unwrap();

        let (library_id, library_path_id) = {
            let conn = db.get().unwrap();
            let lib = libraries::create_library(&conn, "Test").unwrap();
            let lp = library_paths::create_library_path(&conn, lib.id, &root.to_string_lossy())
                .unwrap();
            (lib.id, lp.id)
        };

        let mut config = Config::default();
        config.images.storage_dir = root.join("images");
        config.scan.checksum_after_scan = false;

        let extractor = Arc::new(RecordingExtractor::default());
        let ctx = JobContext::new(db, Arc::new(config), Arc::new(FakeProber), extractor.clone());

        Self {
            dir,
            ctx,
            extractor,
            library_id,
            library_path_id,
        }
    }

    pub fn root(&self) -> PathBuf {
        std::fs::canonicalize(self.dir.path()).unwrap()
    }

    pub fn queue(&self) -> JobQueue {
        self.ctx.queue()
    }

    pub fn runner(&self) -> JobRunner {
        JobRunner::new(self.ctx.clone(), HandlerRegistry::with_defaults())
    }

    /// Write `contents` to `rel` under the root and catalog it.
    pub fn add_video(&self, rel: &str, contents: &[u8], width: i64, height: i64, runtime_secs: f64) -> Video {
        std::fs::write(self.root().join(rel), contents).unwrap();
        let conn = self.ctx.db.get().unwrap();
        videos::insert_batch(
            &conn,
            self.library_path_id,
            &[NewVideo {
                relative_path: rel.into(),
                title: rel.into(),
                file_name: rel.into(),
                width,
                height,
                runtime_secs,
                size_bytes: contents.len() as i64,
            }],
        )
        .unwrap();
        videos::list_on_disk_for_path(&conn, self.library_path_id)
            .unwrap()
            .into_iter()
            .find(|v| v.relative_path == rel)
            .unwrap()
    }

    pub fn video(&self, video: &Video) -> Video {
        let conn = self.ctx.db.get().unwrap();
        videos::get_video(&conn, video.id).unwrap().unwrap()
    }
}
