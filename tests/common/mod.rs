//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires an in-memory catalog, a temporary
//! media root and fake ffprobe/ffmpeg stand-ins into a full [`App`].

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reelvault::App;
use rv_av::{FrameExtractor, ProbeFormat, ProbeResult, ProbeStream, Prober, ToolRegistry};
use rv_core::config::Config;
use rv_core::{Error, Result};
use rv_db::pool::{init_memory_pool, PooledConnection};

/// Reports every file as 1920x1080 and 90 seconds long. Files with
/// `corrupt` in their name fail to probe.
pub struct FakeProber;

#[async_trait]
impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        if path.to_string_lossy().contains("corrupt") {
            return Err(Error::Probe("invalid data found when processing input".into()));
        }
        Ok(ProbeResult {
            streams: vec![ProbeStream {
                codec_type: Some("video".into()),
                width: Some(1920),
                height: Some(1080),
            }],
            format: ProbeFormat {
                duration: Some("90.000000".into()),
                size: None,
            },
        })
    }
}

/// Writes a placeholder image and remembers each destination.
#[derive(Default)]
pub struct FakeExtractor {
    pub written: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl FrameExtractor for FakeExtractor {
    async fn image_at(
        &self,
        _src: &Path,
        _timestamp: f64,
        dest: &Path,
        _width: u32,
        _height: u32,
    ) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"jpeg")?;
        self.written.lock().unwrap().push(dest.to_path_buf());
        Ok(())
    }
}

pub struct TestHarness {
    pub app: App,
    pub extractor: Arc<FakeExtractor>,
    pub media: tempfile::TempDir,
    pub data: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// `images.storage_dir` is always redirected into a temp directory.
    pub fn with_config(mut config: Config) -> Self {
        let media = tempfile::tempdir().expect("failed to create media dir");
        let data = tempfile::tempdir().expect("failed to create data dir");
        config.images.storage_dir = data.path().join("images");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let extractor = Arc::new(FakeExtractor::default());
        let app = App::with_parts(
            config,
            db,
            ToolRegistry::default(),
            Arc::new(FakeProber),
            extractor.clone(),
        );

        Self {
            app,
            extractor,
            media,
            data,
        }
    }

    /// Canonical media root.
    pub fn root(&self) -> PathBuf {
        std::fs::canonicalize(self.media.path()).expect("media root")
    }

    /// Write a file under the media root, creating parent directories.
    pub fn write_media(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn conn(&self) -> PooledConnection {
        self.app.context().db.get().expect("failed to get connection")
    }
}
