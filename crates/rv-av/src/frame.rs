//! Still-frame extraction.

use std::path::Path;

use async_trait::async_trait;
use rv_core::{Error, Result};

use crate::tools::{ToolConfig, ToolRegistry};

/// Writes a single still image captured from a video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Capture the frame at `timestamp` seconds of `src`, scaled to
    /// `width`x`height`, into `dest`.
    async fn image_at(
        &self,
        src: &Path,
        timestamp: f64,
        dest: &Path,
        width: u32,
        height: u32,
    ) -> Result<()>;
}

/// Width matching `target` height while keeping the `width`:`height` aspect.
///
/// Returns 0 when `height` is 0 and saturates at `u32::MAX`.
pub fn scale_width_by_height(height: u32, width: u32, target: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    u32::try_from(u64::from(width) * u64::from(target) / u64::from(height)).unwrap_or(u32::MAX)
}

/// Height matching `target` width while keeping the `width`:`height` aspect.
///
/// Returns 0 when `width` is 0 and saturates at `u32::MAX`.
pub fn scale_height_by_width(width: u32, height: u32, target: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    u32::try_from(u64::from(height) * u64::from(target) / u64::from(width)).unwrap_or(u32::MAX)
}

/// Reject zero-sized output before any process is spawned.
fn validate_size(width: u32, height: u32) -> Result<()> {
    if width == 0 {
        return Err(Error::Validation("frame width must be greater than 0".into()));
    }
    if height == 0 {
        return Err(Error::Validation("frame height must be greater than 0".into()));
    }
    Ok(())
}

/// A frame extractor backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    tool: ToolConfig,
}

impl FfmpegFrameExtractor {
    pub fn new(tool: ToolConfig) -> Self {
        Self { tool }
    }

    pub fn from_registry(registry: &ToolRegistry) -> Result<Self> {
        Ok(Self::new(registry.require("ffmpeg")?.clone()))
    }

    fn build_args(src: &Path, timestamp: f64, dest: &Path, width: u32, height: u32) -> Vec<String> {
        vec![
            "-y".into(),
            "-ss".into(),
            timestamp.to_string(),
            "-i".into(),
            src.to_string_lossy().into_owned(),
            "-frames:v".into(),
            "1".into(),
            "-vf".into(),
            format!("scale={width}:{height}"),
            dest.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn image_at(
        &self,
        src: &Path,
        timestamp: f64,
        dest: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        validate_size(width, height)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(
            src = %src.display(),
            dest = %dest.display(),
            timestamp,
            width,
            height,
            "Extracting frame"
        );

        self.tool
            .command()
            .args(Self::build_args(src, timestamp, dest, width, height))
            .execute()
            .await?;
        Ok(())
    }
}
