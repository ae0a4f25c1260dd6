//! Media probing.
//!
//! [`FfprobeProber`] shells out to
//! `ffprobe -v quiet -print_format json -show_format -show_streams` and keeps
//! only the pieces the catalog records: stream kinds and sizes, container
//! duration and byte size.

use std::path::Path;

use async_trait::async_trait;
use rv_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::tools::{ToolConfig, ToolRegistry};

/// Something that can read technical metadata from a media file.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Short backend name, used in logs.
    fn name(&self) -> &'static str;

    async fn probe(&self, path: &Path) -> Result<ProbeResult>;
}

/// Parsed probe output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Container-level fields. ffprobe reports both as decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeFormat {
    pub duration: Option<String>,
    pub size: Option<String>,
}

impl ProbeResult {
    /// Parse ffprobe's JSON output.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))
    }

    /// Width and height of the first video stream.
    ///
    /// A video stream missing either field reports 0 for it.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
            .ok_or_else(|| Error::Probe("no video stream found".into()))
    }

    /// Container duration in seconds, if present and parseable.
    pub fn duration_secs(&self) -> Option<f64> {
        self.format
            .duration
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite())
    }

    /// Container size in bytes, if present and parseable.
    pub fn size_bytes(&self) -> Option<i64> {
        self.format
            .size
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
    }
}

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    tool: ToolConfig,
}

impl FfprobeProber {
    pub fn new(tool: ToolConfig) -> Self {
        Self { tool }
    }

    /// Build a prober from the registry's ffprobe entry.
    pub fn from_registry(registry: &ToolRegistry) -> Result<Self> {
        Ok(Self::new(registry.require("ffprobe")?.clone()))
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        let output = self
            .tool
            .command()
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path.to_string_lossy())
            .execute()
            .await?;

        ProbeResult::from_json(&output.stdout)
    }
}
