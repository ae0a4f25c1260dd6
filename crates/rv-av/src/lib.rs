//! # rv-av
//!
//! External media tool plumbing for reelvault.
//!
//! - **Tool discovery** ([`ToolRegistry`]) finds ffmpeg and ffprobe through
//!   config overrides or `PATH`.
//! - **Command execution** ([`ToolCommand`]) is an async builder with a
//!   timeout for running external processes.
//! - **Probing** ([`Prober`], [`FfprobeProber`]) reads stream dimensions,
//!   duration and size from a media file.
//! - **Frame extraction** ([`FrameExtractor`], [`FfmpegFrameExtractor`])
//!   writes a single scaled still image at a timestamp.

pub mod command;
pub mod frame;
pub mod probe;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use frame::{scale_height_by_width, scale_width_by_height, FfmpegFrameExtractor, FrameExtractor};
pub use probe::{FfprobeProber, ProbeFormat, ProbeResult, ProbeStream, Prober};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
