use clap::{Parser, Subcommand, ValueEnum};
use rv_core::{JobId, VideoId};
use rv_db::models::{JobPriority, JobStatus};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelvault")]
#[command(author, version, about = "Personal video library ingestion and job pipeline")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a media root against the catalog
    Scan {
        /// Filesystem root to crawl
        #[arg(required = true)]
        root: PathBuf,

        /// Library the root belongs to (created if missing)
        #[arg(long, default_value = "Default")]
        library: String,
    },

    /// Compute checksums for every catalog entry that lacks one
    Checksums,

    /// Queue a job from a JSON document keyed by job type
    Enqueue {
        /// e.g. '{"ScanPath": {"libraryPathId": "..."}}'
        json: String,

        #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
        priority: PriorityArg,

        /// Parent job id
        #[arg(long)]
        parent: Option<JobId>,
    },

    /// Drain the job queue
    Work {
        /// Keep polling for new jobs until interrupted
        #[arg(long)]
        follow: bool,
    },

    /// Inspect and manage queued jobs
    #[command(subcommand)]
    Jobs(JobsCommand),

    /// Manage catalog entries
    #[command(subcommand)]
    Videos(VideosCommand),

    /// Probe a media file and display its dimensions and duration
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (falls back to --config)
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// List jobs, oldest first
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        #[arg(long, default_value = "50")]
        limit: i64,
    },

    /// Show a single job and its children
    Show { id: JobId },

    /// Queue a fresh copy of a failed job
    Resubmit { id: JobId },
}

#[derive(Subcommand)]
pub enum VideosCommand {
    /// Flag an entry as deleted by the user
    Delete { id: VideoId },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Highest,
    Higher,
    High,
    Normal,
    Low,
    Lower,
    Lowest,
}

impl From<PriorityArg> for JobPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Highest => JobPriority::Highest,
            PriorityArg::Higher => JobPriority::Higher,
            PriorityArg::High => JobPriority::High,
            PriorityArg::Normal => JobPriority::Normal,
            PriorityArg::Low => JobPriority::Low,
            PriorityArg::Lower => JobPriority::Lower,
            PriorityArg::Lowest => JobPriority::Lowest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    NotStarted,
    Running,
    Completed,
    Error,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::NotStarted => JobStatus::NotStarted,
            StatusArg::Running => JobStatus::Running,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Error => JobStatus::Error,
        }
    }
}
