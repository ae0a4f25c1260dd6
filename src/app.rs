//! Application wiring shared by every CLI command.
//!
//! [`App`] owns the loaded configuration, the catalog pool, the discovered
//! external tools and the [`JobContext`] handed to job handlers. Commands
//! return plain values; printing is left to the binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rv_av::{
    FfmpegFrameExtractor, FfprobeProber, FrameExtractor, ProbeResult, Prober, ToolConfig, ToolInfo,
    ToolRegistry,
};
use rv_core::config::Config;
use rv_core::{JobId, VideoId};
use rv_db::models::{Job, JobPriority, JobStatus};
use rv_db::pool::{get_conn, init_pool, DbPool};
use rv_db::queries::{libraries, videos};
use rv_ingest::{ChecksumReport, ScanReport};
use rv_jobs::{run_processor, HandlerRegistry, JobContext, JobPayload, JobRunner, RunSummary};
use tokio_util::sync::CancellationToken;

pub struct App {
    ctx: JobContext,
    tools: ToolRegistry,
    runner: Arc<JobRunner>,
}

impl App {
    /// Load config, open the catalog and discover ffprobe/ffmpeg.
    ///
    /// A missing tool is not fatal here: only the operations that shell out
    /// to it fail later.
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path);
        for warning in config.validate() {
            tracing::warn!("{warning}");
        }

        let db = init_pool(&config.database.path).with_context(|| {
            format!("failed to open catalog at {}", config.database.path.display())
        })?;
        let tools = ToolRegistry::discover(&config.tools);
        let timeout = Duration::from_secs(config.tools.timeout_secs);

        let prober = FfprobeProber::new(tool_or_placeholder(&tools, "ffprobe", timeout));
        let extractor = FfmpegFrameExtractor::new(tool_or_placeholder(&tools, "ffmpeg", timeout));

        Ok(Self::with_parts(
            config,
            db,
            tools,
            Arc::new(prober),
            Arc::new(extractor),
        ))
    }

    /// Assemble an app from already-built parts.
    pub fn with_parts(
        config: Config,
        db: DbPool,
        tools: ToolRegistry,
        prober: Arc<dyn Prober>,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        let ctx = JobContext::new(db, Arc::new(config), prober, extractor);
        let runner = Arc::new(JobRunner::new(ctx.clone(), HandlerRegistry::with_defaults()));
        Self { ctx, tools, runner }
    }

    pub fn context(&self) -> &JobContext {
        &self.ctx
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Reconcile `root` into the named library, creating either if needed.
    pub async fn scan(&self, root: &Path, library: &str) -> Result<ScanReport> {
        let library = {
            let conn = get_conn(&self.ctx.db)?;
            libraries::find_or_create_library(&conn, library)?
        };
        let report = self
            .ctx
            .reconciler()
            .reconcile(library.id, root)
            .await
            .with_context(|| format!("scan of {} failed", root.display()))?;
        Ok(report)
    }

    pub async fn checksums(&self) -> Result<ChecksumReport> {
        Ok(self.ctx.checksums().run().await?)
    }

    /// Queue a job from its JSON form, e.g. `{"GenerateChecksum": {}}`.
    pub fn enqueue(&self, json: &str, priority: JobPriority, parent: Option<JobId>) -> Result<Job> {
        let payload = JobPayload::from_json(json)?;
        let job = self.ctx.queue().enqueue(&payload, priority, parent)?;
        tracing::info!(job_id = %job.id, job_type = %job.job_type, "Job queued");
        Ok(job)
    }

    /// Drain the queue once. `None` when another drain is already active.
    pub async fn work(&self) -> Result<Option<RunSummary>> {
        Ok(self.runner.run_until_idle().await?)
    }

    /// Poll the queue until `cancel` fires.
    pub async fn work_until_cancelled(&self, cancel: CancellationToken) {
        let poll = Duration::from_secs(self.ctx.config.jobs.poll_interval_secs);
        run_processor(self.runner.clone(), cancel, poll).await;
    }

    pub fn list_jobs(&self, status: Option<JobStatus>, limit: i64) -> Result<Vec<Job>> {
        Ok(self.ctx.queue().list(status, 0, limit)?)
    }

    /// A job plus its direct children.
    pub fn show_job(&self, id: JobId) -> Result<(Job, Vec<Job>)> {
        let queue = self.ctx.queue();
        let job = queue.get(id)?;
        let children = queue.children(id)?;
        Ok((job, children))
    }

    pub fn resubmit_job(&self, id: JobId) -> Result<Job> {
        Ok(self.ctx.queue().resubmit(id)?)
    }

    pub fn delete_video(&self, id: VideoId) -> Result<()> {
        let conn = get_conn(&self.ctx.db)?;
        if !videos::mark_deleted(&conn, id)? {
            bail!("video not found: {id}");
        }
        tracing::info!(video_id = %id, "Video marked deleted");
        Ok(())
    }

    pub async fn probe(&self, file: &Path) -> Result<ProbeResult> {
        if !file.exists() {
            bail!("File does not exist: {}", file.display());
        }
        Ok(self.ctx.prober.probe(file).await?)
    }

    pub fn check_tools(&self) -> Vec<ToolInfo> {
        self.tools.check_all()
    }
}

fn tool_or_placeholder(tools: &ToolRegistry, name: &str, timeout: Duration) -> ToolConfig {
    match tools.require(name) {
        Ok(tool) => tool.clone(),
        Err(e) => {
            tracing::warn!(tool = name, "{e}");
            ToolConfig {
                name: name.to_string(),
                path: PathBuf::from(name),
                timeout,
            }
        }
    }
}

/// Parse a config file strictly, returning it with its non-fatal warnings.
pub fn validate_config(path: &Path) -> Result<(Config, Vec<String>)> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = Config::from_json(&contents)?;
    let warnings = config.validate();
    Ok((config, warnings))
}
