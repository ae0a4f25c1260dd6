//! Job runner.
//!
//! Claims NotStarted jobs oldest first, dispatches each to the handler
//! registered for its type and records the result. A failed job is marked
//! Error with the failure text as its outcome and is never retried here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rv_core::{Error, Result};
use rv_db::models::Job;
use rv_db::pool::get_conn;
use rv_db::queries::jobs;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::JobContext;
use crate::handlers;
use crate::payload::JobKind;

/// Executes jobs of one type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Run `job`. `Ok` carries an optional note stored as the job outcome.
    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>>;
}

/// Handlers keyed by job type name.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// A registry with a handler for every built-in job type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(handlers::ScanPathHandler));
        registry.register(Arc::new(handlers::GenerateThumbnailHandler));
        registry.register(Arc::new(handlers::GenerateChaptersHandler));
        registry.register(Arc::new(handlers::RefreshMetadataHandler));
        registry.register(Arc::new(handlers::RefreshLibraryMetadataHandler));
        registry.register(Arc::new(handlers::GenerateChecksumHandler));
        registry
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.kind().as_str(), handler);
    }

    pub fn get(&self, job_type: &str) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(job_type)
    }
}

/// Allows at most one holder at a time.
#[derive(Debug, Default)]
pub struct SingleFlight {
    active: AtomicBool,
}

/// Releases the [`SingleFlight`] when dropped.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl SingleFlight {
    /// Take the flight, or `None` if someone else holds it.
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flag: &self.active })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Totals for one drain of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
}

pub struct JobRunner {
    ctx: JobContext,
    handlers: HandlerRegistry,
    flight: SingleFlight,
}

impl JobRunner {
    pub fn new(ctx: JobContext, handlers: HandlerRegistry) -> Self {
        Self {
            ctx,
            handlers,
            flight: SingleFlight::default(),
        }
    }

    pub fn context(&self) -> &JobContext {
        &self.ctx
    }

    /// Process jobs until none are NotStarted.
    ///
    /// Returns `Ok(None)` without doing anything when another drain on this
    /// runner is already in progress. Store failures while claiming or
    /// recording a job abort the drain.
    pub async fn run_until_idle(&self) -> Result<Option<RunSummary>> {
        let Some(_guard) = self.flight.try_acquire() else {
            tracing::debug!("Job runner already active, skipping");
            return Ok(None);
        };

        let mut summary = RunSummary::default();

        loop {
            let job = {
                let conn = get_conn(&self.ctx.db)?;
                jobs::claim_next(&conn)?
            };
            let Some(job) = job else {
                break;
            };

            tracing::info!(job_id = %job.id, job_type = %job.job_type, "Running job");

            let result = self.dispatch(&job).await;
            if let Err(e) = &result {
                tracing::error!(job_id = %job.id, job_type = %job.job_type, error = %e, "Job failed");
            }

            if let Err(e) = self.record(&job, &result) {
                tracing::error!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %e,
                    "Failed to record job outcome, job left running"
                );
                return Err(e);
            }

            match result {
                Ok(outcome) => {
                    tracing::info!(job_id = %job.id, outcome = ?outcome, "Job completed");
                    summary.completed += 1;
                }
                Err(_) => summary.failed += 1,
            }
        }

        if summary.completed + summary.failed > 0 {
            tracing::info!(
                completed = summary.completed,
                failed = summary.failed,
                "Job queue drained"
            );
        }
        Ok(Some(summary))
    }

    /// Move a running job to its terminal state.
    fn record(&self, job: &Job, result: &Result<Option<String>>) -> Result<()> {
        let conn = get_conn(&self.ctx.db)?;
        match result {
            Ok(outcome) => jobs::complete_job(&conn, job.id, outcome.as_deref())?,
            Err(e) => jobs::fail_job(&conn, job.id, &e.to_string())?,
        };
        Ok(())
    }

    async fn dispatch(&self, job: &Job) -> Result<Option<String>> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            Error::payload(&job.job_type, "no handler registered for this job type")
        })?;
        handler.handle(&self.ctx, job).await
    }
}

/// Long-running worker: drain the queue, then wait `poll_interval` or until
/// `cancel` fires.
pub async fn run_processor(runner: Arc<JobRunner>, cancel: CancellationToken, poll_interval: Duration) {
    tracing::info!(poll_secs = poll_interval.as_secs(), "Job processor started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        if let Err(e) = runner.run_until_idle().await {
            tracing::error!(error = %e, "Job processor error");
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = cancel.cancelled() => break,
        }
    }

    tracing::info!("Job processor stopped");
}
