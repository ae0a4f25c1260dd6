//! Shared dependencies handed to every job handler.

use std::sync::Arc;

use rv_av::{FrameExtractor, Prober};
use rv_core::config::Config;
use rv_db::pool::DbPool;
use rv_ingest::{ChecksumEnricher, Reconciler};

use crate::queue::JobQueue;

/// Infrastructure a handler may use. Cheap to clone.
#[derive(Clone)]
pub struct JobContext {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub prober: Arc<dyn Prober>,
    pub extractor: Arc<dyn FrameExtractor>,
}

impl JobContext {
    pub fn new(
        db: DbPool,
        config: Arc<Config>,
        prober: Arc<dyn Prober>,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        Self {
            db,
            config,
            prober,
            extractor,
        }
    }

    pub fn queue(&self) -> JobQueue {
        JobQueue::new(self.db.clone())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.db.clone(), self.prober.clone(), self.config.scan.clone())
    }

    pub fn checksums(&self) -> ChecksumEnricher {
        ChecksumEnricher::new(self.db.clone())
    }
}
