use async_trait::async_trait;
use rv_core::{Error, Result};
use rv_db::models::Job;
use rv_db::pool::get_conn;
use rv_db::queries::library_paths;

use crate::context::JobContext;
use crate::payload::{decode, JobKind, ScanPathPayload};
use crate::runner::JobHandler;

/// Reconciles one registered library path.
pub struct ScanPathHandler;

#[async_trait]
impl JobHandler for ScanPathHandler {
    fn kind(&self) -> JobKind {
        JobKind::ScanPath
    }

    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>> {
        let payload: ScanPathPayload = decode(job)?;
        let library_path = {
            let conn = get_conn(&ctx.db)?;
            library_paths::get_library_path(&conn, payload.library_path_id)?
                .ok_or_else(|| Error::not_found("library path", payload.library_path_id))?
        };

        let report = ctx.reconciler().reconcile_path(&library_path).await?;
        Ok(Some(format!(
            "discovered {}, inserted {}, tombstoned {}, probe failures {}",
            report.discovered, report.inserted, report.tombstoned, report.probe_failures
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::JobPayload;
    use crate::testing::TestEnv;
    use rv_core::LibraryPathId;
    use rv_db::models::{JobPriority, JobStatus};
    use rv_db::queries::videos;

    #[tokio::test]
    async fn scan_job_ingests_files() {
        let env = TestEnv::new();
        std::fs::write(env.root().join("movie.mkv"), b"m").unwrap();
        std::fs::write(env.root().join("cover.jpg"), b"c").unwrap();

        let job = env
            .queue()
            .enqueue(
                &JobPayload::ScanPath(ScanPathPayload {
                    library_path_id: env.library_path_id,
                }),
                JobPriority::Normal,
                None,
            )
            .unwrap();
        env.runner().run_until_idle().await.unwrap();

        let stored = env.queue().get(job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.outcome.unwrap().contains("inserted 1"));

        let conn = env.ctx.db.get().unwrap();
        let rows = videos::list_on_disk_for_path(&conn, env.library_path_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].width, rows[0].height), (1920, 1080));
    }

    #[tokio::test]
    async fn unknown_library_path_fails_job() {
        let env = TestEnv::new();
        let job = env
            .queue()
            .enqueue(
                &JobPayload::ScanPath(ScanPathPayload {
                    library_path_id: LibraryPathId::new(),
                }),
                JobPriority::Normal,
                None,
            )
            .unwrap();
        env.runner().run_until_idle().await.unwrap();

        let stored = env.queue().get(job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Error);
        assert!(stored.outcome.unwrap().contains("library path not found"));
    }
}
