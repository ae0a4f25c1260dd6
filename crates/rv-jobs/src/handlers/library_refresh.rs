use async_trait::async_trait;
use rv_core::{Error, Result};
use rv_db::models::Job;
use rv_db::pool::get_conn;
use rv_db::queries::{libraries, videos};

use crate::context::JobContext;
use crate::payload::{decode, JobKind, JobPayload, RefreshLibraryMetadataPayload, RefreshMetadataPayload};
use crate::runner::JobHandler;

/// Fans out one RefreshMetadata child per live entry of a library.
pub struct RefreshLibraryMetadataHandler;

#[async_trait]
impl JobHandler for RefreshLibraryMetadataHandler {
    fn kind(&self) -> JobKind {
        JobKind::RefreshLibraryMetadata
    }

    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>> {
        let payload: RefreshLibraryMetadataPayload = decode(job)?;
        let page_size = payload.batch_size.filter(|n| *n > 0);
        let queue = ctx.queue();

        let conn = get_conn(&ctx.db)?;
        libraries::get_library(&conn, payload.library_id)?
            .ok_or_else(|| Error::not_found("library", payload.library_id))?;

        let mut offset = 0i64;
        let mut created = 0usize;
        loop {
            let page = videos::list_for_library(&conn, payload.library_id, offset, page_size)?;
            if page.is_empty() {
                break;
            }
            for video in &page {
                let child = JobPayload::RefreshMetadata(RefreshMetadataPayload {
                    media_id: video.id,
                    refresh_fields: payload.refresh_fields,
                });
                queue.enqueue(&child, job.priority, Some(job.id))?;
                created += 1;
            }
            offset += page.len() as i64;
            if page_size.is_none() {
                break;
            }
        }

        tracing::info!(
            job_id = %job.id,
            library_id = %payload.library_id,
            children = created,
            "Library refresh jobs created"
        );
        Ok(Some(format!("created {created} refresh jobs")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::RefreshFields;
    use crate::testing::TestEnv;
    use rv_core::LibraryId;
    use rv_db::models::{JobPriority, JobStatus};

    fn library_refresh(library_id: LibraryId, batch_size: Option<i64>) -> JobPayload {
        JobPayload::RefreshLibraryMetadata(RefreshLibraryMetadataPayload {
            library_id,
            batch_size,
            refresh_fields: RefreshFields {
                size: true,
                checksum: false,
            },
        })
    }

    fn seed(env: &TestEnv, n: usize) {
        for i in 0..n {
            env.add_video(&format!("v{i}.mp4"), b"data", 640, 360, 10.0);
        }
    }

    async fn fan_out(batch_size: Option<i64>) -> usize {
        let env = TestEnv::new();
        seed(&env, 5);
        let parent = env
            .queue()
            .enqueue(&library_refresh(env.library_id, batch_size), JobPriority::Normal, None)
            .unwrap();
        let summary = env.runner().run_until_idle().await.unwrap().unwrap();
        assert_eq!(summary.failed, 0);

        let children = env.queue().children(parent.id).unwrap();
        assert!(children
            .iter()
            .all(|c| c.job_type == "RefreshMetadata" && c.status == JobStatus::Completed));
        children.len()
    }

    #[tokio::test]
    async fn paged_fan_out_covers_every_entry() {
        assert_eq!(fan_out(Some(2)).await, 5);
    }

    #[tokio::test]
    async fn unbounded_fan_out_without_batch_size() {
        assert_eq!(fan_out(None).await, 5);
        assert_eq!(fan_out(Some(0)).await, 5);
    }

    #[tokio::test]
    async fn skips_tombstoned_and_deleted_entries() {
        let env = TestEnv::new();
        let gone = env.add_video("gone.mp4", b"g", 1, 1, 1.0);
        let trashed = env.add_video("trash.mp4", b"t", 1, 1, 1.0);
        env.add_video("live.mp4", b"l", 1, 1, 1.0);
        {
            let conn = env.ctx.db.get().unwrap();
            videos::set_on_disk(&conn, gone.id, false).unwrap();
            videos::mark_deleted(&conn, trashed.id).unwrap();
        }

        let parent = env
            .queue()
            .enqueue(&library_refresh(env.library_id, Some(10)), JobPriority::Normal, None)
            .unwrap();
        env.runner().run_until_idle().await.unwrap();
        assert_eq!(env.queue().children(parent.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_library_fails() {
        let env = TestEnv::new();
        let parent = env
            .queue()
            .enqueue(&library_refresh(LibraryId::new(), None), JobPriority::Normal, None)
            .unwrap();
        env.runner().run_until_idle().await.unwrap();
        assert_eq!(env.queue().get(parent.id).unwrap().status, JobStatus::Error);
    }
}
