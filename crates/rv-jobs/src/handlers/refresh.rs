use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rv_core::{Error, Result};
use rv_db::models::Job;
use rv_db::pool::get_conn;
use rv_db::queries::videos;
use rv_ingest::checksum::file_md5;

use crate::context::JobContext;
use crate::payload::{decode, JobKind, RefreshMetadataPayload};
use crate::runner::JobHandler;

/// Recomputes the requested fields of one entry and writes back only the
/// ones that changed.
pub struct RefreshMetadataHandler;

async fn hash_file(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || file_md5(&path))
        .await
        .map_err(|e| Error::Internal(format!("checksum task failed: {e}")))?
}

#[async_trait]
impl JobHandler for RefreshMetadataHandler {
    fn kind(&self) -> JobKind {
        JobKind::RefreshMetadata
    }

    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>> {
        let payload: RefreshMetadataPayload = decode(job)?;
        let (video, root) = {
            let conn = get_conn(&ctx.db)?;
            videos::get_video_with_root(&conn, payload.media_id)?
                .ok_or_else(|| Error::not_found("video", payload.media_id))?
        };
        let path = Path::new(&root).join(&video.relative_path);
        let fields = payload.refresh_fields;

        let size = if fields.size {
            let len = tokio::fs::metadata(&path).await?.len();
            Some(i64::try_from(len).unwrap_or(i64::MAX))
        } else {
            None
        };
        let checksum = if fields.checksum {
            Some(hash_file(path.clone()).await?)
        } else {
            None
        };

        let mut changed = Vec::new();
        let conn = get_conn(&ctx.db)?;
        if let Some(size) = size.filter(|s| *s != video.size_bytes) {
            videos::set_size(&conn, video.id, size)?;
            changed.push("size");
        }
        if let Some(sum) = checksum.filter(|s| video.checksum.as_deref() != Some(s.as_str())) {
            videos::set_checksum(&conn, video.id, &sum)?;
            changed.push("checksum");
        }

        tracing::debug!(video_id = %video.id, changed = ?changed, "Metadata refreshed");
        Ok(Some(if changed.is_empty() {
            "no changes".to_string()
        } else {
            format!("updated {}", changed.join(", "))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{JobPayload, RefreshFields};
    use crate::testing::TestEnv;
    use rv_core::VideoId;
    use rv_db::models::{JobPriority, JobStatus};

    fn refresh(media_id: VideoId, size: bool, checksum: bool) -> JobPayload {
        JobPayload::RefreshMetadata(RefreshMetadataPayload {
            media_id,
            refresh_fields: RefreshFields { size, checksum },
        })
    }

    #[tokio::test]
    async fn persists_only_changed_fields() {
        let env = TestEnv::new();
        let video = env.add_video("a.mp4", b"abc", 640, 360, 10.0);
        // File grows after it was cataloged.
        std::fs::write(env.root().join("a.mp4"), b"abcdef").unwrap();

        let job = env
            .queue()
            .enqueue(&refresh(video.id, true, false), JobPriority::Normal, None)
            .unwrap();
        env.runner().run_until_idle().await.unwrap();

        let stored = env.queue().get(job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.outcome.as_deref(), Some("updated size"));

        let refreshed = env.video(&video);
        assert_eq!(refreshed.size_bytes, 6);
        assert!(refreshed.checksum.is_none());
    }

    #[tokio::test]
    async fn unchanged_values_are_not_written() {
        let env = TestEnv::new();
        let video = env.add_video("a.mp4", b"abc", 640, 360, 10.0);
        {
            let conn = env.ctx.db.get().unwrap();
            videos::set_checksum(&conn, video.id, "900150983cd24fb0d6963f7d28e17f72").unwrap();
        }
        let before = env.video(&video).updated_at;

        let job = env
            .queue()
            .enqueue(&refresh(video.id, true, true), JobPriority::Normal, None)
            .unwrap();
        env.runner().run_until_idle().await.unwrap();

        assert_eq!(env.queue().get(job.id).unwrap().outcome.as_deref(), Some("no changes"));
        assert_eq!(env.video(&video).updated_at, before);
    }

    #[tokio::test]
    async fn checksum_refresh_writes_hash() {
        let env = TestEnv::new();
        let video = env.add_video("a.mp4", b"abc", 640, 360, 10.0);

        env.queue()
            .enqueue(&refresh(video.id, false, true), JobPriority::Normal, None)
            .unwrap();
        env.runner().run_until_idle().await.unwrap();

        assert_eq!(
            env.video(&video).checksum.as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[tokio::test]
    async fn unreadable_file_fails_job() {
        let env = TestEnv::new();
        let video = env.add_video("a.mp4", b"abc", 640, 360, 10.0);
        std::fs::remove_file(env.root().join("a.mp4")).unwrap();

        let job = env
            .queue()
            .enqueue(&refresh(video.id, true, false), JobPriority::Normal, None)
            .unwrap();
        env.runner().run_until_idle().await.unwrap();
        assert_eq!(env.queue().get(job.id).unwrap().status, JobStatus::Error);
    }
}
