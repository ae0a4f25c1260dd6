use std::path::Path;

use async_trait::async_trait;
use rv_core::{Error, Result};
use rv_db::models::Job;
use rv_db::pool::get_conn;
use rv_db::queries::{images, videos};

use crate::context::JobContext;
use crate::payload::{decode, GenerateThumbnailPayload, JobKind, KIND_THUMBNAIL};
use crate::runner::JobHandler;

/// Fraction of the runtime used when no timestamp is given.
const DEFAULT_POSITION: f64 = 0.25;

/// Captures one still and records it against the video.
pub struct GenerateThumbnailHandler;

#[async_trait]
impl JobHandler for GenerateThumbnailHandler {
    fn kind(&self) -> JobKind {
        JobKind::GenerateThumbnail
    }

    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>> {
        let payload: GenerateThumbnailPayload = decode(job)?;
        let (video, root) = {
            let conn = get_conn(&ctx.db)?;
            videos::get_video_with_root(&conn, payload.video_id)?
                .ok_or_else(|| Error::not_found("video", payload.video_id))?
        };

        let src = Path::new(&root).join(&video.relative_path);
        let timestamp = payload
            .timestamp
            .unwrap_or(video.runtime_secs * DEFAULT_POSITION);
        let width = payload
            .width
            .unwrap_or_else(|| u32::try_from(video.width).unwrap_or(0));
        let height = payload
            .height
            .unwrap_or_else(|| u32::try_from(video.height).unwrap_or(0));
        let kind = payload.kind.as_deref().unwrap_or(KIND_THUMBNAIL);

        ctx.extractor
            .image_at(&src, timestamp, &payload.path, width, height)
            .await?;

        let dest = payload.path.to_string_lossy();
        let conn = get_conn(&ctx.db)?;
        let (image, _) = images::create_linked_image(
            &conn,
            video.id,
            &dest,
            i64::from(width),
            i64::from(height),
            kind,
            timestamp,
        )?;

        tracing::debug!(
            video_id = %video.id,
            image_id = %image.id,
            kind,
            timestamp,
            "Stored generated image"
        );
        Ok(Some(dest.into_owned()))
    }
}
