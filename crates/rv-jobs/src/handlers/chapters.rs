//! Chapter still fan-out.
//!
//! A GenerateChapters job does no extraction itself. It walks the video's
//! runtime at a fixed interval and enqueues one GenerateThumbnail child per
//! step, tagged with the `chapter` kind. Children are written in one
//! transaction and capped at [`MAX_CHAPTERS`].

use async_trait::async_trait;
use rv_av::{scale_height_by_width, scale_width_by_height};
use rv_core::{Error, Result};
use rv_db::models::Job;
use rv_db::pool::get_conn;
use rv_db::queries::videos;

use crate::context::JobContext;
use crate::payload::{
    decode, GenerateChaptersPayload, GenerateThumbnailPayload, JobKind, JobPayload, KIND_CHAPTER,
};
use crate::runner::JobHandler;

/// Upper bound on chapter stills created by one job.
pub const MAX_CHAPTERS: usize = 1000;

/// Output size for chapter stills.
///
/// Explicit `width`/`height` win when both are set. Otherwise the native
/// frame is scaled so its longer side equals `max_dimension`, or kept
/// as-is when that is 0.
pub fn chapter_size(
    width: u32,
    height: u32,
    max_dimension: u32,
    native_width: u32,
    native_height: u32,
) -> (u32, u32) {
    if width > 0 && height > 0 {
        return (width, height);
    }
    if max_dimension == 0 || native_width == 0 || native_height == 0 {
        return (native_width, native_height);
    }
    if native_width >= native_height {
        (
            max_dimension,
            scale_height_by_width(native_width, native_height, max_dimension),
        )
    } else {
        (
            scale_width_by_height(native_height, native_width, max_dimension),
            max_dimension,
        )
    }
}

pub struct GenerateChaptersHandler;

#[async_trait]
impl JobHandler for GenerateChaptersHandler {
    fn kind(&self) -> JobKind {
        JobKind::GenerateChapters
    }

    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>> {
        let payload: GenerateChaptersPayload = decode(job)?;
        if !(payload.interval.is_finite() && payload.interval > 0.0) {
            return Err(Error::Validation(format!(
                "chapter interval must be greater than 0, got {}",
                payload.interval
            )));
        }

        let video = {
            let conn = get_conn(&ctx.db)?;
            videos::get_video(&conn, payload.media_id)?
                .ok_or_else(|| Error::not_found("video", payload.media_id))?
        };

        let (width, height) = chapter_size(
            payload.width,
            payload.height,
            payload.max_dimension,
            u32::try_from(video.width).unwrap_or(0),
            u32::try_from(video.height).unwrap_or(0),
        );
        let dir = ctx.config.images.storage_dir.join(video.id.to_string());

        let steps = (video.runtime_secs / payload.interval).ceil().max(0.0);
        if steps > MAX_CHAPTERS as f64 {
            return Err(Error::Validation(format!(
                "interval {} over {}s of runtime would create {steps} chapters, limit is {MAX_CHAPTERS}",
                payload.interval, video.runtime_secs
            )));
        }

        let children: Vec<JobPayload> = (0..steps as usize)
            .map(|i| i as f64 * payload.interval)
            .take_while(|t| *t < video.runtime_secs)
            .map(|t| {
                JobPayload::GenerateThumbnail(GenerateThumbnailPayload {
                    video_id: video.id,
                    path: dir.join(format!("chapter-{t}.jpg")),
                    timestamp: Some(t),
                    height: Some(height),
                    width: Some(width),
                    kind: Some(KIND_CHAPTER.to_string()),
                })
            })
            .collect();
        let created = ctx
            .queue()
            .enqueue_all(&children, job.priority, Some(job.id))?
            .len();

        tracing::info!(
            job_id = %job.id,
            video_id = %video.id,
            children = created,
            width,
            height,
            "Chapter jobs created"
        );
        Ok(Some(format!("created {created} chapter jobs")))
    }
}
