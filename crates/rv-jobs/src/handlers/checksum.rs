use async_trait::async_trait;
use rv_core::Result;
use rv_db::models::Job;

use crate::context::JobContext;
use crate::payload::{decode, GenerateChecksumPayload, JobKind};
use crate::runner::JobHandler;

/// Runs a catalog-wide checksum sweep.
pub struct GenerateChecksumHandler;

#[async_trait]
impl JobHandler for GenerateChecksumHandler {
    fn kind(&self) -> JobKind {
        JobKind::GenerateChecksum
    }

    async fn handle(&self, ctx: &JobContext, job: &Job) -> Result<Option<String>> {
        let _: GenerateChecksumPayload = decode(job)?;
        let report = ctx.checksums().run().await?;
        Ok(Some(format!(
            "examined {}, updated {}, failures {}",
            report.examined, report.updated, report.failures
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::JobPayload;
    use crate::testing::TestEnv;
    use rv_db::models::{JobPriority, JobStatus};

    #[tokio::test]
    async fn checksum_job_fills_missing_sums() {
        let env = TestEnv::new();
        let video = env.add_video("a.mp4", b"abc", 640, 360, 10.0);

        let job = env
            .queue()
            .enqueue(
                &JobPayload::GenerateChecksum(GenerateChecksumPayload {}),
                JobPriority::Normal,
                None,
            )
            .unwrap();
        env.runner().run_until_idle().await.unwrap();

        assert_eq!(env.queue().get(job.id).unwrap().status, JobStatus::Completed);
        assert_eq!(
            env.video(&video).checksum.as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }
}
