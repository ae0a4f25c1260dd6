//! Persistent job queue.

use rv_core::{Error, JobId, Result};
use rv_db::models::{Job, JobPriority, JobStatus};
use rv_db::pool::{get_conn, DbPool};
use rv_db::queries::jobs;

use crate::payload::JobPayload;

/// Submission and inspection of jobs.
///
/// Selection for execution lives in the runner; the queue only writes
/// NotStarted rows and reads existing ones.
#[derive(Clone)]
pub struct JobQueue {
    db: DbPool,
}

impl JobQueue {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Persist a new NotStarted job.
    pub fn enqueue(
        &self,
        payload: &JobPayload,
        priority: JobPriority,
        parent: Option<JobId>,
    ) -> Result<Job> {
        let body = payload.body_json()?;
        let conn = get_conn(&self.db)?;
        let job = jobs::create_job(&conn, payload.kind().as_str(), &body, priority, parent)?;
        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            priority = priority.value(),
            parent_id = ?parent,
            "Job enqueued"
        );
        Ok(job)
    }

    /// Persist a batch of NotStarted jobs in one transaction.
    pub fn enqueue_all(
        &self,
        payloads: &[JobPayload],
        priority: JobPriority,
        parent: Option<JobId>,
    ) -> Result<Vec<Job>> {
        let bodies = payloads
            .iter()
            .map(|p| -> Result<(&'static str, String)> { Ok((p.kind().as_str(), p.body_json()?)) })
            .collect::<Result<Vec<_>>>()?;
        let rows: Vec<(&str, &str)> = bodies.iter().map(|(t, b)| (*t, b.as_str())).collect();

        let conn = get_conn(&self.db)?;
        let created = jobs::create_jobs(&conn, &rows, priority, parent)?;
        tracing::debug!(
            count = created.len(),
            priority = priority.value(),
            parent_id = ?parent,
            "Jobs enqueued"
        );
        Ok(created)
    }

    pub fn get(&self, id: JobId) -> Result<Job> {
        let conn = get_conn(&self.db)?;
        jobs::get_job(&conn, id)?.ok_or_else(|| Error::not_found("job", id))
    }

    pub fn list(&self, status: Option<JobStatus>, offset: i64, limit: i64) -> Result<Vec<Job>> {
        let conn = get_conn(&self.db)?;
        jobs::list_jobs(&conn, status, offset, limit)
    }

    /// Direct children of `parent_id`, read fresh from the store.
    pub fn children(&self, parent_id: JobId) -> Result<Vec<Job>> {
        let conn = get_conn(&self.db)?;
        jobs::list_children(&conn, parent_id)
    }

    /// Submit a fresh copy of an errored job.
    ///
    /// The copy keeps the type, payload, priority and parent. The original
    /// stays in the Error state.
    pub fn resubmit(&self, id: JobId) -> Result<Job> {
        let conn = get_conn(&self.db)?;
        let original = jobs::get_job(&conn, id)?.ok_or_else(|| Error::not_found("job", id))?;
        if original.status != JobStatus::Error {
            return Err(Error::Validation(format!(
                "job {id} is {}, only errored jobs can be resubmitted",
                original.status
            )));
        }

        let copy = jobs::create_job(
            &conn,
            &original.job_type,
            &original.payload,
            original.priority,
            original.parent_id,
        )?;
        tracing::info!(original = %id, job_id = %copy.id, job_type = %copy.job_type, "Job resubmitted");
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{GenerateChecksumPayload, RefreshFields, RefreshMetadataPayload};
    use rv_core::VideoId;
    use rv_db::pool::init_memory_pool;

    fn checksum_job() -> JobPayload {
        JobPayload::GenerateChecksum(GenerateChecksumPayload {})
    }

    #[test]
    fn enqueue_all_writes_children_in_order() {
        let queue = JobQueue::new(init_memory_pool().unwrap());
        let parent = queue.enqueue(&checksum_job(), JobPriority::Normal, None).unwrap();
        let batch = queue
            .enqueue_all(
                &[checksum_job(), checksum_job()],
                JobPriority::Lower,
                Some(parent.id),
            )
            .unwrap();

        let children = queue.children(parent.id).unwrap();
        assert_eq!(
            children.iter().map(|j| j.id).collect::<Vec<_>>(),
            batch.iter().map(|j| j.id).collect::<Vec<_>>()
        );
        assert!(children
            .iter()
            .all(|j| j.job_type == "GenerateChecksum" && j.priority == JobPriority::Lower));
        assert!(queue.enqueue_all(&[], JobPriority::Normal, None).unwrap().is_empty());
    }

    #[test]
    fn enqueue_stores_type_and_body() {
        let queue = JobQueue::new(init_memory_pool().unwrap());
        let video = VideoId::new();
        let job = queue
            .enqueue(
                &JobPayload::RefreshMetadata(RefreshMetadataPayload {
                    media_id: video,
                    refresh_fields: RefreshFields {
                        size: true,
                        checksum: false,
                    },
                }),
                JobPriority::High,
                None,
            )
            .unwrap();

        let stored = queue.get(job.id).unwrap();
        assert_eq!(stored.job_type, "RefreshMetadata");
        assert_eq!(stored.status, JobStatus::NotStarted);
        assert_eq!(stored.priority, JobPriority::High);
        assert!(stored.payload.contains(&video.to_string()));
    }

    #[test]
    fn get_unknown_is_not_found() {
        let queue = JobQueue::new(init_memory_pool().unwrap());
        assert!(matches!(queue.get(JobId::new()), Err(Error::NotFound { .. })));
    }

    #[test]
    fn children_follow_parent() {
        let queue = JobQueue::new(init_memory_pool().unwrap());
        let parent = queue.enqueue(&checksum_job(), JobPriority::Normal, None).unwrap();
        let child = queue
            .enqueue(&checksum_job(), JobPriority::Normal, Some(parent.id))
            .unwrap();

        let children = queue.children(parent.id).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child.id);
        assert_eq!(children[0].parent_id, Some(parent.id));
        assert!(queue.children(child.id).unwrap().is_empty());
    }

    #[test]
    fn resubmit_copies_errored_job() {
        let db = init_memory_pool().unwrap();
        let queue = JobQueue::new(db.clone());
        let parent = queue.enqueue(&checksum_job(), JobPriority::Normal, None).unwrap();
        let job = queue
            .enqueue(&checksum_job(), JobPriority::Lower, Some(parent.id))
            .unwrap();

        // Not errored yet.
        assert!(matches!(queue.resubmit(job.id), Err(Error::Validation(_))));

        {
            let conn = db.get().unwrap();
            jobs::claim_next(&conn).unwrap();
            jobs::claim_next(&conn).unwrap();
            jobs::fail_job(&conn, job.id, "boom").unwrap();
        }

        let copy = queue.resubmit(job.id).unwrap();
        assert_ne!(copy.id, job.id);
        assert_eq!(copy.status, JobStatus::NotStarted);
        assert_eq!(copy.priority, JobPriority::Lower);
        assert_eq!(copy.parent_id, Some(parent.id));
        assert_eq!(copy.payload, job.payload);
        assert_eq!(queue.get(job.id).unwrap().status, JobStatus::Error);
    }

    #[test]
    fn list_filters_by_status() {
        let queue = JobQueue::new(init_memory_pool().unwrap());
        queue.enqueue(&checksum_job(), JobPriority::Normal, None).unwrap();
        queue.enqueue(&checksum_job(), JobPriority::Normal, None).unwrap();

        assert_eq!(queue.list(None, 0, 10).unwrap().len(), 2);
        assert_eq!(queue.list(Some(JobStatus::NotStarted), 0, 1).unwrap().len(), 1);
        assert!(queue.list(Some(JobStatus::Completed), 0, 10).unwrap().is_empty());
    }
}
