//! Job queue operations.
//!
//! Jobs are selected strictly by creation order; priority is stored for
//! reporting and future schedulers but never consulted by [`claim_next`].

use rusqlite::Connection;
use rv_core::{Error, JobId, Result};

use crate::models::{Job, JobPriority, JobStatus};

const COLS: &str = "id, parent_id, job_type, status, priority, payload, outcome,
    created_at, updated_at";

/// Create a new NotStarted job.
///
/// `parent_id` must reference an already-persisted job.
pub fn create_job(
    conn: &Connection,
    job_type: &str,
    payload: &str,
    priority: JobPriority,
    parent_id: Option<JobId>,
) -> Result<Job> {
    let id = JobId::new();
    let now = crate::now();

    conn.execute(
        "INSERT INTO jobs (id, parent_id, job_type, status, priority, payload, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'not_started', ?4, ?5, ?6, ?6)",
        rusqlite::params![
            id.to_string(),
            parent_id.map(|p| p.to_string()),
            job_type,
            priority.value(),
            payload,
            &now
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Job {
        id,
        parent_id,
        job_type: job_type.to_string(),
        status: JobStatus::NotStarted,
        priority,
        payload: payload.to_string(),
        outcome: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Create several NotStarted jobs sharing a priority and parent.
///
/// `jobs` holds `(job_type, payload)` pairs. Either every job is written
/// or none is.
pub fn create_jobs(
    conn: &Connection,
    jobs: &[(&str, &str)],
    priority: JobPriority,
    parent_id: Option<JobId>,
) -> Result<Vec<Job>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let created = jobs
        .iter()
        .map(|(job_type, payload)| create_job(&tx, job_type, payload, priority, parent_id))
        .collect::<Result<Vec<_>>>()?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(created)
}

/// Get a job by ID.
pub fn get_job(conn: &Connection, id: JobId) -> Result<Option<Job>> {
    let q = format!("SELECT {COLS} FROM jobs WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Job::from_row);
    match result {
        Ok(j) => Ok(Some(j)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List jobs in creation order with optional status filter and pagination.
pub fn list_jobs(
    conn: &Connection,
    status: Option<JobStatus>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Job>> {
    let q = format!(
        "SELECT {COLS} FROM jobs WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at ASC, rowid ASC LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![status.map(|s| s.as_str()), limit, offset],
            Job::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List the direct children of a job in creation order.
pub fn list_children(conn: &Connection, parent_id: JobId) -> Result<Vec<Job>> {
    let q = format!("SELECT {COLS} FROM jobs WHERE parent_id = ?1 ORDER BY created_at ASC, rowid ASC");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([parent_id.to_string()], Job::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Count jobs currently in `status`.
pub fn count_by_status(conn: &Connection, status: JobStatus) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM jobs WHERE status = ?1",
        [status.as_str()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Atomically claim the oldest NotStarted job and mark it Running.
pub fn claim_next(conn: &Connection) -> Result<Option<Job>> {
    let now = crate::now();

    // SQLite RETURNING is supported since 3.35.
    let q = format!(
        "UPDATE jobs SET status = 'running', updated_at = ?1
         WHERE id = (
             SELECT id FROM jobs WHERE status = 'not_started'
             ORDER BY created_at ASC, rowid ASC LIMIT 1
         )
         RETURNING {COLS}"
    );

    let result = conn.query_row(&q, [&now], Job::from_row);
    match result {
        Ok(j) => Ok(Some(j)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Mark a Running job as Completed, optionally recording an outcome note.
pub fn complete_job(conn: &Connection, id: JobId, outcome: Option<&str>) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE jobs SET status = 'completed', outcome = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'running'",
            rusqlite::params![outcome, crate::now(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Mark a Running job as Error, storing the failure message as its outcome.
pub fn fail_job(conn: &Connection, id: JobId, error: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE jobs SET status = 'error', outcome = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'running'",
            rusqlite::params![error, crate::now(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
