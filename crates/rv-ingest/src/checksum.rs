//! Content checksum enrichment.
//!
//! Sweeps catalog entries that are on disk and still lack a checksum,
//! user-deleted ones included, hashing each file with MD5. Entries that fail are left NULL and
//! picked up again by the next sweep.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rv_core::{Error, Result};
use rv_db::pool::{get_conn, DbPool};
use rv_db::queries::videos;
use serde::Serialize;

const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of one checksum sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChecksumReport {
    pub examined: usize,
    pub updated: usize,
    pub failures: usize,
}

/// Lowercase hex MD5 of a file's full contents.
pub fn file_md5(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut ctx = md5::Context::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

#[derive(Clone)]
pub struct ChecksumEnricher {
    db: DbPool,
}

impl ChecksumEnricher {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Run a sweep on the blocking thread pool.
    pub async fn run(&self) -> Result<ChecksumReport> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.run_blocking())
            .await
            .map_err(|e| Error::Internal(format!("checksum task failed: {e}")))?
    }

    /// Run a sweep on the current thread.
    pub fn run_blocking(&self) -> Result<ChecksumReport> {
        let conn = get_conn(&self.db)?;
        let pending = videos::list_missing_checksum(&conn)?;
        let mut report = ChecksumReport {
            examined: pending.len(),
            ..Default::default()
        };

        for (video, root) in pending {
            let path = Path::new(&root).join(&video.relative_path);
            let outcome = file_md5(&path)
                .and_then(|sum| videos::set_checksum(&conn, video.id, &sum));
            match outcome {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    tracing::warn!(
                        video_id = %video.id,
                        path = %path.display(),
                        error = %e,
                        "Failed to checksum catalog entry"
                    );
                    report.failures += 1;
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            updated = report.updated,
            failures = report.failures,
            "Checksum sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_db::models::NewVideo;
    use rv_db::pool::init_memory_pool;
    use rv_db::queries::{libraries, library_paths};

    fn new_video(rel: &str) -> NewVideo {
        NewVideo {
            relative_path: rel.into(),
            title: rel.into(),
            file_name: rel.into(),
            width: 0,
            height: 0,
            runtime_secs: 0.0,
            size_bytes: 0,
        }
    }

    #[test]
    fn md5_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.mkv");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(file_md5(&path).unwrap(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn md5_spans_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.mkv");
        let data = vec![7u8; CHUNK_SIZE * 2 + 13];
        std::fs::write(&path, &data).unwrap();
        assert_eq!(file_md5(&path).unwrap(), format!("{:x}", md5::compute(&data)));
    }

    #[tokio::test]
    async fn sweep_converges() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"first").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"second").unwrap();

        let pool = init_memory_pool().unwrap();
        {
            let conn = pool.get().unwrap();
            let lib = libraries::create_library(&conn, "L").unwrap();
            let root = dir.path().to_string_lossy().to_string();
            let lp = library_paths::create_library_path(&conn, lib.id, &root).unwrap();
            videos::insert_batch(
                &conn,
                lp.id,
                &[new_video("a.mp4"), new_video("b.mp4"), new_video("missing.mp4")],
            )
            .unwrap();
        }

        let enricher = ChecksumEnricher::new(pool.clone());
        let first = enricher.run().await.unwrap();
        assert_eq!(
            first,
            ChecksumReport {
                examined: 3,
                updated: 2,
                failures: 1
            }
        );

        // Only the unreadable entry is selected again; nothing new is written.
        let second = enricher.run().await.unwrap();
        assert_eq!(second.examined, 1);
        assert_eq!(second.updated, 0);

        let conn = pool.get().unwrap();
        assert!(videos::list_missing_checksum(&conn)
            .unwrap()
            .iter()
            .all(|(v, _)| v.relative_path == "missing.mp4"));
    }

    #[test]
    fn tombstoned_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gone.mp4"), b"stale").unwrap();
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let lib = libraries::create_library(&conn, "L").unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let lp = library_paths::create_library_path(&conn, lib.id, &root).unwrap();
        videos::insert_batch(&conn, lp.id, &[new_video("gone.mp4")]).unwrap();
        let id = videos::list_on_disk_for_path(&conn, lp.id).unwrap()[0].id;
        videos::set_on_disk(&conn, id, false).unwrap();
        drop(conn);

        let report = ChecksumEnricher::new(pool).run_blocking().unwrap();
        assert_eq!(report, ChecksumReport::default());
    }

    #[test]
    fn user_deleted_entry_is_still_hashed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kept.mp4"), b"abc").unwrap();
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let lib = libraries::create_library(&conn, "L").unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let lp = library_paths::create_library_path(&conn, lib.id, &root).unwrap();
        videos::insert_batch(&conn, lp.id, &[new_video("kept.mp4")]).unwrap();
        let id = videos::list_on_disk_for_path(&conn, lp.id).unwrap()[0].id;
        videos::mark_deleted(&conn, id).unwrap();

        let report = ChecksumEnricher::new(pool.clone()).run_blocking().unwrap();
        assert_eq!(
            report,
            ChecksumReport {
                examined: 1,
                updated: 1,
                failures: 0
            }
        );

        let stored = videos::get_video(&conn, id).unwrap().unwrap();
        assert!(stored.deleted);
        assert_eq!(stored.checksum.as_deref(), Some("900150983cd24fb0d6963f7d28e17f72"));
        assert_eq!(
            ChecksumEnricher::new(pool).run_blocking().unwrap().examined,
            0
        );
    }
}
