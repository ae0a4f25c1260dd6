//! Library reconciliation.
//!
//! One pass compares what is on disk under a library root with the catalog
//! entries recorded for it. Files that disappeared are soft-tombstoned
//! (`on_disk = 0`), new files are probed and inserted in batches. Rows are
//! never removed and the user-owned `deleted` flag is never touched.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rv_av::Prober;
use rv_core::config::ScanConfig;
use rv_core::{Error, LibraryId, Result};
use rv_db::models::{LibraryPath, NewVideo, Video};
use rv_db::pool::{get_conn, DbPool};
use rv_db::queries::{library_paths, videos};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::checksum::{ChecksumEnricher, ChecksumReport};
use crate::crawler::{crawl, VIDEO_EXTENSIONS};

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Video files found on disk.
    pub discovered: usize,
    pub inserted: usize,
    pub tombstoned: usize,
    pub probe_failures: usize,
    pub tombstone_failures: usize,
    /// Result of the follow-up checksum sweep, when it ran.
    pub checksums: Option<ChecksumReport>,
}

pub struct Reconciler {
    db: DbPool,
    prober: Arc<dyn Prober>,
    config: ScanConfig,
}

async fn join_blocking<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {e}")))?
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().into_owned())
}

impl Reconciler {
    pub fn new(db: DbPool, prober: Arc<dyn Prober>, config: ScanConfig) -> Self {
        Self { db, prober, config }
    }

    /// Reconcile `root` for `library_id`, registering the root as a library
    /// path on first sight.
    pub async fn reconcile(&self, library_id: LibraryId, root: &Path) -> Result<ScanReport> {
        let root = tokio::fs::canonicalize(root).await?;
        let library_path = {
            let conn = get_conn(&self.db)?;
            library_paths::find_or_create_library_path(
                &conn,
                library_id,
                &root.to_string_lossy(),
            )?
        };
        self.reconcile_path(&library_path).await
    }

    /// Reconcile an already-registered library path.
    pub async fn reconcile_path(&self, library_path: &LibraryPath) -> Result<ScanReport> {
        let root = tokio::fs::canonicalize(&library_path.root_path).await?;
        let lp_id = library_path.id;

        tracing::info!(
            library_path_id = %lp_id,
            root = %root.display(),
            "Starting reconciliation"
        );

        let db = self.db.clone();
        let load = tokio::task::spawn_blocking(move || {
            let conn = get_conn(&db)?;
            videos::list_on_disk_for_path(&conn, lp_id)
        });
        let walk_root = root.clone();
        let walk = tokio::task::spawn_blocking(move || crawl(&walk_root, VIDEO_EXTENSIONS));

        let (existing, crawled) = tokio::try_join!(join_blocking(load), join_blocking(walk))?;

        let mut report = ScanReport {
            discovered: crawled.len(),
            ..Default::default()
        };

        let crawled: BTreeMap<String, PathBuf> = crawled
            .into_iter()
            .filter_map(|p| relative_key(&root, &p).map(|k| (k, p)))
            .collect();
        let existing: HashMap<String, Video> = existing
            .into_iter()
            .map(|v| (v.relative_path.clone(), v))
            .collect();

        let stale: Vec<&Video> = existing
            .values()
            .filter(|v| !crawled.contains_key(&v.relative_path))
            .collect();
        self.tombstone(&stale, &mut report)?;

        let fresh: Vec<(&String, &PathBuf)> = crawled
            .iter()
            .filter(|(rel, _)| !existing.contains_key(*rel))
            .collect();

        let batch_size = self.config.batch_size.max(1);
        let mut pending: Vec<NewVideo> = Vec::with_capacity(batch_size);

        for (rel, path) in fresh {
            let probe = match self.prober.probe(path).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        prober = self.prober.name(),
                        error = %e,
                        "Probe failed, skipping file"
                    );
                    report.probe_failures += 1;
                    continue;
                }
            };

            let (width, height) = probe.dimensions().unwrap_or_else(|e| {
                tracing::debug!(path = %path.display(), error = %e, "No dimensions, recording 0x0");
                (0, 0)
            });

            pending.push(NewVideo {
                relative_path: rel.clone(),
                title: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                file_name: path
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                width: i64::from(width),
                height: i64::from(height),
                runtime_secs: probe.duration_secs().unwrap_or(0.0),
                size_bytes: probe.size_bytes().unwrap_or(0),
            });

            if pending.len() >= batch_size {
                report.inserted += self.flush(lp_id, &mut pending)?;
            }
        }
        if !pending.is_empty() {
            report.inserted += self.flush(lp_id, &mut pending)?;
        }

        if self.config.checksum_after_scan {
            match ChecksumEnricher::new(self.db.clone()).run().await {
                Ok(sums) => report.checksums = Some(sums),
                Err(e) => tracing::warn!(error = %e, "Checksum sweep after scan failed"),
            }
        }

        tracing::info!(
            library_path_id = %lp_id,
            discovered = report.discovered,
            inserted = report.inserted,
            tombstoned = report.tombstoned,
            probe_failures = report.probe_failures,
            tombstone_failures = report.tombstone_failures,
            "Reconciliation finished"
        );

        Ok(report)
    }

    fn tombstone(&self, stale: &[&Video], report: &mut ScanReport) -> Result<()> {
        if stale.is_empty() {
            return Ok(());
        }
        let conn = get_conn(&self.db)?;
        for video in stale {
            match videos::set_on_disk(&conn, video.id, false) {
                Ok(_) => {
                    tracing::debug!(video_id = %video.id, path = %video.relative_path, "Tombstoned missing file");
                    report.tombstoned += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        video_id = %video.id,
                        path = %video.relative_path,
                        error = %e,
                        "Failed to tombstone missing file"
                    );
                    report.tombstone_failures += 1;
                }
            }
        }
        Ok(())
    }

    fn flush(&self, lp_id: rv_core::LibraryPathId, pending: &mut Vec<NewVideo>) -> Result<usize> {
        let conn = get_conn(&self.db)?;
        let written = videos::insert_batch(&conn, lp_id, pending)?;
        tracing::debug!(library_path_id = %lp_id, rows = written, "Flushed catalog batch");
        pending.clear();
        Ok(written)
    }
}
