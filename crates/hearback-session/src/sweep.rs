use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Default retention for transient capture files: 7 days.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files examined.
    pub scanned: usize,
    /// Files removed because they were older than the retention window.
    pub deleted: usize,
    /// Files that could not be inspected or removed.
    pub failed: usize,
}

/// Prunes stale files from the transient capture directory used by the
/// collection agent for ephemeral clipboard images.
///
/// Knows nothing about sessions and never descends into subdirectories, so
/// persistent session storage is out of its reach.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    transient_root: PathBuf,
    max_age: Duration,
}

impl RetentionSweeper {
    /// Sweeper for `transient_root` with the given retention window.
    pub fn new(transient_root: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            transient_root: transient_root.into(),
            max_age,
        }
    }

    /// Directory being swept.
    pub fn transient_root(&self) -> &Path {
        &self.transient_root
    }

    /// Delete regular files directly under the root whose modification time
    /// is older than the retention window. Never fails: problems are logged
    /// and counted.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.transient_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.transient_root.display(), "Transient root absent, nothing to sweep");
                return report;
            }
            Err(e) => {
                warn!(root = %self.transient_root.display(), error = %e, "Cannot list transient root");
                return report;
            }
        };

        let now = SystemTime::now();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(root = %self.transient_root.display(), error = %e, "Listing interrupted");
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat transient file");
                    report.failed += 1;
                    continue;
                }
            }
            report.scanned += 1;

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read modification time");
                    report.failed += 1;
                    continue;
                }
            };

            // mtimes in the future count as fresh
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };
            if age <= self.max_age {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Removed stale transient file");
                    report.deleted += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove stale transient file");
                    report.failed += 1;
                }
            }
        }

        info!(
            root = %self.transient_root.display(),
            scanned = report.scanned,
            deleted = report.deleted,
            failed = report.failed,
            "Retention sweep finished"
        );
        report
    }
}
