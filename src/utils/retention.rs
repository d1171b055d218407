//! Retention sweeper: removes backup entries older than the retention window

use crate::error::RetentionError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Result of one sweep
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Entries deleted (or already gone when deletion was attempted)
    pub removed: Vec<PathBuf>,
    /// Entries that could not be inspected or deleted
    pub failures: Vec<RetentionError>,
    /// Entries inspected
    pub scanned: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Age in fractional days; timestamps in the future count as age zero
pub fn age_in_days(modified: SystemTime, now: SystemTime) -> f64 {
    now.duration_since(modified)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
        / SECONDS_PER_DAY
}

/// Delete every immediate child of `root` whose age is strictly greater than
/// `retention_days`. Directories are removed recursively. A missing root is a no-op.
pub async fn sweep(root: &Path, retention_days: u32, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Backup root {:?} does not exist, nothing to sweep", root);
            return report;
        }
        Err(source) => {
            warn!("Failed to list backup root {:?}: {}", root, source);
            report.failures.push(RetentionError {
                path: root.to_path_buf(),
                source,
            });
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                report.failures.push(RetentionError {
                    path: root.to_path_buf(),
                    source,
                });
                break;
            }
        };
        report.scanned += 1;

        let path = entry.path();
        let metadata = match tokio::fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(source) => {
                warn!("Failed to inspect {:?}: {}", path, source);
                report.failures.push(RetentionError { path, source });
                continue;
            }
        };

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(source) => {
                report.failures.push(RetentionError { path, source });
                continue;
            }
        };

        let age = age_in_days(modified, now);
        if age <= f64::from(retention_days) {
            continue;
        }

        match remove_entry(&path, metadata.is_dir()).await {
            Ok(()) => {
                info!("Removed expired backup {:?} ({:.1} days old)", path, age);
                report.removed.push(path);
            }
            Err(source) => {
                warn!("Failed to remove expired backup {:?}: {}", path, source);
                report.failures.push(RetentionError { path, source });
            }
        }
    }

    report
}

async fn remove_entry(path: &Path, is_dir: bool) -> std::io::Result<()> {
    let result = if is_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
