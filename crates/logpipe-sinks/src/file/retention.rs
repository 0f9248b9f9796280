//! Removal of expired day directories.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Local, NaiveDate};

use super::rotation::DAY_DIR_LAYOUT;
use logpipe_core::logging::{debug, targets};

/// What a retention pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    /// Day directories that were deleted.
    pub removed: Vec<PathBuf>,
    /// Failures while listing or deleting.
    pub errors: u64,
}

/// Deletes day directories under `dir` dated strictly before
/// `newest - max_age_days` (compared by calendar day).
///
/// Entries that are not directories, or whose names do not parse as
/// `YYYY-MM-DD`, are left alone.
pub fn remove_expired(dir: &Path, newest: DateTime<Local>, max_age_days: u32) -> RetentionReport {
    let mut report = RetentionReport::default();
    let Some(cutoff) = newest
        .date_naive()
        .checked_sub_days(Days::new(u64::from(max_age_days)))
    else {
        return report;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(target: targets::SINK, "Cannot list {}: {}", dir.display(), err);
            report.errors += 1;
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => {
                report.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let Some(date) = parse_day(&entry.file_name().to_string_lossy()) else {
            continue;
        };
        if date < cutoff {
            let path = entry.path();
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    debug!(target: targets::SINK, "Removed expired {}", path.display());
                    report.removed.push(path);
                }
                Err(err) => {
                    debug!(target: targets::SINK, "Cannot remove {}: {}", path.display(), err);
                    report.errors += 1;
                }
            }
        }
    }
    report
}

fn parse_day(name: &str) -> Option<NaiveDate> {
    // Reject loose forms such as "2024-1-5" that chrono would otherwise accept.
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, DAY_DIR_LAYOUT).ok()
}
