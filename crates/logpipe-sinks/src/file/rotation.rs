//! Rotation predicate and archive naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// strftime layout of per-day archive directories (`YYYY-MM-DD`).
pub const DAY_DIR_LAYOUT: &str = "%Y-%m-%d";

/// Returns true when the live file must be rotated before writing an event
/// stamped `event_time`.
///
/// Two triggers, either one suffices: the event falls on a different calendar
/// day than the file's last modification, or a positive `max_size` has been
/// reached.
#[must_use]
pub fn needs_rotation(
    last_modified: DateTime<Local>,
    event_time: DateTime<Local>,
    file_size: u64,
    max_size: u64,
) -> bool {
    last_modified.date_naive() != event_time.date_naive() || (max_size > 0 && file_size >= max_size)
}

/// Archive location for a live file last modified at `last_modified`.
///
/// Returns the day directory and the first free
/// `<day_dir>/<file_name>.<YYYY-MM-DD>.<N>` path, counting `N` up from 1.
#[must_use]
pub fn rotated_path(
    dir: &Path,
    file_name: &str,
    last_modified: DateTime<Local>,
) -> (PathBuf, PathBuf) {
    let day = last_modified.format(DAY_DIR_LAYOUT).to_string();
    let day_dir = dir.join(&day);
    let mut index: u64 = 1;
    loop {
        let candidate = day_dir.join(format!("{file_name}.{day}.{index}"));
        if !candidate.exists() {
            return (day_dir, candidate);
        }
        index += 1;
    }
}
