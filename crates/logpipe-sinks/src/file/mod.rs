//! Buffered, self-rotating file sink.
//!
//! # Layout
//!
//! - live file: `<dir>/<file_name>`
//! - archives: `<dir>/<YYYY-MM-DD>/<file_name>.<YYYY-MM-DD>.<N>`
//!
//! The archive day is the live file's last modification day. Rotation is
//! decided per physical write from the *event* timestamp, so buffered events
//! rotate on the day they happened rather than the day they were flushed.
//!
//! # Modes
//!
//! In synchronous mode every `write` goes straight to disk. In asynchronous
//! mode rendered text is buffered; the buffer is written as soon as it grows
//! past the threshold, or by a delayed flush that runs `flush_interval` after
//! the first unflushed write. At most one delayed flush is pending per sink.
//!
//! All runtime I/O failures are counted in [`HandlerStats::errors`], logged
//! under the `logpipe::sink` target, and retried on the next write.

mod buffer;
mod retention;
mod rotation;
mod timer;

pub use buffer::{AsyncBuffer, Drained};
pub use retention::{RetentionReport, remove_expired};
pub use rotation::{DAY_DIR_LAYOUT, needs_rotation, rotated_path};
pub use timer::FlushTimer;

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Local};
use logpipe_core::logging::{debug, targets, warn};
use logpipe_core::{Handler, HandlerStats, LogEvent, ProcessIdentity, StatsCounter};

struct OpenFile {
    file: File,
    dir: PathBuf,
    name: String,
}

impl OpenFile {
    fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

struct SinkState {
    file_name: String,
    dir_path: PathBuf,
    max_age_days: u32,
    max_size: u64,
    async_mode: bool,
    flush_interval: Duration,
    buffer: AsyncBuffer,
    open: Option<OpenFile>,
    file_size: u64,
    last_modified: Option<DateTime<Local>>,
    closed: bool,
}

impl SinkState {
    fn ensure_open(&mut self, stats: &StatsCounter) {
        if self.open.is_some() {
            return;
        }
        if let Err(err) = fs::create_dir_all(&self.dir_path) {
            stats.record_error();
            warn!(target: targets::SINK, "Cannot create {}: {}", self.dir_path.display(), err);
            return;
        }
        let path = self.dir_path.join(&self.file_name);
        let file = match open_append(&path) {
            Ok(file) => file,
            Err(err) => {
                stats.record_error();
                warn!(target: targets::SINK, "Cannot open {}: {}", path.display(), err);
                return;
            }
        };
        let (size, modified) = match file.metadata() {
            Ok(meta) => (
                meta.len(),
                meta.modified().map_or_else(|_| Local::now(), DateTime::<Local>::from),
            ),
            Err(err) => {
                stats.record_error();
                debug!(target: targets::SINK, "Cannot stat {}: {}", path.display(), err);
                (0, Local::now())
            }
        };
        self.file_size = size;
        self.last_modified = Some(modified);
        self.closed = false;
        self.open = Some(OpenFile {
            file,
            dir: self.dir_path.clone(),
            name: self.file_name.clone(),
        });
    }

    fn rotate_if_needed(&mut self, event_time: DateTime<Local>, stats: &StatsCounter) {
        let Some(last_modified) = self.last_modified else {
            return;
        };
        if !needs_rotation(last_modified, event_time, self.file_size, self.max_size) {
            return;
        }
        let Some(current) = self.open.take() else {
            return;
        };
        let OpenFile { file, dir, name } = current;
        let live = dir.join(&name);
        let archive_root = dir.clone();
        let (day_dir, target) = rotated_path(&dir, &name, last_modified);

        if let Err(err) = fs::create_dir_all(&day_dir) {
            stats.record_error();
            warn!(target: targets::SINK, "Cannot create {}: {}", day_dir.display(), err);
            self.open = Some(OpenFile { file, dir, name });
            return;
        }
        if let Err(err) = fs::rename(&live, &target) {
            stats.record_error();
            warn!(
                target: targets::SINK,
                "Cannot rotate {} to {}: {}",
                live.display(),
                target.display(),
                err
            );
            // Keep appending to the live file until a rename succeeds.
            self.open = Some(OpenFile { file, dir, name });
            return;
        }
        drop(file);
        match open_append(&live) {
            Ok(file) => self.open = Some(OpenFile { file, dir, name }),
            Err(err) => {
                stats.record_error();
                warn!(target: targets::SINK, "Cannot reopen {}: {}", live.display(), err);
                self.reset_position();
                return;
            }
        }
        self.last_modified = Some(event_time);
        self.file_size = 0;
        stats.record_rotation();
        debug!(target: targets::SINK, "Rotated {} to {}", live.display(), target.display());

        let report = remove_expired(&archive_root, event_time, self.max_age_days);
        for _ in 0..report.errors {
            stats.record_error();
        }
    }

    fn write_out(&mut self, event_time: DateTime<Local>, text: &str, stats: &StatsCounter) {
        self.ensure_open(stats);
        self.rotate_if_needed(event_time, stats);
        let Some(open) = self.open.as_mut() else {
            stats.record_error();
            return;
        };
        match open.file.write_all(text.as_bytes()) {
            Ok(()) => {
                self.last_modified = Some(event_time);
                self.file_size += text.len() as u64;
                stats.record_write(text.len());
            }
            Err(err) => {
                stats.record_error();
                warn!(target: targets::SINK, "Write to {} failed: {}", open.path().display(), err);
            }
        }
    }

    fn flush_buffer(&mut self, stats: &StatsCounter) {
        if let Some(drained) = self.buffer.drain() {
            self.write_out(drained.last_event_time, &drained.text, stats);
        }
    }

    fn reset_position(&mut self) {
        self.open = None;
        self.file_size = 0;
        self.last_modified = None;
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// File sink with day and size rotation, retention and optional buffering.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use logpipe_core::ProcessIdentity;
/// use logpipe_sinks::RotatingFileSink;
///
/// let sink = RotatingFileSink::new(&ProcessIdentity::default())
///     .with_dir_path("/var/log/myapp")
///     .with_max_size(64 * 1024 * 1024)
///     .with_async(true)
///     .with_flush_interval(Duration::from_millis(500));
/// ```
pub struct RotatingFileSink {
    state: Arc<Mutex<SinkState>>,
    stats: Arc<StatsCounter>,
    timer: FlushTimer,
}

impl RotatingFileSink {
    /// Default retention in days.
    pub const DEFAULT_MAX_AGE_DAYS: u32 = 7;

    /// Default delay of the asynchronous flush.
    pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

    /// Default asynchronous buffer threshold in bytes.
    pub const DEFAULT_BUFFER_THRESHOLD: usize = 8192;

    /// Creates a closed sink writing `/var/log/<program>/<program>.log`.
    #[must_use]
    pub fn new(identity: &ProcessIdentity) -> Self {
        let program = identity.program();
        Self {
            state: Arc::new(Mutex::new(SinkState {
                file_name: format!("{program}.log"),
                dir_path: PathBuf::from("/var/log").join(program),
                max_age_days: Self::DEFAULT_MAX_AGE_DAYS,
                max_size: 0,
                async_mode: false,
                flush_interval: Self::DEFAULT_FLUSH_INTERVAL,
                buffer: AsyncBuffer::new(Self::DEFAULT_BUFFER_THRESHOLD),
                open: None,
                file_size: 0,
                last_modified: None,
                closed: true,
            })),
            stats: Arc::new(StatsCounter::new()),
            timer: FlushTimer::new(),
        }
    }

    /// Builder-style [`set_file_name`](Self::set_file_name).
    #[must_use]
    pub fn with_file_name(self, file_name: impl Into<String>) -> Self {
        self.set_file_name(file_name);
        self
    }

    /// Builder-style [`set_dir_path`](Self::set_dir_path).
    #[must_use]
    pub fn with_dir_path(self, dir_path: impl Into<PathBuf>) -> Self {
        self.set_dir_path(dir_path);
        self
    }

    /// Builder-style [`set_max_age_days`](Self::set_max_age_days).
    #[must_use]
    pub fn with_max_age_days(self, days: u32) -> Self {
        self.set_max_age_days(days);
        self
    }

    /// Builder-style [`set_max_size`](Self::set_max_size).
    #[must_use]
    pub fn with_max_size(self, bytes: u64) -> Self {
        self.set_max_size(bytes);
        self
    }

    /// Builder-style [`set_async`](Self::set_async).
    #[must_use]
    pub fn with_async(self, enabled: bool) -> Self {
        self.set_async(enabled);
        self
    }

    /// Builder-style [`set_flush_interval`](Self::set_flush_interval).
    #[must_use]
    pub fn with_flush_interval(self, interval: Duration) -> Self {
        self.set_flush_interval(interval);
        self
    }

    /// Builder-style [`set_buffer_threshold`](Self::set_buffer_threshold).
    #[must_use]
    pub fn with_buffer_threshold(self, bytes: usize) -> Self {
        self.set_buffer_threshold(bytes);
        self
    }

    /// Live file name. An already open file keeps its path until closed.
    pub fn set_file_name(&self, file_name: impl Into<String>) {
        self.lock().file_name = file_name.into();
    }

    /// Log directory. An already open file keeps its path until closed.
    pub fn set_dir_path(&self, dir_path: impl Into<PathBuf>) {
        self.lock().dir_path = dir_path.into();
    }

    /// Days of archives kept by retention.
    pub fn set_max_age_days(&self, days: u32) {
        self.lock().max_age_days = days;
    }

    /// Size in bytes that triggers rotation; 0 disables size rotation.
    pub fn set_max_size(&self, bytes: u64) {
        self.lock().max_size = bytes;
    }

    /// Switches buffering on or off.
    ///
    /// Turning buffering off writes out everything buffered so far first.
    pub fn set_async(&self, enabled: bool) {
        let mut state = self.lock();
        if state.async_mode == enabled {
            return;
        }
        if state.async_mode {
            state.flush_buffer(&self.stats);
            self.timer.cancel();
        }
        state.async_mode = enabled;
    }

    /// Delay between the first unflushed write and the delayed flush.
    pub fn set_flush_interval(&self, interval: Duration) {
        self.lock().flush_interval = interval;
    }

    /// Buffered size past which a write flushes immediately.
    pub fn set_buffer_threshold(&self, bytes: usize) {
        self.lock().buffer.set_threshold(bytes);
    }

    /// Configured live file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.lock().file_name.clone()
    }

    /// Configured log directory.
    #[must_use]
    pub fn dir_path(&self) -> PathBuf {
        self.lock().dir_path.clone()
    }

    /// Configured live file path.
    #[must_use]
    pub fn live_path(&self) -> PathBuf {
        let state = self.lock();
        state.dir_path.join(&state.file_name)
    }

    #[must_use]
    pub fn max_age_days(&self) -> u32 {
        self.lock().max_age_days
    }

    #[must_use]
    pub fn max_size(&self) -> u64 {
        self.lock().max_size
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.lock().async_mode
    }

    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        self.lock().flush_interval
    }

    #[must_use]
    pub fn buffer_threshold(&self) -> usize {
        self.lock().buffer.threshold()
    }

    /// Bytes in the live file as tracked by the sink.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.lock().file_size
    }

    /// Bytes waiting in the asynchronous buffer.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Whether a delayed flush is waiting to run.
    #[must_use]
    pub fn flush_pending(&self) -> bool {
        self.timer.is_pending()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_flush(&self, state: &mut SinkState) {
        if self.timer.is_pending() {
            return;
        }
        let weak: Weak<Mutex<SinkState>> = Arc::downgrade(&self.state);
        let stats = Arc::clone(&self.stats);
        let scheduled = self.timer.schedule(state.flush_interval, move || {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return;
            }
            state.flush_buffer(&stats);
        });
        if !scheduled && !self.timer.is_pending() {
            state.flush_buffer(&self.stats);
        }
    }
}

impl Handler for RotatingFileSink {
    fn name(&self) -> &str {
        "RotatingFileSink"
    }

    fn is_opened(&self) -> bool {
        self.lock().open.is_some()
    }

    fn open(&self) {
        let mut state = self.lock();
        state.ensure_open(&self.stats);
    }

    fn write(&self, _logger_name: &str, event: &LogEvent, rendered: &str) {
        let mut state = self.lock();
        state.closed = false;
        if !state.async_mode {
            state.write_out(event.timestamp(), rendered, &self.stats);
            return;
        }
        match state.buffer.push(rendered, event.timestamp()) {
            Some(drained) => {
                state.write_out(drained.last_event_time, &drained.text, &self.stats);
            }
            None => self.schedule_flush(&mut state),
        }
    }

    fn flush(&self) {
        let mut state = self.lock();
        if state.async_mode {
            state.flush_buffer(&self.stats);
        }
        if let Some(open) = state.open.as_ref() {
            if let Err(err) = open.file.sync_all() {
                self.stats.record_error();
                debug!(target: targets::SINK, "Sync of {} failed: {}", open.path().display(), err);
            }
        }
        self.stats.record_flush();
    }

    fn close(&self) {
        let mut state = self.lock();
        if state.async_mode {
            state.flush_buffer(&self.stats);
        }
        self.timer.cancel();
        state.reset_position();
        state.closed = true;
    }

    fn stats(&self) -> HandlerStats {
        self.stats.snapshot()
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        let mut state = self.lock();
        if state.async_mode {
            state.flush_buffer(&self.stats);
        }
        self.timer.cancel();
    }
}

impl fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RotatingFileSink")
            .field("path", &state.dir_path.join(&state.file_name))
            .field("max_age_days", &state.max_age_days)
            .field("max_size", &state.max_size)
            .field("async", &state.async_mode)
            .field("opened", &state.open.is_some())
            .finish_non_exhaustive()
    }
}
