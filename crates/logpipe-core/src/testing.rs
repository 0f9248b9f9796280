//! Testing utilities for logpipe pipelines
//!
//! Provides `RecordingHandler` for capturing and asserting on what a logger
//! delivers, plus formatters with predictable output.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::FormatError;
use crate::event::LogEvent;
use crate::formatter::Formatter;
use crate::handler::{Handler, HandlerStats, StatsCounter};

#[derive(Debug, Clone)]
struct Delivery {
    logger_name: String,
    event: LogEvent,
    rendered: String,
}

/// A handler that records every write instead of emitting it.
///
/// Lifecycle calls are counted so tests can check that hot-swaps open and
/// close each handler exactly once.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    deliveries: Mutex<Vec<Delivery>>,
    opened: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
    flushes: AtomicUsize,
    stats: StatsCounter,
}

impl RecordingHandler {
    /// Create a closed recording handler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered strings, in write order
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.with_deliveries(|d| d.iter().map(|x| x.rendered.clone()).collect())
    }

    /// Events, in write order
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.with_deliveries(|d| d.iter().map(|x| x.event.clone()).collect())
    }

    /// Logger names passed to each write
    #[must_use]
    pub fn logger_names(&self) -> Vec<String> {
        self.with_deliveries(|d| d.iter().map(|x| x.logger_name.clone()).collect())
    }

    /// Get output as a single string
    #[must_use]
    pub fn output_string(&self) -> String {
        self.lines().concat()
    }

    /// Number of writes received
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.with_deliveries(Vec::len)
    }

    /// Number of `open` calls
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `close` calls
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Number of `flush` calls
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Discard recorded writes (counters are kept)
    pub fn clear(&self) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn with_deliveries<R>(&self, f: impl FnOnce(&Vec<Delivery>) -> R) -> R {
        let deliveries = self.deliveries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&deliveries)
    }
}

impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        "RecordingHandler"
    }

    fn is_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.opened.store(true, Ordering::SeqCst);
    }

    fn write(&self, logger_name: &str, event: &LogEvent, rendered: &str) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivery {
                logger_name: logger_name.to_string(),
                event: event.clone(),
                rendered: rendered.to_string(),
            });
        self.stats.record_write(rendered.len());
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.stats.record_flush();
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.opened.store(false, Ordering::SeqCst);
    }

    fn stats(&self) -> HandlerStats {
        self.stats.snapshot()
    }
}

/// Renders `<logger>|<LEVEL>|<message>` and counts invocations.
#[derive(Debug, Default)]
pub struct RecordingFormatter {
    calls: AtomicUsize,
}

impl RecordingFormatter {
    /// Create a formatter with a zero call count
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `format` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Formatter for RecordingFormatter {
    fn format(&self, logger_name: &str, event: &LogEvent) -> Result<String, FormatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "{}|{}|{}",
            logger_name,
            event.level().as_str(),
            event.message()
        ))
    }
}

/// A formatter that fails every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingFormatter;

impl Formatter for FailingFormatter {
    fn format(&self, _logger_name: &str, _event: &LogEvent) -> Result<String, FormatError> {
        Err(FormatError::Layout("formatter always fails".to_string()))
    }
}
