//! Output sinks.
//!
//! A [`Handler`] consumes rendered text. Handlers never report runtime
//! failures to the caller: a failing sink counts the error in its
//! [`HandlerStats`] and the logger moves on to the next handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::LogEvent;

/// Capability implemented by every sink.
///
/// `open` and `close` must tolerate redundant calls. Loggers only call
/// `open` when [`is_opened`](Self::is_opened) returns false and always call
/// `close` before discarding a handler.
pub trait Handler: Send + Sync {
    /// Short type name used in diagnostics.
    fn name(&self) -> &str;

    /// Whether the underlying resource is currently open.
    fn is_opened(&self) -> bool;

    /// Acquires the underlying resource.
    fn open(&self);

    /// Emits one rendered event. Must not block indefinitely.
    fn write(&self, logger_name: &str, event: &LogEvent, rendered: &str);

    /// Pushes buffered output toward durable storage.
    fn flush(&self);

    /// Releases the underlying resource.
    fn close(&self);

    /// Counters describing this handler's activity.
    fn stats(&self) -> HandlerStats {
        HandlerStats::default()
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_opened(&self) -> bool {
        (**self).is_opened()
    }

    fn open(&self) {
        (**self).open();
    }

    fn write(&self, logger_name: &str, event: &LogEvent, rendered: &str) {
        (**self).write(logger_name, event, rendered);
    }

    fn flush(&self) {
        (**self).flush();
    }

    fn close(&self) {
        (**self).close();
    }

    fn stats(&self) -> HandlerStats {
        (**self).stats()
    }
}

/// Snapshot of a handler's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Successful physical writes.
    pub writes: u64,
    /// Bytes written.
    pub bytes: u64,
    /// Absorbed runtime errors.
    pub errors: u64,
    /// Completed file rotations.
    pub rotations: u64,
    /// Flushes performed.
    pub flushes: u64,
}

/// Lock-free counters shared by handler implementations.
#[derive(Debug, Default)]
pub struct StatsCounter {
    writes: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
    rotations: AtomicU64,
    flushes: AtomicU64,
}

impl StatsCounter {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful write of `bytes` bytes.
    pub fn record_write(&self, bytes: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records an absorbed error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed rotation.
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a flush.
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HandlerStats {
        HandlerStats {
            writes: self.writes.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let counter = StatsCounter::new();
        counter.record_write(10);
        counter.record_write(5);
        counter.record_error();
        counter.record_rotation();
        counter.record_flush();
        counter.record_flush();

        assert_eq!(
            counter.snapshot(),
            HandlerStats {
                writes: 2,
                bytes: 15,
                errors: 1,
                rotations: 1,
                flushes: 2,
            }
        );
    }

    #[test]
    fn counters_are_shared_across_threads() {
        let counter = Arc::new(StatsCounter::new());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        counter.record_write(1);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.snapshot().writes, 400);
        assert_eq!(counter.snapshot().bytes, 400);
    }
}
