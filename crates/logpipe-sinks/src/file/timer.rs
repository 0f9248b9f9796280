//! One-shot delayed flush, at most one pending per sink.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use logpipe_core::logging::{targets, warn};

#[derive(Default)]
struct Signal {
    generation: Mutex<u64>,
    wake: Condvar,
}

/// A cancellable one-shot timer.
///
/// [`schedule`](Self::schedule) spawns a named thread that sleeps for the
/// delay and then runs the task. While one task is pending, further
/// `schedule` calls are refused. [`cancel`](Self::cancel) wakes the sleeper,
/// which then exits without running its task.
///
/// The pending flag is cleared just before the task starts, so a caller that
/// buffers data while a task is running always gets to schedule a new one.
pub struct FlushTimer {
    pending: Arc<AtomicBool>,
    signal: Arc<Signal>,
}

impl FlushTimer {
    /// Creates an idle timer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Arc::new(AtomicBool::new(false)),
            signal: Arc::new(Signal::default()),
        }
    }

    /// Whether a task is scheduled and has not started yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Runs `task` after `delay` unless a task is already pending.
    ///
    /// Returns false when nothing was scheduled, either because another task
    /// is pending or because the timer thread could not be spawned.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = {
            let generation = self
                .signal
                .generation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self
                .pending
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return false;
            }
            *generation
        };

        let pending = Arc::clone(&self.pending);
        let signal = Arc::clone(&self.signal);
        let spawned = thread::Builder::new()
            .name("logpipe-flush".to_string())
            .spawn(move || {
                if wait_for_deadline(&signal, &pending, generation, delay) {
                    task();
                }
            });

        if let Err(err) = spawned {
            warn!(target: targets::SINK, "Failed to spawn flush timer: {}", err);
            self.pending.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Cancels the pending task, if any.
    pub fn cancel(&self) {
        let mut generation = self
            .signal
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *generation = generation.wrapping_add(1);
        self.pending.store(false, Ordering::Release);
        self.signal.wake.notify_all();
    }
}

impl Default for FlushTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FlushTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushTimer")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Sleeps until `delay` has passed. Returns false when cancelled meanwhile.
fn wait_for_deadline(
    signal: &Signal,
    pending: &AtomicBool,
    generation: u64,
    delay: Duration,
) -> bool {
    let deadline = Instant::now() + delay;
    let mut current = signal
        .generation
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    loop {
        if *current != generation {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        current = signal
            .wake
            .wait_timeout(current, deadline - now)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
    // Cleared under the generation lock so cancel() cannot interleave.
    pending.store(false, Ordering::Release);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn fires_once_after_delay() {
        let timer = FlushTimer::new();
        let (tx, rx) = mpsc::channel();
        let start = Instant::now();
        assert!(timer.schedule(Duration::from_millis(50), move || {
            tx.send(Instant::now()).unwrap();
        }));
        assert!(timer.is_pending());

        let fired = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired.duration_since(start) >= Duration::from_millis(50));
    }

    #[test]
    fn at_most_one_pending() {
        let timer = FlushTimer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        let first = Arc::clone(&runs);
        assert!(timer.schedule(Duration::from_millis(100), move || {
            first.fetch_add(1, Ordering::SeqCst);
            tx.send(()).unwrap();
        }));
        let second = Arc::clone(&runs);
        assert!(!timer.schedule(Duration::from_millis(10), move || {
            second.fetch_add(1, Ordering::SeqCst);
        }));

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[test]
    fn cancel_prevents_the_task() {
        let timer = FlushTimer::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        assert!(timer.schedule(Duration::from_millis(100), move || {
            flag.store(true, Ordering::SeqCst);
        }));
        timer.cancel();
        assert!(!timer.is_pending());

        thread::sleep(Duration::from_millis(250));
        assert!(!ran.load(Ordering::SeqCst));

        let (tx, rx) = mpsc::channel();
        assert!(timer.schedule(Duration::from_millis(10), move || {
            tx.send(()).unwrap();
        }));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
