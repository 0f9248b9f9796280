//! Event filters.
//!
//! A [`Filter`] decides whether an event continues through a logger's
//! pipeline. The canonical filter is [`LevelFilter`], a severity threshold
//! that can be combined with further predicates using AND semantics.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::event::LogEvent;
use crate::level::Level;

/// Decides whether an event proceeds to formatting and output.
pub trait Filter: Send + Sync {
    /// Returns true when the event should be emitted.
    fn evaluate(&self, logger_name: &str, event: &LogEvent) -> bool;
}

impl<F: Filter + ?Sized> Filter for Arc<F> {
    fn evaluate(&self, logger_name: &str, event: &LogEvent) -> bool {
        (**self).evaluate(logger_name, event)
    }
}

/// Passes only when every contained filter passes. An empty list passes.
///
/// Filters are evaluated in order and evaluation stops at the first reject.
#[derive(Default, Clone)]
pub struct AllOf {
    filters: Vec<Arc<dyn Filter>>,
}

impl AllOf {
    /// Creates an empty conjunction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    #[must_use]
    pub fn with(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Appends a filter in place.
    pub fn push(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true when no filters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for AllOf {
    fn evaluate(&self, logger_name: &str, event: &LogEvent) -> bool {
        self.filters.iter().all(|f| f.evaluate(logger_name, event))
    }
}

impl fmt::Debug for AllOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllOf")
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Adapts a closure into a [`Filter`].
pub struct FnFilter<F>(F);

impl<F> FnFilter<F>
where
    F: Fn(&str, &LogEvent) -> bool + Send + Sync,
{
    /// Wraps `predicate`.
    pub fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&str, &LogEvent) -> bool + Send + Sync,
{
    fn evaluate(&self, logger_name: &str, event: &LogEvent) -> bool {
        (self.0)(logger_name, event)
    }
}

#[derive(Clone)]
struct LevelFilterState {
    threshold: Level,
    chain: AllOf,
}

/// Severity threshold filter.
///
/// An event passes when its level is at least as severe as the threshold
/// (`event.level <= threshold`) and every chained filter also passes. The
/// threshold and chain can be changed at runtime under the filter's own lock,
/// independently of the owning logger.
pub struct LevelFilter {
    state: RwLock<LevelFilterState>,
}

impl LevelFilter {
    /// Default threshold.
    pub const DEFAULT_LEVEL: Level = Level::Info;

    /// Creates a filter with the default threshold (`Info`).
    #[must_use]
    pub fn new() -> Self {
        Self::with_level(Self::DEFAULT_LEVEL)
    }

    /// Creates a filter with the given threshold.
    #[must_use]
    pub fn with_level(threshold: Level) -> Self {
        Self {
            state: RwLock::new(LevelFilterState {
                threshold,
                chain: AllOf::new(),
            }),
        }
    }

    /// Current threshold.
    #[must_use]
    pub fn level(&self) -> Level {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .threshold
    }

    /// Replaces the threshold.
    pub fn set_level(&self, threshold: Level) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .threshold = threshold;
    }

    /// Appends a filter that must also pass.
    pub fn and_then(&self, filter: Arc<dyn Filter>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .chain
            .push(filter);
    }

    /// Removes every chained filter.
    pub fn clear_chain(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .chain = AllOf::new();
    }

    /// Number of chained filters.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .chain
            .len()
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for LevelFilter {
    fn evaluate(&self, logger_name: &str, event: &LogEvent) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !event.level().passes(state.threshold) {
            return false;
        }
        state.chain.evaluate(logger_name, event)
    }
}

impl fmt::Debug for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelFilter")
            .field("level", &self.level())
            .field("chain", &self.chain_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(level: Level) -> LogEvent {
        LogEvent::builder(level, "m").build()
    }

    #[test]
    fn default_threshold_is_info() {
        let filter = LevelFilter::new();
        assert_eq!(filter.level(), Level::Info);
        assert!(filter.evaluate("app", &event(Level::Info)));
        assert!(filter.evaluate("app", &event(Level::Emerg)));
        assert!(!filter.evaluate("app", &event(Level::Debug)));
    }

    #[test]
    fn notice_threshold_passes_exactly_six_levels() {
        let filter = LevelFilter::with_level(Level::Notice);
        let passed = Level::ALL
            .iter()
            .filter(|level| filter.evaluate("app", &event(**level)))
            .count();
        assert_eq!(passed, 6);
    }

    #[test]
    fn set_level_takes_effect() {
        let filter = LevelFilter::new();
        filter.set_level(Level::Trace);
        assert!(filter.evaluate("app", &event(Level::Trace)));
        filter.set_level(Level::Error);
        assert!(!filter.evaluate("app", &event(Level::Warn)));
    }

    #[test]
    fn chain_is_and() {
        let filter = LevelFilter::with_level(Level::Trace);
        filter.and_then(Arc::new(FnFilter::new(|name: &str, _: &LogEvent| {
            name == "audit"
        })));
        assert!(filter.evaluate("audit", &event(Level::Info)));
        assert!(!filter.evaluate("web", &event(Level::Info)));

        filter.set_level(Level::Error);
        assert!(!filter.evaluate("audit", &event(Level::Info)));

        filter.clear_chain();
        assert_eq!(filter.chain_len(), 0);
        assert!(filter.evaluate("web", &event(Level::Error)));
    }

    #[test]
    fn all_of_short_circuits_in_order() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let all = AllOf::new()
            .with(Arc::new(FnFilter::new(|_: &str, _: &LogEvent| false)))
            .with(Arc::new(FnFilter::new(move |_: &str, _: &LogEvent| {
                counted.fetch_add(1, Ordering::SeqCst);
                true
            })));
        assert!(!all.evaluate("x", &event(Level::Info)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(AllOf::new().evaluate("x", &event(Level::Trace)));
    }
}
