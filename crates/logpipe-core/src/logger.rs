//! Loggers and their swappable pipelines.
//!
//! A [`Logger`] binds one filter, one formatter and an ordered list of
//! handlers behind a single reader/writer lock. Logging takes the read side,
//! so any number of threads log concurrently; the `change_*` methods take the
//! write side and replace one whole component at a time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, LogError, LogResult};
use crate::event::LogEvent;
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::handler::{Handler, HandlerStats};
use crate::logging::{debug, targets};

/// Order in which [`Logger::change_handlers`] retires old handlers and starts new ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapOrder {
    /// Close every old handler, then open every new handler.
    ///
    /// Two handlers for the same resource (e.g. the same file path) are never
    /// open at once, at the cost of a moment with no open sink.
    #[default]
    CloseThenOpen,
    /// Open every new handler, then close old handlers that are not reused.
    ///
    /// There is never a moment without an open sink, but old and new handlers
    /// for the same resource briefly coexist.
    OpenThenClose,
}

/// Outcome of dispatching one event through a logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The filter rejected the event.
    Filtered,
    /// The event was formatted and handed to this many handlers.
    Delivered(usize),
}

struct Pipeline {
    filter: Arc<dyn Filter>,
    formatter: Arc<dyn Formatter>,
    handlers: Vec<Arc<dyn Handler>>,
}

/// A named pipeline of filter, formatter and handlers.
pub struct Logger {
    pipeline: RwLock<Pipeline>,
    swap_order: SwapOrder,
    version: AtomicU64,
    format_errors: AtomicU64,
}

impl Logger {
    /// Starts building a logger.
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Creates a logger with a single handler, which is not opened here.
    #[must_use]
    pub fn single(
        filter: Arc<dyn Filter>,
        formatter: Arc<dyn Formatter>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self::from_parts(filter, formatter, vec![handler], SwapOrder::default())
    }

    fn from_parts(
        filter: Arc<dyn Filter>,
        formatter: Arc<dyn Formatter>,
        handlers: Vec<Arc<dyn Handler>>,
        swap_order: SwapOrder,
    ) -> Self {
        Self {
            pipeline: RwLock::new(Pipeline {
                filter,
                formatter,
                handlers,
            }),
            swap_order,
            version: AtomicU64::new(0),
            format_errors: AtomicU64::new(0),
        }
    }

    /// Filters, formats and writes one event.
    ///
    /// The filter and formatter run once; the rendered text is then written
    /// to every handler in list order. A formatting failure aborts delivery
    /// of this event to all handlers.
    pub fn log(&self, logger_name: &str, event: &LogEvent) -> Result<Dispatch, FormatError> {
        let pipeline = self.pipeline.read().unwrap_or_else(PoisonError::into_inner);
        if !pipeline.filter.evaluate(logger_name, event) {
            return Ok(Dispatch::Filtered);
        }
        let rendered = match pipeline.formatter.format(logger_name, event) {
            Ok(rendered) => rendered,
            Err(err) => {
                self.format_errors.fetch_add(1, Ordering::Relaxed);
                debug!(target: targets::REGISTRY, "Dropping event for {}: {}", logger_name, err);
                return Err(err);
            }
        };
        for handler in &pipeline.handlers {
            handler.write(logger_name, event, &rendered);
        }
        Ok(Dispatch::Delivered(pipeline.handlers.len()))
    }

    /// Flushes every handler in list order.
    pub fn flush(&self) {
        let pipeline = self.pipeline.read().unwrap_or_else(PoisonError::into_inner);
        for handler in &pipeline.handlers {
            handler.flush();
        }
    }

    /// Closes every open handler in list order.
    ///
    /// The logger keeps its pipeline; a later `change_handlers` or an explicit
    /// `open` on a handler brings output back.
    pub fn close(&self) {
        let pipeline = self.pipeline.read().unwrap_or_else(PoisonError::into_inner);
        close_all(&pipeline.handlers);
    }

    /// Replaces the filter.
    pub fn change_filter(&self, filter: Arc<dyn Filter>) {
        let mut pipeline = self.pipeline.write().unwrap_or_else(PoisonError::into_inner);
        pipeline.filter = filter;
        self.bump_version();
    }

    /// Replaces the formatter.
    pub fn change_formatter(&self, formatter: Arc<dyn Formatter>) {
        let mut pipeline = self.pipeline.write().unwrap_or_else(PoisonError::into_inner);
        pipeline.formatter = formatter;
        self.bump_version();
    }

    /// Replaces the handler list.
    ///
    /// Fails with [`LogError::EmptyHandlers`] when `handlers` is empty. Old
    /// handlers are closed and new ones opened in the order given by the
    /// logger's [`SwapOrder`]; a handler present in both lists is closed and
    /// opened at most once each.
    pub fn change_handlers(&self, handlers: Vec<Arc<dyn Handler>>) -> LogResult<()> {
        if handlers.is_empty() {
            return Err(LogError::EmptyHandlers);
        }
        let mut pipeline = self.pipeline.write().unwrap_or_else(PoisonError::into_inner);
        match self.swap_order {
            SwapOrder::CloseThenOpen => {
                close_all(&pipeline.handlers);
                pipeline.handlers = handlers;
                open_all(&pipeline.handlers);
            }
            SwapOrder::OpenThenClose => {
                open_all(&handlers);
                let old = std::mem::replace(&mut pipeline.handlers, handlers);
                let retired: Vec<_> = old
                    .into_iter()
                    .filter(|h| !pipeline.handlers.iter().any(|n| same_handler(h, n)))
                    .collect();
                close_all(&retired);
            }
        }
        self.bump_version();
        debug!(
            target: targets::REGISTRY,
            "Swapped handlers ({} now active)",
            pipeline.handlers.len()
        );
        Ok(())
    }

    /// Opens every handler that is not open yet.
    pub fn open_handlers(&self) {
        let pipeline = self.pipeline.read().unwrap_or_else(PoisonError::into_inner);
        open_all(&pipeline.handlers);
    }

    /// Current filter.
    #[must_use]
    pub fn filter(&self) -> Arc<dyn Filter> {
        Arc::clone(&self.pipeline.read().unwrap_or_else(PoisonError::into_inner).filter)
    }

    /// Current formatter.
    #[must_use]
    pub fn formatter(&self) -> Arc<dyn Formatter> {
        Arc::clone(
            &self
                .pipeline
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .formatter,
        )
    }

    /// Current handlers.
    #[must_use]
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .clone()
    }

    /// Name and counters of each current handler.
    #[must_use]
    pub fn handler_stats(&self) -> Vec<(String, HandlerStats)> {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .iter()
            .map(|h| (h.name().to_string(), h.stats()))
            .collect()
    }

    /// Handler swap order of this logger.
    #[must_use]
    pub fn swap_order(&self) -> SwapOrder {
        self.swap_order
    }

    /// Number of completed component swaps.
    #[must_use]
    pub fn pipeline_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Events dropped because the formatter failed.
    #[must_use]
    pub fn format_errors(&self) -> u64 {
        self.format_errors.load(Ordering::Relaxed)
    }

    fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pipeline = self.pipeline.read().unwrap_or_else(PoisonError::into_inner);
        let handlers: Vec<&str> = pipeline.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("Logger")
            .field("handlers", &handlers)
            .field("swap_order", &self.swap_order)
            .field("version", &self.pipeline_version())
            .finish_non_exhaustive()
    }
}

fn same_handler(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn open_all(handlers: &[Arc<dyn Handler>]) {
    for handler in handlers {
        if !handler.is_opened() {
            handler.open();
        }
    }
}

fn close_all(handlers: &[Arc<dyn Handler>]) {
    for handler in handlers {
        if handler.is_opened() {
            handler.close();
        }
    }
}

/// Builder for [`Logger`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use logpipe_core::filter::LevelFilter;
/// use logpipe_core::formatter::StandardFormatter;
/// use logpipe_core::logger::Logger;
/// use logpipe_core::testing::RecordingHandler;
///
/// let logger = Logger::builder()
///     .filter(Arc::new(LevelFilter::new()))
///     .formatter(Arc::new(StandardFormatter::new()))
///     .handler(Arc::new(RecordingHandler::new()))
///     .build()
///     .unwrap();
/// assert_eq!(logger.handlers().len(), 1);
/// ```
#[derive(Default)]
pub struct LoggerBuilder {
    filter: Option<Arc<dyn Filter>>,
    formatter: Option<Arc<dyn Formatter>>,
    handlers: Vec<Arc<dyn Handler>>,
    swap_order: SwapOrder,
}

impl LoggerBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the formatter.
    #[must_use]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Appends one handler.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Appends several handlers.
    #[must_use]
    pub fn handlers(mut self, handlers: impl IntoIterator<Item = Arc<dyn Handler>>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Sets the handler swap order.
    #[must_use]
    pub fn swap_order(mut self, order: SwapOrder) -> Self {
        self.swap_order = order;
        self
    }

    /// Validates and builds the logger. Handlers are not opened here.
    pub fn build(self) -> LogResult<Logger> {
        let filter = self.filter.ok_or(LogError::MissingFilter)?;
        let formatter = self.formatter.ok_or(LogError::MissingFormatter)?;
        if self.handlers.is_empty() {
            return Err(LogError::EmptyHandlers);
        }
        Ok(Logger::from_parts(
            filter,
            formatter,
            self.handlers,
            self.swap_order,
        ))
    }
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("filter", &self.filter.is_some())
            .field("formatter", &self.formatter.is_some())
            .field("handlers", &self.handlers.len())
            .field("swap_order", &self.swap_order)
            .finish()
    }
}
