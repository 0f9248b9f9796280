//! Bridges from the `log` facade and from `tracing` into a registry.
//!
//! Both bridges route by target: a record with target `db::pool` goes to the
//! registry logger named `db::pool`, which falls back to the default pipeline
//! when no such logger is registered. [`LogBridge::with_logger`] and
//! [`PipelineLayer::with_logger`] pin every record to one name instead.
//!
//! Records under the `logpipe` target are skipped so that the library's own
//! diagnostics never loop back into a pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::{Log, Metadata, Record};
use logpipe_core::logging::is_internal_target;
use logpipe_core::{Level, LogEvent, LoggerRegistry};
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Level conversions
// ============================================================================

/// Maps a `log` level onto the nine-level scale.
#[must_use]
pub fn level_from_log(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug => Level::Debug,
        log::Level::Trace => Level::Trace,
    }
}

/// Maps a level onto `log`'s five levels. Emerg, Alert and Crit become
/// `Error`; Notice becomes `Info`.
#[must_use]
pub fn level_to_log(level: Level) -> log::Level {
    match level {
        Level::Emerg | Level::Alert | Level::Crit | Level::Error => log::Level::Error,
        Level::Warn => log::Level::Warn,
        Level::Notice | Level::Info => log::Level::Info,
        Level::Debug => log::Level::Debug,
        Level::Trace => log::Level::Trace,
    }
}

/// Maps a `tracing` level onto the nine-level scale.
#[must_use]
pub fn level_from_tracing(level: tracing::Level) -> Level {
    if level == tracing::Level::ERROR {
        Level::Error
    } else if level == tracing::Level::WARN {
        Level::Warn
    } else if level == tracing::Level::INFO {
        Level::Info
    } else if level == tracing::Level::DEBUG {
        Level::Debug
    } else {
        Level::Trace
    }
}

/// Maps a level onto `tracing`'s five levels, collapsing like [`level_to_log`].
#[must_use]
pub fn level_to_tracing(level: Level) -> tracing::Level {
    match level_to_log(level) {
        log::Level::Error => tracing::Level::ERROR,
        log::Level::Warn => tracing::Level::WARN,
        log::Level::Info => tracing::Level::INFO,
        log::Level::Debug => tracing::Level::DEBUG,
        log::Level::Trace => tracing::Level::TRACE,
    }
}

// ============================================================================
// log bridge
// ============================================================================

/// A [`log::Log`] implementation that feeds records into a registry.
pub struct LogBridge {
    registry: Arc<LoggerRegistry>,
    logger_name: Option<String>,
    max_level: log::LevelFilter,
}

impl LogBridge {
    /// Creates a bridge that routes records by target and passes every level.
    #[must_use]
    pub fn new(registry: Arc<LoggerRegistry>) -> Self {
        Self {
            registry,
            logger_name: None,
            max_level: log::LevelFilter::Trace,
        }
    }

    /// Sends every record to the logger `name`.
    #[must_use]
    pub fn with_logger(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    /// Drops records above `level` before they reach any pipeline.
    #[must_use]
    pub fn with_max_level(mut self, level: log::LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    /// Installs the bridge as the global `log` logger.
    ///
    /// Returns an error if a logger has already been set.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn route<'a>(&'a self, target: &'a str) -> &'a str {
        self.logger_name.as_deref().unwrap_or(target)
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && !is_internal_target(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let event = LogEvent::builder(level_from_log(record.level()), record.args().to_string())
            .identity(self.registry.identity())
            .location(record.file().unwrap_or_default(), record.line().unwrap_or(0))
            .attribute("target", record.target())
            .build();
        self.registry
            .get_logger(self.route(record.target()))
            .log_event(&event);
    }

    fn flush(&self) {
        self.registry.flush_all();
    }
}

impl fmt::Debug for LogBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBridge")
            .field("logger_name", &self.logger_name)
            .field("max_level", &self.max_level)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// tracing layer
// ============================================================================

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldCollector {
    fn record_value(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            if self.message.is_none() {
                self.message = Some(match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                });
            }
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let number = serde_json::Number::from_f64(value)
            .map_or_else(|| Value::String(value.to_string()), Value::Number);
        self.record_value(field, number);
    }
}

/// A `tracing_subscriber` layer that feeds events into a registry.
///
/// Event fields become event attributes; the enclosing span names are joined
/// with `::` under the `span` attribute.
pub struct PipelineLayer {
    registry: Arc<LoggerRegistry>,
    logger_name: Option<String>,
}

impl PipelineLayer {
    /// Creates a layer that routes events by target.
    #[must_use]
    pub fn new(registry: Arc<LoggerRegistry>) -> Self {
        Self {
            registry,
            logger_name: None,
        }
    }

    /// Sends every event to the logger `name`.
    #[must_use]
    pub fn with_logger(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal_target(metadata.target()) {
            return;
        }
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                collector
                    .fields
                    .insert("span".to_string(), Value::String(spans.join("::")));
            }
        }

        let message = collector
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let log_event = LogEvent::builder(level_from_tracing(*metadata.level()), message)
            .identity(self.registry.identity())
            .location(metadata.file().unwrap_or_default(), metadata.line().unwrap_or(0))
            .attribute("target", metadata.target())
            .attributes(collector.fields)
            .build();

        let name = self.logger_name.as_deref().unwrap_or(metadata.target());
        self.registry.get_logger(name).log_event(&log_event);
    }
}

impl fmt::Debug for PipelineLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineLayer")
            .field("logger_name", &self.logger_name)
            .finish_non_exhaustive()
    }
}
