//! Structured logging pipelines.
//!
//! A logger is a filter, a formatter and one or more handlers. Loggers live
//! in a [`LoggerRegistry`] under names; any number of threads log through
//! them concurrently while another thread swaps their components.
//!
//! # Quick Start
//!
//! ```no_run
//! use logpipe::standard_registry;
//!
//! let registry = standard_registry();
//! let log = registry.get_logger("app");
//! log.info("service started");
//! log.warn("cache is cold");
//! ```
//!
//! # Configuration Files
//!
//! ```no_run
//! use logpipe::{load_config, standard_registry};
//!
//! let registry = standard_registry();
//! load_config(&registry, "/etc/myapp/logging.toml")?;
//! registry.get_logger("audit").notice("configuration loaded");
//! # Ok::<(), logpipe::ConfigError>(())
//! ```
//!
//! # Crates
//!
//! - [`logpipe_core`]: events, capabilities, loggers, registry
//! - [`logpipe_sinks`]: console, syslog and rotating file handlers
//! - [`logpipe_config`]: TOML/YAML/JSON configuration
//!
//! [`compat`] connects the `log` and `tracing` ecosystems to a registry.

#![forbid(unsafe_code)]

use std::sync::Arc;

pub mod compat;

pub use logpipe_core::{
    AllOf, CapabilityCatalog, Catalog, DEFAULT_LOGGER_NAME, Dispatch, Filter, FnFilter,
    FormatError, Formatter, Handler, HandlerStats, JsonFormatter, Level, LevelFilter, LogError,
    LogEvent, LogEventBuilder, LogResult, Logger, LoggerBuilder, LoggerGroup, LoggerRegistry,
    Params, ParseLevelError, ProcessIdentity, StandardFormatter, StatsCounter, SwapOrder,
};
pub use logpipe_core::{logging, testing};

pub use logpipe_config::{
    BuiltinCatalog, ConfigError, ConfigFormat, ConfigResult, LoggingConfig, load_config,
    setup_loggers, setup_loggers_with,
};
pub use logpipe_sinks::{
    ConsoleColor, ConsoleHandler, ConsoleTarget, Facility, RotatingFileSink, SyslogHandler,
    SyslogTransport,
};

pub use logpipe_config as config;
pub use logpipe_sinks as sinks;

/// The default pipeline: `Info` threshold, the standard layout with a
/// trailing newline, and one console handler on stdout. Not yet opened.
#[must_use]
pub fn standard_logger() -> Logger {
    Logger::single(
        Arc::new(LevelFilter::new()),
        Arc::new(StandardFormatter::new().with_append_newline(true)),
        Arc::new(ConsoleHandler::new()),
    )
}

/// A registry for the running process whose default logger is
/// [`standard_logger`].
#[must_use]
pub fn standard_registry() -> LoggerRegistry {
    standard_registry_with(ProcessIdentity::current())
}

/// Like [`standard_registry`] with an explicit process identity.
#[must_use]
pub fn standard_registry_with(identity: ProcessIdentity) -> LoggerRegistry {
    LoggerRegistry::new(identity, standard_logger())
}
