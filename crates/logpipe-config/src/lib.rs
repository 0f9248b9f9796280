//! Configuration files for logpipe.
//!
//! A config file declares named loggers, each a filter, a formatter and one
//! or more handlers referenced by type name:
//!
//! ```no_run
//! use logpipe_config::load_config;
//! # fn registry() -> logpipe_core::LoggerRegistry { unimplemented!() }
//!
//! let registry = registry();
//! let names = load_config(&registry, "/etc/myapp/logging.toml")?;
//! # Ok::<(), logpipe_config::ConfigError>(())
//! ```
//!
//! TOML, YAML and JSON are accepted, chosen by file extension. Component
//! parameters are typed (see [`components`]); unknown keys and bad values are
//! rejected while building, before anything is registered.

#![forbid(unsafe_code)]

pub mod components;
mod error;
mod model;
mod setup;

pub use components::{
    BuiltinCatalog, ConsoleHandlerConfig, JsonFormatterConfig, LevelFilterConfig,
    RotatingFileConfig, StandardFormatterConfig, SyslogHandlerConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use model::{ComponentConfig, ConfigFormat, LoggerConfig, LoggingConfig};
pub use setup::{build_logger, build_loggers, load_config, setup_loggers, setup_loggers_with};
