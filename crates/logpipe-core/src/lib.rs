//! Core types and traits for logpipe.
//!
//! This crate provides the fundamental building blocks:
//! - [`LogEvent`] and [`Level`], the immutable event model
//! - The [`Filter`], [`Formatter`] and [`Handler`] capabilities
//! - [`Logger`], a hot-swappable pipeline of the three
//! - [`LoggerRegistry`] and [`LoggerGroup`] for named lookup and fan-out
//! - [`CapabilityCatalog`] for building components by type name
//!
//! # Design Principles
//!
//! - All capabilities are `Send + Sync` and shared through `Arc`
//! - Configuration mistakes fail fast with [`LogError`]
//! - Sink runtime failures are absorbed and counted in [`HandlerStats`]
//! - No global state: registries and catalogs are explicit values
//!
//! # Lock Domains
//!
//! The registry lock guards only the name map. Each logger has its own
//! reader/writer lock: logging takes the read side, `change_*` takes the
//! write side. Filters, formatters and sinks keep their own locks for their
//! settings, independent of both.

#![forbid(unsafe_code)]

pub mod catalog;
mod error;
pub mod event;
pub mod filter;
pub mod formatter;
mod group;
pub mod handler;
pub mod level;
pub mod logger;
pub mod logging;
mod registry;
pub mod testing;

pub use catalog::{Catalog, CapabilityCatalog, Params};
pub use error::{FormatError, LogError, LogResult};
pub use event::{LogEvent, LogEventBuilder, ProcessIdentity};
pub use filter::{AllOf, Filter, FnFilter, LevelFilter};
pub use formatter::{Formatter, JsonFormatter, StandardFormatter};
pub use group::LoggerGroup;
pub use handler::{Handler, HandlerStats, StatsCounter};
pub use level::{Level, ParseLevelError};
pub use logger::{Dispatch, Logger, LoggerBuilder, SwapOrder};
pub use registry::{DEFAULT_LOGGER_NAME, LoggerRegistry};
