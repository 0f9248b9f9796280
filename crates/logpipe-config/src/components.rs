//! Typed parameters of the builtin components and the catalog that builds them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use logpipe_core::formatter::validate_date_time_layout;
use logpipe_core::{
    CapabilityCatalog, Filter, Formatter, Handler, JsonFormatter, Level, LevelFilter, LogError,
    LogResult, Params, ProcessIdentity, StandardFormatter,
};
use logpipe_sinks::{
    ConsoleColor, ConsoleHandler, ConsoleTarget, Facility, RotatingFileSink, SyslogHandler,
    SyslogTransport,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Catalog name of [`LevelFilter`].
pub const LEVEL_FILTER: &str = "LogLevelFilter";
/// Catalog name of [`StandardFormatter`].
pub const STANDARD_FORMATTER: &str = "StandardFormatter";
/// Catalog name of [`JsonFormatter`].
pub const JSON_FORMATTER: &str = "JsonFormatter";
/// Older spelling of [`JSON_FORMATTER`], still accepted in config files.
pub const JSON_FORMATTER_ALIAS: &str = "JSONFormatter";
/// Catalog name of [`ConsoleHandler`].
pub const CONSOLE_HANDLER: &str = "ConsoleHandler";
/// Catalog name of [`SyslogHandler`].
pub const SYSLOG_HANDLER: &str = "SyslogHandler";
/// Catalog name of [`RotatingFileSink`].
pub const ROTATION_FILE_HANDLER: &str = "RotationFileHandler";

/// Parameters of `LogLevelFilter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelFilterConfig {
    pub level: Level,
}

impl Default for LevelFilterConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::DEFAULT_LEVEL,
        }
    }
}

impl LevelFilterConfig {
    #[must_use]
    pub fn build(&self) -> LevelFilter {
        LevelFilter::with_level(self.level)
    }
}

/// Parameters of `StandardFormatter`. Unset fields keep the formatter defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StandardFormatterConfig {
    pub layout: Option<String>,
    pub date_time_layout: Option<String>,
    pub append_newline: Option<bool>,
}

impl StandardFormatterConfig {
    pub fn build(&self) -> Result<StandardFormatter, String> {
        let formatter = StandardFormatter::new();
        if let Some(layout) = &self.layout {
            formatter.set_layout(layout.as_str());
        }
        if let Some(layout) = &self.date_time_layout {
            validate_date_time_layout(layout).map_err(|e| e.to_string())?;
            formatter.set_date_time_layout(layout.as_str());
        }
        if let Some(append) = self.append_newline {
            formatter.set_append_newline(append);
        }
        Ok(formatter)
    }
}

/// Parameters of `JsonFormatter`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonFormatterConfig {
    pub date_time_layout: Option<String>,
}

impl JsonFormatterConfig {
    pub fn build(&self) -> Result<JsonFormatter, String> {
        let formatter = JsonFormatter::new();
        if let Some(layout) = &self.date_time_layout {
            validate_date_time_layout(layout).map_err(|e| e.to_string())?;
            formatter.set_date_time_layout(layout.as_str());
        }
        Ok(formatter)
    }
}

/// Parameters of `ConsoleHandler`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleHandlerConfig {
    pub target: ConsoleTarget,
    /// Color per level; levels not listed stay uncolored.
    pub colors: BTreeMap<Level, ConsoleColor>,
    pub force_styling: bool,
}

impl ConsoleHandlerConfig {
    #[must_use]
    pub fn build(&self) -> ConsoleHandler {
        let handler = ConsoleHandler::new()
            .with_target(self.target)
            .with_force_styling(self.force_styling);
        for (level, color) in &self.colors {
            handler.set_color(*level, *color);
        }
        handler
    }
}

/// Parameters of `SyslogHandler`.
///
/// An empty `network` selects the local syslog socket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyslogHandlerConfig {
    pub network: String,
    pub addr: String,
    /// Defaults to the program name.
    pub tag: Option<String>,
    /// Facility name such as `LOCAL3`; defaults to `LOCAL0`.
    pub facility: Option<String>,
}

impl SyslogHandlerConfig {
    pub fn build(&self, identity: &ProcessIdentity) -> Result<SyslogHandler, String> {
        let transport = SyslogTransport::from_network(&self.network, &self.addr)?;
        let mut handler = SyslogHandler::new(identity).with_transport(transport);
        if let Some(tag) = &self.tag {
            handler = handler.with_tag(tag.as_str());
        }
        if let Some(facility) = &self.facility {
            handler = handler.with_facility(facility.parse::<Facility>()?);
        }
        Ok(handler)
    }
}

/// Parameters of `RotationFileHandler`. Unset fields keep the sink defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RotatingFileConfig {
    pub file_name: Option<String>,
    pub dir_path: Option<PathBuf>,
    pub max_age_days: Option<u32>,
    /// Bytes; 0 disables size rotation.
    pub max_size: Option<u64>,
    #[serde(rename = "async")]
    pub async_mode: bool,
    pub flush_interval_secs: Option<f64>,
    pub buffer_threshold: Option<usize>,
}

impl RotatingFileConfig {
    pub fn build(&self, identity: &ProcessIdentity) -> Result<RotatingFileSink, String> {
        let sink = RotatingFileSink::new(identity);
        if let Some(name) = &self.file_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(format!("file_name must be a bare file name: {name:?}"));
            }
            sink.set_file_name(name.as_str());
        }
        if let Some(dir) = &self.dir_path {
            sink.set_dir_path(dir.clone());
        }
        if let Some(days) = self.max_age_days {
            sink.set_max_age_days(days);
        }
        if let Some(bytes) = self.max_size {
            sink.set_max_size(bytes);
        }
        if let Some(secs) = self.flush_interval_secs {
            let interval = Duration::try_from_secs_f64(secs)
                .map_err(|e| format!("flush_interval_secs {secs}: {e}"))?;
            sink.set_flush_interval(interval);
        }
        if let Some(bytes) = self.buffer_threshold {
            sink.set_buffer_threshold(bytes);
        }
        sink.set_async(self.async_mode);
        Ok(sink)
    }
}

fn parse_params<C: DeserializeOwned>(
    kind: &'static str,
    name: &str,
    params: &Params,
) -> LogResult<C> {
    serde_json::from_value(serde_json::Value::Object(params.clone())).map_err(|e| {
        invalid(kind, name, e.to_string())
    })
}

fn invalid(kind: &'static str, name: &str, reason: String) -> LogError {
    LogError::InvalidParameters {
        kind,
        name: name.to_string(),
        reason,
    }
}

fn level_filter(_: &ProcessIdentity, params: &Params) -> LogResult<Arc<dyn Filter>> {
    let config: LevelFilterConfig = parse_params("filter", LEVEL_FILTER, params)?;
    Ok(Arc::new(config.build()))
}

fn standard_formatter(_: &ProcessIdentity, params: &Params) -> LogResult<Arc<dyn Formatter>> {
    let config: StandardFormatterConfig = parse_params("formatter", STANDARD_FORMATTER, params)?;
    let formatter = config
        .build()
        .map_err(|reason| invalid("formatter", STANDARD_FORMATTER, reason))?;
    Ok(Arc::new(formatter))
}

fn json_formatter(_: &ProcessIdentity, params: &Params) -> LogResult<Arc<dyn Formatter>> {
    let config: JsonFormatterConfig = parse_params("formatter", JSON_FORMATTER, params)?;
    let formatter = config
        .build()
        .map_err(|reason| invalid("formatter", JSON_FORMATTER, reason))?;
    Ok(Arc::new(formatter))
}

fn console_handler(_: &ProcessIdentity, params: &Params) -> LogResult<Arc<dyn Handler>> {
    let config: ConsoleHandlerConfig = parse_params("handler", CONSOLE_HANDLER, params)?;
    Ok(Arc::new(config.build()))
}

fn syslog_handler(identity: &ProcessIdentity, params: &Params) -> LogResult<Arc<dyn Handler>> {
    let config: SyslogHandlerConfig = parse_params("handler", SYSLOG_HANDLER, params)?;
    let handler = config
        .build(identity)
        .map_err(|reason| invalid("handler", SYSLOG_HANDLER, reason))?;
    Ok(Arc::new(handler))
}

fn rotation_file_handler(
    identity: &ProcessIdentity,
    params: &Params,
) -> LogResult<Arc<dyn Handler>> {
    let config: RotatingFileConfig = parse_params("handler", ROTATION_FILE_HANDLER, params)?;
    let sink = config
        .build(identity)
        .map_err(|reason| invalid("handler", ROTATION_FILE_HANDLER, reason))?;
    Ok(Arc::new(sink))
}

/// Adds the builtin components to a [`CapabilityCatalog`].
pub trait BuiltinCatalog {
    /// A catalog holding only the builtin components.
    fn with_builtins() -> Self;

    /// Registers the builtin components, replacing same-named entries.
    fn register_builtins(&mut self);
}

impl BuiltinCatalog for CapabilityCatalog {
    fn with_builtins() -> Self {
        let mut catalog = CapabilityCatalog::new();
        catalog.register_builtins();
        catalog
    }

    fn register_builtins(&mut self) {
        self.filters.register(LEVEL_FILTER, level_filter);
        self.formatters.register(STANDARD_FORMATTER, standard_formatter);
        self.formatters.register(JSON_FORMATTER, json_formatter);
        self.formatters.register(JSON_FORMATTER_ALIAS, json_formatter);
        self.handlers.register(CONSOLE_HANDLER, console_handler);
        self.handlers.register(SYSLOG_HANDLER, syslog_handler);
        self.handlers.register(ROTATION_FILE_HANDLER, rotation_file_handler);
    }
}
