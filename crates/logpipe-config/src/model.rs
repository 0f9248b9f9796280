//! Shape of a logging configuration file.
//!
//! ```toml
//! [loggers.app.filter]
//! type = "LogLevelFilter"
//! level = "debug"
//!
//! [loggers.app.formatter]
//! type = "StandardFormatter"
//! append_newline = true
//!
//! [[loggers.app.handlers]]
//! type = "RotationFileHandler"
//! dir_path = "/var/log/app"
//! max_size = 10485760
//! ```
//!
//! Each component names its type under `type`; every other key is a
//! parameter of that type, validated when the component is built.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use logpipe_core::{Params, SwapOrder};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Config file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Maps a file extension (with or without the dot) to a format.
    ///
    /// Accepts `toml`/`tml`, `yaml`/`yml` and `json`/`jsn`.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "toml" | "tml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" | "jsn" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Picks the format from a file name.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| {
            ConfigError::UnsupportedExtension(if ext.is_empty() {
                String::new()
            } else {
                format!(".{ext}")
            })
        })
    }
}

impl FromStr for ConfigFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ConfigError::UnsupportedExtension(s.to_string()))
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
        })
    }
}

/// One filter, formatter or handler entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Catalog name of the component type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific parameters.
    #[serde(flatten)]
    pub params: Params,
}

impl ComponentConfig {
    /// Creates an entry with no parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Params::new(),
        }
    }

    /// Adds one parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Pipeline of one named logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub filter: ComponentConfig,
    pub formatter: ComponentConfig,
    pub handlers: Vec<ComponentConfig>,
    /// How later handler swaps on this logger are sequenced.
    #[serde(default)]
    pub swap_order: SwapOrder,
}

/// A whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,
}

impl LoggingConfig {
    /// Reads and parses a config file, choosing the syntax by extension.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(format, &text)
    }

    /// Parses config text in the given syntax.
    pub fn from_str(format: ConfigFormat, text: &str) -> ConfigResult<Self> {
        Ok(match format {
            ConfigFormat::Toml => toml::from_str(text)?,
            ConfigFormat::Yaml => serde_yaml::from_str(text)?,
            ConfigFormat::Json => serde_json::from_str(text)?,
        })
    }

    /// Logger names in the file, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.loggers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOML: &str = r#"
[loggers.app]
swap_order = "open_then_close"

[loggers.app.filter]
type = "LogLevelFilter"
level = "debug"

[loggers.app.formatter]
type = "StandardFormatter"
append_newline = true

[[loggers.app.handlers]]
type = "ConsoleHandler"
target = "stderr"

[[loggers.app.handlers]]
type = "RotationFileHandler"
max_size = 1024
"#;

    const YAML: &str = r#"
loggers:
  app:
    swap_order: open_then_close
    filter:
      type: LogLevelFilter
      level: debug
    formatter:
      type: StandardFormatter
      append_newline: true
    handlers:
      - type: ConsoleHandler
        target: stderr
      - type: RotationFileHandler
        max_size: 1024
"#;

    const JSON: &str = r#"{
  "loggers": {
    "app": {
      "swap_order": "open_then_close",
      "filter": {"type": "LogLevelFilter", "level": "debug"},
      "formatter": {"type": "StandardFormatter", "append_newline": true},
      "handlers": [
        {"type": "ConsoleHandler", "target": "stderr"},
        {"type": "RotationFileHandler", "max_size": 1024}
      ]
    }
  }
}"#;

    #[test]
    fn extensions_map_to_formats() {
        assert_eq!(ConfigFormat::from_extension("tml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension(".YML"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("jsn"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("ini"), None);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("/etc/app.conf")),
            Err(ConfigError::UnsupportedExtension(ext)) if ext == ".conf"
        ));
    }

    #[test]
    fn all_syntaxes_parse_to_the_same_model() {
        let toml = LoggingConfig::from_str(ConfigFormat::Toml, TOML).unwrap();
        let yaml = LoggingConfig::from_str(ConfigFormat::Yaml, YAML).unwrap();
        let json = LoggingConfig::from_str(ConfigFormat::Json, JSON).unwrap();
        assert_eq!(toml, yaml);
        assert_eq!(toml, json);

        let app = &toml.loggers["app"];
        assert_eq!(app.swap_order, SwapOrder::OpenThenClose);
        assert_eq!(app.filter.kind, "LogLevelFilter");
        assert_eq!(app.filter.params.get("level"), Some(&json!("debug")));
        assert_eq!(app.handlers.len(), 2);
        assert_eq!(app.handlers[1].params.get("max_size"), Some(&json!(1024)));
    }

    #[test]
    fn missing_formatter_is_a_parse_error() {
        let err = LoggingConfig::from_str(
            ConfigFormat::Json,
            r#"{"loggers": {"x": {"filter": {"type": "LogLevelFilter"}, "handlers": []}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn swap_order_defaults_to_close_then_open() {
        let config = LoggingConfig::from_str(
            ConfigFormat::Yaml,
            "loggers:\n  x:\n    filter: {type: LogLevelFilter}\n    formatter: {type: JsonFormatter}\n    handlers: [{type: ConsoleHandler}]\n",
        )
        .unwrap();
        assert_eq!(config.loggers["x"].swap_order, SwapOrder::CloseThenOpen);
        assert_eq!(config.names(), vec!["x"]);
    }

    #[test]
    fn empty_file_has_no_loggers() {
        let config = LoggingConfig::from_str(ConfigFormat::Toml, "").unwrap();
        assert!(config.loggers.is_empty());
    }
}
