//! Configuration errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

use logpipe_core::LogError;

/// Result type for configuration loading and setup.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything that can go wrong between a config file and registered loggers.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// TOML syntax or shape error.
    Toml(toml::de::Error),
    /// YAML syntax or shape error.
    Yaml(serde_yaml::Error),
    /// JSON syntax or shape error.
    Json(serde_json::Error),
    /// The file extension maps to no known format.
    UnsupportedExtension(String),
    /// A value parsed but is not acceptable.
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// What was wrong.
        reason: String,
    },
    /// Building or registering one logger failed.
    Logger {
        /// Logger name from the config file.
        name: String,
        /// Underlying pipeline error.
        source: LogError,
    },
    /// A pipeline error outside any particular logger.
    Log(LogError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Cannot read {}: {}", path.display(), source)
            }
            ConfigError::Toml(e) => write!(f, "Invalid TOML config: {e}"),
            ConfigError::Yaml(e) => write!(f, "Invalid YAML config: {e}"),
            ConfigError::Json(e) => write!(f, "Invalid JSON config: {e}"),
            ConfigError::UnsupportedExtension(ext) => {
                write!(f, "Unexpected config file extension ({ext})")
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for {field}: {reason}")
            }
            ConfigError::Logger { name, source } => write!(f, "Logger {name}: {source}"),
            ConfigError::Log(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml(e) => Some(e),
            ConfigError::Yaml(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Logger { source, .. } => Some(source),
            ConfigError::Log(e) => Some(e),
            ConfigError::UnsupportedExtension(_) | ConfigError::InvalidValue { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}

impl From<LogError> for ConfigError {
    fn from(err: LogError) -> Self {
        ConfigError::Log(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_names_the_logger() {
        let err = ConfigError::Logger {
            name: "audit".into(),
            source: LogError::EmptyHandlers,
        };
        assert_eq!(
            err.to_string(),
            "Logger audit: Logger pipeline needs at least one handler"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn extension_error_has_no_source() {
        let err = ConfigError::UnsupportedExtension(".ini".into());
        assert_eq!(err.to_string(), "Unexpected config file extension (.ini)");
        assert!(err.source().is_none());
    }
}
