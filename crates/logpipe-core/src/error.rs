//! Error types for pipeline configuration and formatting.
//!
//! Only configuration mistakes and formatting failures are reported as
//! errors. Runtime I/O problems inside sinks are counted in
//! [`HandlerStats`](crate::handler::HandlerStats) and never surface here.

/// Result type for registry and pipeline configuration calls.
pub type LogResult<T> = Result<T, LogError>;

/// Configuration errors returned synchronously by setup and swap calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// A logger name was empty.
    EmptyName,
    /// A pipeline was built without a filter.
    MissingFilter,
    /// A pipeline was built without a formatter.
    MissingFormatter,
    /// A pipeline was given no handlers.
    EmptyHandlers,
    /// A logger with this name is already registered.
    AlreadyRegistered(String),
    /// A name was not found where one was required.
    NotFound(String),
    /// A capability catalog has no constructor under this name.
    UnknownCapability {
        /// Capability kind ("filter", "formatter" or "handler").
        kind: &'static str,
        /// Requested name.
        name: String,
    },
    /// A capability constructor rejected its parameters.
    InvalidParameters {
        /// Capability kind ("filter", "formatter" or "handler").
        kind: &'static str,
        /// Requested name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::EmptyName => write!(f, "Logger name must not be empty"),
            LogError::MissingFilter => write!(f, "Logger pipeline has no filter"),
            LogError::MissingFormatter => write!(f, "Logger pipeline has no formatter"),
            LogError::EmptyHandlers => write!(f, "Logger pipeline needs at least one handler"),
            LogError::AlreadyRegistered(name) => write!(f, "Logger already registered: {name}"),
            LogError::NotFound(name) => write!(f, "Logger not found: {name}"),
            LogError::UnknownCapability { kind, name } => {
                write!(f, "Unknown {kind}: {name}")
            }
            LogError::InvalidParameters { kind, name, reason } => {
                write!(f, "Invalid parameters for {kind} {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for LogError {}

/// Error produced while rendering an event.
///
/// A formatting failure aborts delivery of that one event to every handler
/// of the logger.
#[derive(Debug)]
pub enum FormatError {
    /// Serialization of the event failed.
    Serialization(serde_json::Error),
    /// The formatter could not render with its current settings.
    Layout(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::Serialization(e) => write!(f, "Serialization error: {e}"),
            FormatError::Layout(msg) => write!(f, "Layout error: {msg}"),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormatError::Serialization(e) => Some(e),
            FormatError::Layout(_) => None,
        }
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(err: serde_json::Error) -> Self {
        FormatError::Serialization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_messages() {
        assert_eq!(
            LogError::AlreadyRegistered("audit".into()).to_string(),
            "Logger already registered: audit"
        );
        assert_eq!(
            LogError::UnknownCapability {
                kind: "handler",
                name: "Kafka".into()
            }
            .to_string(),
            "Unknown handler: Kafka"
        );
    }

    #[test]
    fn format_error_exposes_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FormatError::from(json_err);
        assert!(err.source().is_some());
        assert!(FormatError::Layout("bad".into()).source().is_none());
    }
}
