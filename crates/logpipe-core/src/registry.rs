//! Named logger table.
//!
//! The registry lock only guards the name map. Each [`Logger`] keeps its own
//! pipeline lock, so registering a name never blocks logging and swapping a
//! pipeline never blocks lookups.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{LogError, LogResult};
use crate::event::ProcessIdentity;
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::group::LoggerGroup;
use crate::handler::Handler;
use crate::logger::{Logger, LoggerBuilder};
use crate::logging::{debug, targets};

/// Name under which the default logger appears in its own group.
pub const DEFAULT_LOGGER_NAME: &str = "default";

/// Table of named loggers plus one default logger.
///
/// Loggers are added and never removed. Lookups of unknown names resolve to
/// the default logger instead of failing.
pub struct LoggerRegistry {
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
    default_logger: Arc<Logger>,
    identity: ProcessIdentity,
}

impl LoggerRegistry {
    /// Creates a registry around `default_logger`, opening its handlers.
    #[must_use]
    pub fn new(identity: ProcessIdentity, default_logger: Logger) -> Self {
        default_logger.open_handlers();
        Self {
            loggers: RwLock::new(HashMap::new()),
            default_logger: Arc::new(default_logger),
            identity,
        }
    }

    /// Registers a logger built from its three components.
    pub fn set_logger(
        &self,
        name: &str,
        filter: Arc<dyn Filter>,
        formatter: Arc<dyn Formatter>,
        handlers: Vec<Arc<dyn Handler>>,
    ) -> LogResult<Arc<Logger>> {
        let builder = Logger::builder()
            .filter(filter)
            .formatter(formatter)
            .handlers(handlers);
        self.register(name, builder)
    }

    /// Validates, opens and registers a logger.
    ///
    /// Fails when the name is empty or taken, or when the builder is
    /// incomplete. Handlers are opened before the logger becomes visible.
    pub fn register(&self, name: &str, builder: LoggerBuilder) -> LogResult<Arc<Logger>> {
        if name.is_empty() {
            return Err(LogError::EmptyName);
        }
        let logger = builder.build()?;
        self.insert(name, logger)
    }

    /// Registers an already built logger.
    pub fn insert(&self, name: &str, logger: Logger) -> LogResult<Arc<Logger>> {
        if name.is_empty() {
            return Err(LogError::EmptyName);
        }
        let mut loggers = self.loggers.write().unwrap_or_else(PoisonError::into_inner);
        if loggers.contains_key(name) {
            return Err(LogError::AlreadyRegistered(name.to_string()));
        }
        logger.open_handlers();
        let logger = Arc::new(logger);
        loggers.insert(name.to_string(), Arc::clone(&logger));
        debug!(target: targets::REGISTRY, "Registered logger {}", name);
        Ok(logger)
    }

    /// Group holding one logger; unknown names resolve to the default logger.
    #[must_use]
    pub fn get_logger(&self, name: &str) -> LoggerGroup {
        self.get_logger_group(&[name])
    }

    /// Group holding each named logger, in order and without duplicates.
    #[must_use]
    pub fn get_logger_group<S: AsRef<str>>(&self, names: &[S]) -> LoggerGroup {
        let mut group = LoggerGroup::new(self.identity.clone());
        let loggers = self.loggers.read().unwrap_or_else(PoisonError::into_inner);
        for name in names {
            let name = name.as_ref();
            let logger = loggers
                .get(name)
                .map_or_else(|| Arc::clone(&self.default_logger), Arc::clone);
            group.push(name, logger);
        }
        group
    }

    /// Group holding only the default logger, named [`DEFAULT_LOGGER_NAME`].
    #[must_use]
    pub fn default_group(&self) -> LoggerGroup {
        let mut group = LoggerGroup::new(self.identity.clone());
        group.push(DEFAULT_LOGGER_NAME, Arc::clone(&self.default_logger));
        group
    }

    /// The default logger.
    #[must_use]
    pub fn default_logger(&self) -> &Arc<Logger> {
        &self.default_logger
    }

    /// The registered logger under `name`, without falling back.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Identity stamped on events.
    #[must_use]
    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }

    /// Flushes the default logger and every registered logger.
    pub fn flush_all(&self) {
        self.default_logger.flush();
        for logger in self.snapshot() {
            logger.flush();
        }
    }

    /// Closes the handlers of the default logger and every registered logger.
    pub fn close_all(&self) {
        self.default_logger.close();
        for logger in self.snapshot() {
            logger.close();
        }
    }

    fn snapshot(&self) -> Vec<Arc<Logger>> {
        self.loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("names", &self.names())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::LevelFilter;
    use crate::formatter::StandardFormatter;
    use crate::level::Level;
    use crate::testing::RecordingHandler;

    fn registry() -> (LoggerRegistry, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::new());
        let default_logger = Logger::builder()
            .filter(Arc::new(LevelFilter::new()))
            .formatter(Arc::new(
                StandardFormatter::new().with_layout("%(loggerName) %(message)"),
            ))
            .handler(handler.clone())
            .build()
            .unwrap();
        (
            LoggerRegistry::new(ProcessIdentity::new(1, "h", "p"), default_logger),
            handler,
        )
    }

    fn pipeline() -> (Arc<dyn Filter>, Arc<dyn Formatter>) {
        (
            Arc::new(LevelFilter::with_level(Level::Trace)),
            Arc::new(StandardFormatter::new().with_layout("%(message)")),
        )
    }

    #[test]
    fn default_logger_is_opened_at_construction() {
        let (registry, handler) = registry();
        assert!(handler.is_opened());
        registry.default_group().info("boot");
        assert_eq!(handler.lines(), vec!["default boot".to_string()]);
    }

    #[test]
    fn set_logger_opens_handlers_and_rejects_duplicates() {
        let (registry, _) = registry();
        let handler = Arc::new(RecordingHandler::new());
        let (filter, formatter) = pipeline();

        registry
            .set_logger("audit", filter.clone(), formatter.clone(), vec![handler.clone()])
            .unwrap();
        assert_eq!(handler.open_count(), 1);
        assert!(registry.contains("audit"));

        let again = registry.set_logger("audit", filter, formatter, vec![handler.clone()]);
        assert_eq!(again.unwrap_err(), LogError::AlreadyRegistered("audit".into()));
        assert_eq!(handler.open_count(), 1);
    }

    #[test]
    fn registration_validates_input() {
        let (registry, _) = registry();
        let (filter, formatter) = pipeline();
        assert_eq!(
            registry
                .set_logger("", filter.clone(), formatter.clone(), vec![Arc::new(RecordingHandler::new())])
                .unwrap_err(),
            LogError::EmptyName
        );
        assert_eq!(
            registry
                .set_logger("x", filter, formatter, Vec::new())
                .unwrap_err(),
            LogError::EmptyHandlers
        );
        assert!(registry.names().is_empty());
    }

    #[test]
    fn unknown_names_fall_back_to_default() {
        let (registry, default_handler) = registry();
        let group = registry.get_logger("nobody");
        assert_eq!(group.names(), vec!["nobody"]);
        group.warn("lost?");
        assert_eq!(default_handler.lines(), vec!["nobody lost?".to_string()]);
    }

    #[test]
    fn group_lookup_dedups_and_keeps_order() {
        let (registry, _) = registry();
        let (filter, formatter) = pipeline();
        registry
            .set_logger("b", filter.clone(), formatter.clone(), vec![Arc::new(RecordingHandler::new())])
            .unwrap();
        registry
            .set_logger("a", filter, formatter, vec![Arc::new(RecordingHandler::new())])
            .unwrap();

        let group = registry.get_logger_group(&["b", "a", "b"]);
        assert_eq!(group.names(), vec!["b", "a"]);
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn flush_all_reaches_every_logger() {
        let (registry, default_handler) = registry();
        let handler = Arc::new(RecordingHandler::new());
        let (filter, formatter) = pipeline();
        registry
            .set_logger("x", filter, formatter, vec![handler.clone()])
            .unwrap();

        registry.flush_all();
        assert_eq!(default_handler.flush_count(), 1);
        assert_eq!(handler.flush_count(), 1);

        registry.close_all();
        assert!(!handler.is_opened());
        assert!(!default_handler.is_opened());
    }
}
