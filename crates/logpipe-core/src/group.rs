//! Fan-out view over several registered loggers.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{LogError, LogResult};
use crate::event::{LogEvent, LogEventBuilder, ProcessIdentity};
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::handler::Handler;
use crate::level::Level;
use crate::logger::Logger;

/// An ordered, de-duplicated set of `(name, logger)` pairs.
///
/// A group is a snapshot: it copies logger references out of the registry
/// once and never observes later registrations. Every logging call builds a
/// single [`LogEvent`] and dispatches it to each member under that member's
/// name.
#[derive(Clone)]
pub struct LoggerGroup {
    members: Vec<(String, Arc<Logger>)>,
    identity: ProcessIdentity,
}

impl LoggerGroup {
    /// Creates an empty group stamping events with `identity`.
    #[must_use]
    pub fn new(identity: ProcessIdentity) -> Self {
        Self {
            members: Vec::new(),
            identity,
        }
    }

    /// Adds a member. A name already present is left untouched.
    pub fn push(&mut self, name: impl Into<String>, logger: Arc<Logger>) {
        let name = name.into();
        if !self.members.iter().any(|(existing, _)| *existing == name) {
            self.members.push((name, logger));
        }
    }

    /// Member names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true when the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Looks up a member logger.
    #[must_use]
    pub fn logger(&self, name: &str) -> Option<&Arc<Logger>> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, logger)| logger)
    }

    /// Identity stamped on events built by this group.
    #[must_use]
    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }

    /// Logs at `Emerg`.
    #[track_caller]
    pub fn emerg(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Emerg, message.into(), Location::caller()));
    }

    /// Logs at `Alert`.
    #[track_caller]
    pub fn alert(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Alert, message.into(), Location::caller()));
    }

    /// Logs at `Crit`.
    #[track_caller]
    pub fn crit(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Crit, message.into(), Location::caller()));
    }

    /// Logs at `Error`.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Error, message.into(), Location::caller()));
    }

    /// Logs at `Warn`.
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Warn, message.into(), Location::caller()));
    }

    /// Logs at `Notice`.
    #[track_caller]
    pub fn notice(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Notice, message.into(), Location::caller()));
    }

    /// Logs at `Info`.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Info, message.into(), Location::caller()));
    }

    /// Logs at `Debug`.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Debug, message.into(), Location::caller()));
    }

    /// Logs at `Trace`.
    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) {
        self.dispatch(self.event_at(Level::Trace, message.into(), Location::caller()));
    }

    /// Logs at an arbitrary level.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.dispatch(self.event_at(level, message.into(), Location::caller()));
    }

    /// Logs with structured attributes.
    #[track_caller]
    pub fn log_with_attrs<K, V>(
        &self,
        level: Level,
        message: impl Into<String>,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<Value>,
    {
        let builder = self
            .builder_at(level, message.into(), Location::caller())
            .attributes(attrs);
        self.dispatch(builder.build());
    }

    /// Dispatches a fully built event to every member.
    ///
    /// Members whose formatter fails drop the event; the remaining members
    /// still receive it.
    pub fn log_event(&self, event: &LogEvent) {
        for (name, logger) in &self.members {
            // Failures are counted by the logger itself.
            let _ = logger.log(name, event);
        }
    }

    /// Flushes every member.
    pub fn flush(&self) {
        for (_, logger) in &self.members {
            logger.flush();
        }
    }

    /// Replaces the filter of every member.
    pub fn change_filter(&self, filter: &Arc<dyn Filter>) {
        for (_, logger) in &self.members {
            logger.change_filter(Arc::clone(filter));
        }
    }

    /// Replaces the formatter of every member.
    pub fn change_formatter(&self, formatter: &Arc<dyn Formatter>) {
        for (_, logger) in &self.members {
            logger.change_formatter(Arc::clone(formatter));
        }
    }

    /// Replaces the handlers of every member. The first failure aborts.
    pub fn change_handlers(&self, handlers: &[Arc<dyn Handler>]) -> LogResult<()> {
        for (_, logger) in &self.members {
            logger.change_handlers(handlers.to_vec())?;
        }
        Ok(())
    }

    /// Replaces the filter of one member.
    pub fn change_filter_by_name(&self, name: &str, filter: Arc<dyn Filter>) -> LogResult<()> {
        self.member(name)?.change_filter(filter);
        Ok(())
    }

    /// Replaces the formatter of one member.
    pub fn change_formatter_by_name(
        &self,
        name: &str,
        formatter: Arc<dyn Formatter>,
    ) -> LogResult<()> {
        self.member(name)?.change_formatter(formatter);
        Ok(())
    }

    /// Replaces the handlers of one member.
    pub fn change_handlers_by_name(
        &self,
        name: &str,
        handlers: Vec<Arc<dyn Handler>>,
    ) -> LogResult<()> {
        self.member(name)?.change_handlers(handlers)
    }

    fn member(&self, name: &str) -> LogResult<&Arc<Logger>> {
        self.logger(name)
            .ok_or_else(|| LogError::NotFound(name.to_string()))
    }

    fn builder_at(
        &self,
        level: Level,
        message: String,
        location: &'static Location<'static>,
    ) -> LogEventBuilder {
        LogEvent::builder(level, message)
            .identity(&self.identity)
            .location(location.file(), location.line())
            .caller_address(std::ptr::from_ref(location).addr())
    }

    fn event_at(
        &self,
        level: Level,
        message: String,
        location: &'static Location<'static>,
    ) -> LogEvent {
        self.builder_at(level, message, location).build()
    }

    fn dispatch(&self, event: LogEvent) {
        self.log_event(&event);
    }
}

impl fmt::Debug for LoggerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerGroup")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::LevelFilter;
    use crate::formatter::StandardFormatter;
    use crate::testing::RecordingHandler;

    fn recording_logger(layout: &str) -> (Arc<Logger>, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::new());
        let logger = Logger::builder()
            .filter(Arc::new(LevelFilter::with_level(Level::Trace)))
            .formatter(Arc::new(StandardFormatter::new().with_layout(layout)))
            .handler(handler.clone())
            .build()
            .unwrap();
        logger.open_handlers();
        (Arc::new(logger), handler)
    }

    #[test]
    fn fans_out_under_member_names() {
        let (a, ha) = recording_logger("%(loggerName):%(message)");
        let (b, hb) = recording_logger("%(loggerName):%(message)");
        let mut group = LoggerGroup::new(ProcessIdentity::default());
        group.push("a", a);
        group.push("b", b);

        group.warn("hi");
        assert_eq!(ha.lines(), vec!["a:hi".to_string()]);
        assert_eq!(hb.lines(), vec!["b:hi".to_string()]);
    }

    #[test]
    fn duplicate_names_are_ignored() {
        let (a, ha) = recording_logger("%(message)");
        let mut group = LoggerGroup::new(ProcessIdentity::default());
        group.push("a", Arc::clone(&a));
        group.push("a", a);
        assert_eq!(group.len(), 1);

        group.info("once");
        assert_eq!(ha.write_count(), 1);
    }

    #[test]
    fn captures_call_site() {
        let (a, ha) = recording_logger("%(shortFileName):%(lineNum)");
        let mut group = LoggerGroup::new(ProcessIdentity::default());
        group.push("a", a);

        let line = line!() + 1;
        group.error("where");
        assert_eq!(ha.lines(), vec![format!("group.rs:{line}")]);
        assert_ne!(ha.events()[0].caller_address(), 0);
    }

    #[test]
    fn attributes_reach_handlers() {
        let (a, ha) = recording_logger("%(message)");
        let mut group = LoggerGroup::new(ProcessIdentity::new(1, "h", "p"));
        group.push("a", a);

        group.log_with_attrs(Level::Info, "req", [("status", 200)]);
        let events = ha.events();
        assert_eq!(events[0].attribute("status"), Some(&Value::from(200)));
        assert_eq!(events[0].program(), "p");
    }

    #[test]
    fn by_name_changes_report_unknown_members() {
        let (a, _) = recording_logger("%(message)");
        let mut group = LoggerGroup::new(ProcessIdentity::default());
        group.push("a", a);

        let filter: Arc<dyn Filter> = Arc::new(LevelFilter::new());
        assert_eq!(
            group.change_filter_by_name("zzz", filter.clone()),
            Err(LogError::NotFound("zzz".into()))
        );
        assert!(group.change_filter_by_name("a", filter).is_ok());
        assert_eq!(
            group.change_handlers_by_name("a", Vec::new()),
            Err(LogError::EmptyHandlers)
        );
    }

    #[test]
    fn group_change_handlers_aborts_on_first_error() {
        let (a, _) = recording_logger("%(message)");
        let (b, _) = recording_logger("%(message)");
        let mut group = LoggerGroup::new(ProcessIdentity::default());
        group.push("a", Arc::clone(&a));
        group.push("b", Arc::clone(&b));

        assert_eq!(group.change_handlers(&[]), Err(LogError::EmptyHandlers));
        assert_eq!(a.pipeline_version(), 0);
        assert_eq!(b.pipeline_version(), 0);

        let replacement: Arc<dyn Handler> = Arc::new(RecordingHandler::new());
        group.change_handlers(&[replacement]).unwrap();
        assert_eq!(a.pipeline_version(), 1);
        assert_eq!(b.pipeline_version(), 1);
    }
}
