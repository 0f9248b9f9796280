//! The log event model.
//!
//! A [`LogEvent`] is built once per call site invocation and never changes
//! afterwards. Handlers receive it by shared reference, so one event can be
//! written to every sink of a logger concurrently without copying.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::level::Level;

/// Identity of the emitting process, attached to every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pid: u32,
    hostname: Arc<str>,
    program: Arc<str>,
}

impl ProcessIdentity {
    /// Creates an identity from already discovered values.
    #[must_use]
    pub fn new(pid: u32, hostname: impl Into<Arc<str>>, program: impl Into<Arc<str>>) -> Self {
        Self {
            pid,
            hostname: hostname.into(),
            program: program.into(),
        }
    }

    /// Discovers the identity of the running process.
    ///
    /// The program is the executable's file stem. The host name is read from
    /// `/proc/sys/kernel/hostname`, then `$HOSTNAME`, falling back to
    /// `localhost`.
    #[must_use]
    pub fn current() -> Self {
        let program = std::env::current_exe()
            .ok()
            .and_then(|exe| file_stem(&exe))
            .or_else(|| std::env::args().next().and_then(|arg| file_stem(Path::new(&arg))))
            .unwrap_or_else(|| "logpipe".to_string());
        Self::new(std::process::id(), discover_hostname(), program)
    }

    /// Process id.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Program (executable base) name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

fn discover_hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|name| !name.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

impl Default for ProcessIdentity {
    fn default() -> Self {
        Self::new(std::process::id(), "localhost", "logpipe")
    }
}

/// Immutable snapshot of one log occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pid: u32,
    hostname: Arc<str>,
    program: Arc<str>,
    timestamp: DateTime<Local>,
    level: Level,
    caller_address: usize,
    file_name: String,
    line_number: u32,
    message: String,
    attributes: BTreeMap<String, Value>,
}

impl LogEvent {
    /// Starts building an event stamped with the current local time.
    #[must_use]
    pub fn builder(level: Level, message: impl Into<String>) -> LogEventBuilder {
        LogEventBuilder::new(level, message.into())
    }

    /// Process id of the emitter.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Host name of the emitter.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Program name of the emitter.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// When the event occurred. Rotation decisions are keyed to this value.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Severity.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Opaque caller address; zero when unknown.
    #[must_use]
    pub fn caller_address(&self) -> usize {
        self.caller_address
    }

    /// Source file of the call site.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Base name of [`file_name`](Self::file_name).
    #[must_use]
    pub fn short_file_name(&self) -> &str {
        Path::new(&self.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Source line of the call site.
    #[must_use]
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// Rendered message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Looks up one attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All attributes.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

/// Builder for [`LogEvent`].
#[derive(Debug, Clone)]
pub struct LogEventBuilder {
    event: LogEvent,
}

impl LogEventBuilder {
    fn new(level: Level, message: String) -> Self {
        let identity = ProcessIdentity::default();
        Self {
            event: LogEvent {
                pid: identity.pid,
                hostname: identity.hostname,
                program: identity.program,
                timestamp: Local::now(),
                level,
                caller_address: 0,
                file_name: String::new(),
                line_number: 0,
                message,
                attributes: BTreeMap::new(),
            },
        }
    }

    /// Copies pid, hostname and program from `identity`.
    #[must_use]
    pub fn identity(mut self, identity: &ProcessIdentity) -> Self {
        self.event.pid = identity.pid;
        self.event.hostname = Arc::clone(&identity.hostname);
        self.event.program = Arc::clone(&identity.program);
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    /// Sets the call-site file and line.
    #[must_use]
    pub fn location(mut self, file_name: impl Into<String>, line_number: u32) -> Self {
        self.event.file_name = file_name.into();
        self.event.line_number = line_number;
        self
    }

    /// Sets the opaque caller address.
    #[must_use]
    pub fn caller_address(mut self, address: usize) -> Self {
        self.event.caller_address = address;
        self
    }

    /// Adds one attribute, replacing any previous value for `key`.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.attributes.insert(key.into(), value.into());
        self
    }

    /// Adds several attributes.
    #[must_use]
    pub fn attributes<K, V>(mut self, attrs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.event
            .attributes
            .extend(attrs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Finishes the event.
    #[must_use]
    pub fn build(self) -> LogEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn current_identity_is_discovered() {
        let identity = ProcessIdentity::current();
        assert_eq!(identity.pid(), std::process::id());
        assert!(!identity.hostname().is_empty());
        assert!(!identity.program().is_empty());
        assert!(!identity.hostname().ends_with('\n'));
    }

    #[test]
    fn builder_sets_every_field() {
        let identity = ProcessIdentity::new(4242, "host-a", "svc");
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let event = LogEvent::builder(Level::Warn, "disk almost full")
            .identity(&identity)
            .timestamp(ts)
            .location("/src/app/main.rs", 17)
            .caller_address(0xdead)
            .attribute("percent", 93)
            .build();

        assert_eq!(event.pid(), 4242);
        assert_eq!(event.hostname(), "host-a");
        assert_eq!(event.program(), "svc");
        assert_eq!(event.timestamp(), ts);
        assert_eq!(event.level(), Level::Warn);
        assert_eq!(event.caller_address(), 0xdead);
        assert_eq!(event.file_name(), "/src/app/main.rs");
        assert_eq!(event.short_file_name(), "main.rs");
        assert_eq!(event.line_number(), 17);
        assert_eq!(event.message(), "disk almost full");
        assert_eq!(event.attribute("percent"), Some(&Value::from(93)));
    }

    #[test]
    fn short_file_name_without_directory() {
        let event = LogEvent::builder(Level::Info, "x").location("lib.rs", 1).build();
        assert_eq!(event.short_file_name(), "lib.rs");
    }

    #[test]
    fn attributes_later_keys_win() {
        let event = LogEvent::builder(Level::Info, "x")
            .attributes([("a", 1), ("b", 2)])
            .attribute("a", 3)
            .build();
        assert_eq!(event.attributes().len(), 2);
        assert_eq!(event.attribute("a"), Some(&Value::from(3)));
        assert_eq!(event.attribute("missing"), None);
    }

    #[test]
    fn event_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogEvent>();
    }
}
