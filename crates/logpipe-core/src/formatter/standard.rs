//! Template substitution formatter.

use std::fmt;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;

use super::{Formatter, write_timestamp};
use crate::error::FormatError;
use crate::event::LogEvent;

/// Every placeholder the layout understands.
pub const PLACEHOLDERS: [&str; 12] = [
    "%(dateTime)",
    "%(logLevel)",
    "%(logLevelNum)",
    "%(program)",
    "%(pid)",
    "%(hostname)",
    "%(loggerName)",
    "%(programCounter)",
    "%(fileName)",
    "%(shortFileName)",
    "%(lineNum)",
    "%(message)",
];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([A-Za-z]+)\)").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    DateTime,
    LogLevel,
    LogLevelNum,
    Program,
    Pid,
    Hostname,
    LoggerName,
    ProgramCounter,
    FileName,
    ShortFileName,
    LineNum,
    Message,
}

impl Token {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "dateTime" => Token::DateTime,
            "logLevel" => Token::LogLevel,
            "logLevelNum" => Token::LogLevelNum,
            "program" => Token::Program,
            "pid" => Token::Pid,
            "hostname" => Token::Hostname,
            "loggerName" => Token::LoggerName,
            "programCounter" => Token::ProgramCounter,
            "fileName" => Token::FileName,
            "shortFileName" => Token::ShortFileName,
            "lineNum" => Token::LineNum,
            "message" => Token::Message,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// Splits a layout into literal runs and recognized placeholders.
///
/// Unrecognized `%(...)` sequences stay in the output verbatim.
fn compile(layout: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(layout) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        literal.push_str(&layout[last..whole.start()]);
        match Token::parse(&caps[1]) {
            Some(token) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Token(token));
            }
            None => literal.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    literal.push_str(&layout[last..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

struct Settings {
    layout: String,
    segments: Vec<Segment>,
    date_time_layout: String,
    append_newline: bool,
}

/// Renders events by substituting placeholders in a layout string.
///
/// The layout is compiled once per [`set_layout`](Self::set_layout) call.
/// `%(dateTime)` uses a strftime-style layout, `%(programCounter)` renders in
/// lower-case hex and `%(shortFileName)` is the base name of the source file.
pub struct StandardFormatter {
    settings: RwLock<Settings>,
}

impl StandardFormatter {
    /// Default layout.
    pub const DEFAULT_LAYOUT: &'static str =
        "%(dateTime) [%(logLevel)] (%(pid)) %(loggerName) %(fileName) %(lineNum) %(message)";

    /// Default date/time layout.
    pub const DEFAULT_DATE_TIME_LAYOUT: &'static str = "%Y-%m-%d %H:%M:%S";

    /// Creates a formatter with the default layouts and no trailing newline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(Settings {
                layout: Self::DEFAULT_LAYOUT.to_string(),
                segments: compile(Self::DEFAULT_LAYOUT),
                date_time_layout: Self::DEFAULT_DATE_TIME_LAYOUT.to_string(),
                append_newline: false,
            }),
        }
    }

    /// Builder-style layout override.
    #[must_use]
    pub fn with_layout(self, layout: impl Into<String>) -> Self {
        self.set_layout(layout);
        self
    }

    /// Builder-style date/time layout override.
    #[must_use]
    pub fn with_date_time_layout(self, layout: impl Into<String>) -> Self {
        self.set_date_time_layout(layout);
        self
    }

    /// Builder-style trailing newline toggle.
    #[must_use]
    pub fn with_append_newline(self, append: bool) -> Self {
        self.set_append_newline(append);
        self
    }

    /// Replaces the layout.
    pub fn set_layout(&self, layout: impl Into<String>) {
        let layout = layout.into();
        let segments = compile(&layout);
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        settings.layout = layout;
        settings.segments = segments;
    }

    /// Replaces the date/time layout.
    pub fn set_date_time_layout(&self, layout: impl Into<String>) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .date_time_layout = layout.into();
    }

    /// When enabled, a newline is appended to output that does not already end with one.
    pub fn set_append_newline(&self, append: bool) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .append_newline = append;
    }

    /// Current layout.
    #[must_use]
    pub fn layout(&self) -> String {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .layout
            .clone()
    }

    /// Current date/time layout.
    #[must_use]
    pub fn date_time_layout(&self) -> String {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .date_time_layout
            .clone()
    }
}

impl Default for StandardFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for StandardFormatter {
    fn format(&self, logger_name: &str, event: &LogEvent) -> Result<String, FormatError> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::with_capacity(settings.layout.len() + event.message().len() + 32);

        for segment in &settings.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(Token::DateTime) => {
                    write_timestamp(&mut out, &event.timestamp(), &settings.date_time_layout)?;
                }
                Segment::Token(Token::LogLevel) => out.push_str(event.level().as_str()),
                Segment::Token(Token::LogLevelNum) => {
                    out.push_str(&event.level().as_num().to_string());
                }
                Segment::Token(Token::Program) => out.push_str(event.program()),
                Segment::Token(Token::Pid) => out.push_str(&event.pid().to_string()),
                Segment::Token(Token::Hostname) => out.push_str(event.hostname()),
                Segment::Token(Token::LoggerName) => out.push_str(logger_name),
                Segment::Token(Token::ProgramCounter) => {
                    out.push_str(&format!("{:x}", event.caller_address()));
                }
                Segment::Token(Token::FileName) => out.push_str(event.file_name()),
                Segment::Token(Token::ShortFileName) => out.push_str(event.short_file_name()),
                Segment::Token(Token::LineNum) => {
                    out.push_str(&event.line_number().to_string());
                }
                Segment::Token(Token::Message) => out.push_str(event.message()),
            }
        }

        if settings.append_newline && !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}

impl fmt::Debug for StandardFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StandardFormatter")
            .field("layout", &settings.layout)
            .field("date_time_layout", &settings.date_time_layout)
            .field("append_newline", &settings.append_newline)
            .finish()
    }
}
