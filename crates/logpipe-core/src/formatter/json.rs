//! One-JSON-object-per-line formatter.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;

use super::{Formatter, write_timestamp};
use crate::error::FormatError;
use crate::event::LogEvent;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRecord<'a> {
    logger_name: &'a str,
    program: &'a str,
    pid: u32,
    hostname: &'a str,
    time: String,
    log_level: &'static str,
    log_level_num: u8,
    pc: usize,
    file_name: &'a str,
    line_num: u32,
    message: &'a str,
    attrs: &'a BTreeMap<String, Value>,
}

/// Serializes each event as a single JSON object followed by `\n`.
pub struct JsonFormatter {
    date_time_layout: RwLock<String>,
}

impl JsonFormatter {
    /// Default date/time layout.
    pub const DEFAULT_DATE_TIME_LAYOUT: &'static str = "%Y-%m-%d %H:%M:%S %z";

    /// Creates a formatter with the default date/time layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            date_time_layout: RwLock::new(Self::DEFAULT_DATE_TIME_LAYOUT.to_string()),
        }
    }

    /// Builder-style date/time layout override.
    #[must_use]
    pub fn with_date_time_layout(self, layout: impl Into<String>) -> Self {
        self.set_date_time_layout(layout);
        self
    }

    /// Replaces the date/time layout.
    pub fn set_date_time_layout(&self, layout: impl Into<String>) {
        *self
            .date_time_layout
            .write()
            .unwrap_or_else(PoisonError::into_inner) = layout.into();
    }

    /// Current date/time layout.
    #[must_use]
    pub fn date_time_layout(&self) -> String {
        self.date_time_layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, logger_name: &str, event: &LogEvent) -> Result<String, FormatError> {
        let mut time = String::new();
        {
            let layout = self
                .date_time_layout
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            write_timestamp(&mut time, &event.timestamp(), &layout)?;
        }

        let record = JsonRecord {
            logger_name,
            program: event.program(),
            pid: event.pid(),
            hostname: event.hostname(),
            time,
            log_level: event.level().as_str(),
            log_level_num: event.level().as_num(),
            pc: event.caller_address(),
            file_name: event.file_name(),
            line_num: event.line_number(),
            message: event.message(),
            attrs: event.attributes(),
        };

        let mut out = serde_json::to_string(&record)?;
        out.push('\n');
        Ok(out)
    }
}

impl fmt::Debug for JsonFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFormatter")
            .field("date_time_layout", &self.date_time_layout())
            .finish()
    }
}
