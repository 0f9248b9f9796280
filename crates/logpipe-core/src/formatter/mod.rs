//! Event formatters.
//!
//! - [`StandardFormatter`] substitutes `%(token)` placeholders in a layout
//! - [`JsonFormatter`] renders one JSON object per line
//!
//! Formatter settings live behind each formatter's own lock, so they can be
//! tuned at runtime without swapping the logger pipeline.

mod json;
mod standard;

pub use json::JsonFormatter;
pub use standard::{PLACEHOLDERS, StandardFormatter};

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::FormatError;
use crate::event::LogEvent;

/// Renders an event to the text handed to every handler.
pub trait Formatter: Send + Sync {
    /// Renders `event` as emitted by the logger `logger_name`.
    fn format(&self, logger_name: &str, event: &LogEvent) -> Result<String, FormatError>;
}

impl<F: Formatter + ?Sized> Formatter for Arc<F> {
    fn format(&self, logger_name: &str, event: &LogEvent) -> Result<String, FormatError> {
        (**self).format(logger_name, event)
    }
}

/// Checks that `layout` is a usable strftime-style date/time layout.
pub fn validate_date_time_layout(layout: &str) -> Result<(), FormatError> {
    if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
        return Err(FormatError::Layout(format!(
            "invalid date/time layout: {layout}"
        )));
    }
    Ok(())
}

/// Writes `timestamp` using `layout`, reporting bad layouts instead of panicking.
pub(crate) fn write_timestamp(
    out: &mut String,
    timestamp: &DateTime<Local>,
    layout: &str,
) -> Result<(), FormatError> {
    write!(out, "{}", timestamp.format(layout))
        .map_err(|_| FormatError::Layout(format!("invalid date/time layout: {layout}")))
}
