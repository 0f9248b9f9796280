//! Terminal sink.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError, RwLock};

use console::{Color, Style, Term};
use logpipe_core::logging::{debug, targets};
use logpipe_core::{Handler, HandlerStats, Level, LogEvent, StatsCounter};
use serde::{Deserialize, Serialize};

/// Stream a [`ConsoleHandler`] writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleTarget {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
}

/// Foreground color applied to a whole rendered event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleColor {
    /// Leave the text unstyled.
    #[default]
    NoColor,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    LightGray,
    DarkGray,
    LightRed,
    LightGreen,
    LightYellow,
    LightBlue,
    LightMagenta,
    LightCyan,
    White,
}

impl ConsoleColor {
    fn style(self) -> Option<Style> {
        let (color, bright) = match self {
            ConsoleColor::NoColor => return None,
            ConsoleColor::Black => (Color::Black, false),
            ConsoleColor::Red => (Color::Red, false),
            ConsoleColor::Green => (Color::Green, false),
            ConsoleColor::Yellow => (Color::Yellow, false),
            ConsoleColor::Blue => (Color::Blue, false),
            ConsoleColor::Magenta => (Color::Magenta, false),
            ConsoleColor::Cyan => (Color::Cyan, false),
            ConsoleColor::LightGray => (Color::White, false),
            ConsoleColor::DarkGray => (Color::Black, true),
            ConsoleColor::LightRed => (Color::Red, true),
            ConsoleColor::LightGreen => (Color::Green, true),
            ConsoleColor::LightYellow => (Color::Yellow, true),
            ConsoleColor::LightBlue => (Color::Blue, true),
            ConsoleColor::LightMagenta => (Color::Magenta, true),
            ConsoleColor::LightCyan => (Color::Cyan, true),
            ConsoleColor::White => (Color::White, true),
        };
        let style = Style::new().fg(color);
        Some(if bright { style.bright() } else { style })
    }
}

struct Settings {
    target: ConsoleTarget,
    colors: [ConsoleColor; 9],
    force_styling: bool,
}

/// Writes rendered events to stdout or stderr, optionally colored per level.
///
/// The handler has no resource to acquire, so it always reports itself open
/// and `open`/`close` do nothing. Colors default to none; styling follows the
/// `console` crate's terminal detection unless forced.
pub struct ConsoleHandler {
    settings: RwLock<Settings>,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
    stats: StatsCounter,
}

impl ConsoleHandler {
    /// Creates a handler writing uncolored text to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(Settings {
                target: ConsoleTarget::Stdout,
                colors: [ConsoleColor::NoColor; 9],
                force_styling: false,
            }),
            writer: None,
            stats: StatsCounter::new(),
        }
    }

    /// Creates a handler writing to an arbitrary writer instead of a terminal.
    #[must_use]
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Some(Mutex::new(Box::new(writer))),
            ..Self::new()
        }
    }

    /// Builder-style [`set_target`](Self::set_target).
    #[must_use]
    pub fn with_target(self, target: ConsoleTarget) -> Self {
        self.set_target(target);
        self
    }

    /// Builder-style [`set_color`](Self::set_color).
    #[must_use]
    pub fn with_color(self, level: Level, color: ConsoleColor) -> Self {
        self.set_color(level, color);
        self
    }

    /// Builder-style [`set_force_styling`](Self::set_force_styling).
    #[must_use]
    pub fn with_force_styling(self, force: bool) -> Self {
        self.set_force_styling(force);
        self
    }

    /// Chooses stdout or stderr.
    pub fn set_target(&self, target: ConsoleTarget) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .target = target;
    }

    /// Sets the color used for events at `level`.
    pub fn set_color(&self, level: Level, color: ConsoleColor) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .colors[level_index(level)] = color;
    }

    /// Emits ANSI styling even when the stream is not a terminal.
    pub fn set_force_styling(&self, force: bool) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .force_styling = force;
    }

    #[must_use]
    pub fn target(&self) -> ConsoleTarget {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .target
    }

    #[must_use]
    pub fn color(&self, level: Level) -> ConsoleColor {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .colors[level_index(level)]
    }

    fn render(&self, level: Level, rendered: &str) -> (ConsoleTarget, String) {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        let text = match settings.colors[level_index(level)].style() {
            None => rendered.to_string(),
            Some(style) => {
                let mut style = style;
                if settings.target == ConsoleTarget::Stderr {
                    style = style.for_stderr();
                }
                if settings.force_styling {
                    style = style.force_styling(true);
                }
                style.apply_to(rendered).to_string()
            }
        };
        (settings.target, text)
    }

    fn emit(&self, target: ConsoleTarget, text: &str) -> std::io::Result<()> {
        if let Some(writer) = &self.writer {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            return writer.write_all(text.as_bytes());
        }
        terminal(target).write_str(text)
    }
}

fn level_index(level: Level) -> usize {
    usize::from(level.as_num() - 1)
}

fn terminal(target: ConsoleTarget) -> Term {
    match target {
        ConsoleTarget::Stdout => Term::stdout(),
        ConsoleTarget::Stderr => Term::stderr(),
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ConsoleHandler {
    fn name(&self) -> &str {
        "ConsoleHandler"
    }

    fn is_opened(&self) -> bool {
        true
    }

    fn open(&self) {}

    fn write(&self, _logger_name: &str, event: &LogEvent, rendered: &str) {
        let (target, text) = self.render(event.level(), rendered);
        match self.emit(target, &text) {
            Ok(()) => self.stats.record_write(text.len()),
            Err(err) => {
                self.stats.record_error();
                debug!(target: targets::SINK, "Console write failed: {}", err);
            }
        }
    }

    fn flush(&self) {
        let result = match &self.writer {
            Some(writer) => writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush(),
            None => terminal(self.target()).flush(),
        };
        match result {
            Ok(()) => self.stats.record_flush(),
            Err(_) => self.stats.record_error(),
        }
    }

    fn close(&self) {}

    fn stats(&self) -> HandlerStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for ConsoleHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ConsoleHandler")
            .field("target", &settings.target)
            .field("colors", &settings.colors)
            .field("custom_writer", &self.writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn raw(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn event(level: Level) -> LogEvent {
        LogEvent::builder(level, "m").build()
    }

    #[test]
    fn plain_by_default() {
        let buf = SharedBuf::default();
        let handler = ConsoleHandler::with_writer(buf.clone());
        handler.write("app", &event(Level::Error), "hello\n");
        handler.flush();
        assert_eq!(buf.raw(), "hello\n");
        assert!(handler.is_opened());
        assert_eq!(handler.stats().writes, 1);
    }

    #[test]
    fn per_level_color_is_applied() {
        let buf = SharedBuf::default();
        let handler = ConsoleHandler::with_writer(buf.clone())
            .with_color(Level::Error, ConsoleColor::Red)
            .with_force_styling(true);
        handler.write("app", &event(Level::Error), "bad");
        handler.write("app", &event(Level::Info), "fine");

        let raw = buf.raw();
        assert!(raw.starts_with("\u{1b}[31m"));
        let stripped = String::from_utf8(strip_ansi_escapes::strip(raw.as_bytes())).unwrap();
        assert_eq!(stripped, "badfine");
        assert_eq!(handler.color(Level::Info), ConsoleColor::NoColor);
    }

    #[test]
    fn color_names_deserialize() {
        let color: ConsoleColor = serde_json::from_str("\"light_cyan\"").unwrap();
        assert_eq!(color, ConsoleColor::LightCyan);
        let target: ConsoleTarget = serde_json::from_str("\"stderr\"").unwrap();
        assert_eq!(target, ConsoleTarget::Stderr);
    }
}
