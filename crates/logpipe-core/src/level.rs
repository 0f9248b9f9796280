//! Severity levels.
//!
//! Levels follow the syslog ordering: a numerically lower level is more
//! severe. `Level::Emerg` is `1` and `Level::Trace` is `9`, so "at least as
//! severe as X" means `level <= X`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// System is unusable.
    Emerg = 1,
    /// Action must be taken immediately.
    Alert = 2,
    /// Critical conditions.
    Crit = 3,
    /// Error conditions.
    Error = 4,
    /// Warning conditions.
    Warn = 5,
    /// Normal but significant conditions.
    Notice = 6,
    /// Informational messages.
    Info = 7,
    /// Debugging information.
    Debug = 8,
    /// Very verbose debugging information.
    Trace = 9,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL: [Level; 9] = [
        Level::Emerg,
        Level::Alert,
        Level::Crit,
        Level::Error,
        Level::Warn,
        Level::Notice,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// Upper-case name used by formatters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Emerg => "EMERG",
            Level::Alert => "ALERT",
            Level::Crit => "CRIT",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Notice => "NOTICE",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    /// Numeric form, `1..=9`.
    #[must_use]
    pub const fn as_num(self) -> u8 {
        self as u8
    }

    /// Looks a level up by its numeric form.
    #[must_use]
    pub fn from_num(num: u8) -> Option<Self> {
        Self::ALL.get(usize::from(num).checked_sub(1)?).copied()
    }

    /// Returns true when `self` is at least as severe as `threshold`.
    #[inline]
    #[must_use]
    pub fn passes(self, threshold: Level) -> bool {
        self <= threshold
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(num) = trimmed.parse::<u8>() {
            return Level::from_num(num).ok_or_else(|| ParseLevelError(s.to_string()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "emerg" | "emergency" => Ok(Level::Emerg),
            "alert" => Ok(Level::Alert),
            "crit" | "critical" => Ok(Level::Crit),
            "error" | "err" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "notice" => Ok(Level::Notice),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_table_is_bit_exact() {
        let expected = [
            (1, "EMERG"),
            (2, "ALERT"),
            (3, "CRIT"),
            (4, "ERROR"),
            (5, "WARN"),
            (6, "NOTICE"),
            (7, "INFO"),
            (8, "DEBUG"),
            (9, "TRACE"),
        ];
        for (level, (num, name)) in Level::ALL.iter().zip(expected) {
            assert_eq!(level.as_num(), num);
            assert_eq!(level.as_str(), name);
        }
    }

    #[test]
    fn lower_number_is_more_severe() {
        assert!(Level::Emerg < Level::Trace);
        assert!(Level::Error.passes(Level::Notice));
        assert!(Level::Notice.passes(Level::Notice));
        assert!(!Level::Info.passes(Level::Notice));
    }

    #[test]
    fn parse_names_aliases_and_numbers() {
        assert_eq!("INFO".parse::<Level>(), Ok(Level::Info));
        assert_eq!(" warning ".parse::<Level>(), Ok(Level::Warn));
        assert_eq!("crit".parse::<Level>(), Ok(Level::Crit));
        assert_eq!("6".parse::<Level>(), Ok(Level::Notice));
        assert!("0".parse::<Level>().is_err());
        assert!("10".parse::<Level>().is_err());
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn from_num_bounds() {
        assert_eq!(Level::from_num(1), Some(Level::Emerg));
        assert_eq!(Level::from_num(9), Some(Level::Trace));
        assert_eq!(Level::from_num(0), None);
    }

    #[test]
    fn serde_uses_upper_case_names() {
        let json = serde_json::to_string(&Level::Notice).unwrap();
        assert_eq!(json, "\"NOTICE\"");
        let back: Level = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(back, Level::Debug);
    }
}
