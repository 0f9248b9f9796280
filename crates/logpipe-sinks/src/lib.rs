//! Output sinks for logpipe.
//!
//! Every sink implements [`logpipe_core::Handler`]:
//!
//! - [`ConsoleHandler`] writes to stdout/stderr with optional per-level color
//! - [`SyslogHandler`] speaks RFC 3164 to a local socket or a remote collector
//! - [`RotatingFileSink`] appends to a file that rotates itself by day and
//!   size, with optional buffered writes and age-based retention
//!
//! Sinks never return errors from `write`; failures are counted in their
//! [`HandlerStats`](logpipe_core::HandlerStats) and logged at debug level on
//! the `logpipe::sink` target.

#![forbid(unsafe_code)]

mod console;
pub mod file;
mod syslog;

pub use self::console::{ConsoleColor, ConsoleHandler, ConsoleTarget};
pub use self::file::RotatingFileSink;
pub use self::syslog::{Facility, LOCAL_SOCKETS, SyslogHandler, SyslogTransport, severity};
