//! Minimal RFC 3164 syslog client sink.

use std::fmt;
use std::io::{self, Write};
use std::net::{TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::{UnixDatagram, UnixStream};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use logpipe_core::logging::{debug, targets};
use logpipe_core::{Handler, HandlerStats, Level, LogEvent, ProcessIdentity, StatsCounter};

/// Well-known local syslog socket paths, tried in order.
pub const LOCAL_SOCKETS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

/// Syslog facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facility {
    Kern,
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
    Lpr,
    News,
    Uucp,
    Cron,
    AuthPriv,
    Ftp,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl Facility {
    /// Facility code, already shifted into the priority value.
    #[must_use]
    pub const fn code(self) -> u8 {
        let number = match self {
            Facility::Kern => 0,
            Facility::User => 1,
            Facility::Mail => 2,
            Facility::Daemon => 3,
            Facility::Auth => 4,
            Facility::Syslog => 5,
            Facility::Lpr => 6,
            Facility::News => 7,
            Facility::Uucp => 8,
            Facility::Cron => 9,
            Facility::AuthPriv => 10,
            Facility::Ftp => 11,
            Facility::Local0 => 16,
            Facility::Local1 => 17,
            Facility::Local2 => 18,
            Facility::Local3 => 19,
            Facility::Local4 => 20,
            Facility::Local5 => 21,
            Facility::Local6 => 22,
            Facility::Local7 => 23,
        };
        number << 3
    }
}

impl FromStr for Facility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "KERN" => Facility::Kern,
            "USER" => Facility::User,
            "MAIL" => Facility::Mail,
            "DAEMON" => Facility::Daemon,
            "AUTH" => Facility::Auth,
            "SYSLOG" => Facility::Syslog,
            "LPR" => Facility::Lpr,
            "NEWS" => Facility::News,
            "UUCP" => Facility::Uucp,
            "CRON" => Facility::Cron,
            "AUTHPRIV" => Facility::AuthPriv,
            "FTP" => Facility::Ftp,
            "LOCAL0" => Facility::Local0,
            "LOCAL1" => Facility::Local1,
            "LOCAL2" => Facility::Local2,
            "LOCAL3" => Facility::Local3,
            "LOCAL4" => Facility::Local4,
            "LOCAL5" => Facility::Local5,
            "LOCAL6" => Facility::Local6,
            "LOCAL7" => Facility::Local7,
            _ => return Err(format!("unknown syslog facility: {s}")),
        })
    }
}

/// Syslog severity of a level. `Trace` shares `Debug`'s severity.
#[must_use]
pub const fn severity(level: Level) -> u8 {
    match level {
        Level::Emerg => 0,
        Level::Alert => 1,
        Level::Crit => 2,
        Level::Error => 3,
        Level::Warn => 4,
        Level::Notice => 5,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

/// Where syslog messages go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyslogTransport {
    /// The first reachable well-known local socket.
    #[default]
    Local,
    /// A specific local socket path (datagram, then stream).
    Unix(PathBuf),
    /// A remote collector over UDP.
    Udp(String),
    /// A remote collector over TCP.
    Tcp(String),
}

impl SyslogTransport {
    /// Builds a transport from a network name and address.
    ///
    /// An empty network selects the local socket; `unix`/`unixgram` take a
    /// socket path; `udp`/`tcp` take `host:port`.
    pub fn from_network(network: &str, addr: &str) -> Result<Self, String> {
        match network.trim().to_ascii_lowercase().as_str() {
            "" => Ok(SyslogTransport::Local),
            "unix" | "unixgram" if !addr.is_empty() => Ok(SyslogTransport::Unix(addr.into())),
            "udp" | "udp4" | "udp6" if !addr.is_empty() => Ok(SyslogTransport::Udp(addr.into())),
            "tcp" | "tcp4" | "tcp6" if !addr.is_empty() => Ok(SyslogTransport::Tcp(addr.into())),
            "unix" | "unixgram" | "udp" | "udp4" | "udp6" | "tcp" | "tcp4" | "tcp6" => {
                Err(format!("syslog network {network} needs an address"))
            }
            other => Err(format!("unknown syslog network: {other}")),
        }
    }

    fn is_local(&self) -> bool {
        matches!(self, SyslogTransport::Local | SyslogTransport::Unix(_))
    }
}

enum Connection {
    #[cfg(unix)]
    UnixDatagram(UnixDatagram),
    #[cfg(unix)]
    UnixStream(UnixStream),
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Connection {
    fn dial(transport: &SyslogTransport) -> io::Result<Self> {
        match transport {
            SyslogTransport::Local => {
                let mut last = io::Error::new(io::ErrorKind::NotFound, "no local syslog socket");
                for path in LOCAL_SOCKETS {
                    match Self::dial_unix(Path::new(path)) {
                        Ok(conn) => return Ok(conn),
                        Err(err) => last = err,
                    }
                }
                Err(last)
            }
            SyslogTransport::Unix(path) => Self::dial_unix(path),
            SyslogTransport::Udp(addr) => {
                let socket = UdpSocket::bind(if addr.starts_with('[') {
                    "[::]:0"
                } else {
                    "0.0.0.0:0"
                })?;
                socket.connect(addr.as_str())?;
                Ok(Connection::Udp(socket))
            }
            SyslogTransport::Tcp(addr) => Ok(Connection::Tcp(TcpStream::connect(addr.as_str())?)),
        }
    }

    #[cfg(unix)]
    fn dial_unix(path: &Path) -> io::Result<Self> {
        let datagram = UnixDatagram::unbound().and_then(|socket| {
            socket.connect(path)?;
            Ok(socket)
        });
        match datagram {
            Ok(socket) => Ok(Connection::UnixDatagram(socket)),
            Err(_) => Ok(Connection::UnixStream(UnixStream::connect(path)?)),
        }
    }

    #[cfg(not(unix))]
    fn dial_unix(path: &Path) -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unix sockets unavailable: {}", path.display()),
        ))
    }

    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        match self {
            #[cfg(unix)]
            Connection::UnixDatagram(socket) => socket.send(message).map(|_| ()),
            #[cfg(unix)]
            Connection::UnixStream(stream) => stream.write_all(message),
            Connection::Udp(socket) => socket.send(message).map(|_| ()),
            Connection::Tcp(stream) => stream.write_all(message),
        }
    }
}

struct State {
    transport: SyslogTransport,
    tag: String,
    facility: Facility,
    opened: bool,
    connection: Option<Connection>,
}

impl State {
    fn connect(&mut self, stats: &StatsCounter) {
        match Connection::dial(&self.transport) {
            Ok(conn) => self.connection = Some(conn),
            Err(err) => {
                stats.record_error();
                debug!(target: targets::SINK, "Syslog dial {:?} failed: {}", self.transport, err);
            }
        }
    }
}

/// Sends rendered events to a syslog daemon.
///
/// A failed dial is counted and retried by the next write.
pub struct SyslogHandler {
    state: Mutex<State>,
    hostname: String,
    pid: u32,
    stats: StatsCounter,
}

impl SyslogHandler {
    /// Creates a handler tagged with the program name, facility `LOCAL0`,
    /// sending to the local syslog socket.
    #[must_use]
    pub fn new(identity: &ProcessIdentity) -> Self {
        Self {
            state: Mutex::new(State {
                transport: SyslogTransport::Local,
                tag: identity.program().to_string(),
                facility: Facility::Local0,
                opened: false,
                connection: None,
            }),
            hostname: identity.hostname().to_string(),
            pid: identity.pid(),
            stats: StatsCounter::new(),
        }
    }

    /// Builder-style [`set_transport`](Self::set_transport).
    #[must_use]
    pub fn with_transport(self, transport: SyslogTransport) -> Self {
        self.set_transport(transport);
        self
    }

    /// Builder-style [`set_tag`](Self::set_tag).
    #[must_use]
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        self.set_tag(tag);
        self
    }

    /// Builder-style [`set_facility`](Self::set_facility).
    #[must_use]
    pub fn with_facility(self, facility: Facility) -> Self {
        self.set_facility(facility);
        self
    }

    /// Changes the destination, reconnecting if the handler is open.
    pub fn set_transport(&self, transport: SyslogTransport) {
        let mut state = self.lock();
        if state.transport == transport {
            return;
        }
        state.transport = transport;
        state.connection = None;
        if state.opened {
            state.connect(&self.stats);
        }
    }

    pub fn set_tag(&self, tag: impl Into<String>) {
        self.lock().tag = tag.into();
    }

    pub fn set_facility(&self, facility: Facility) {
        self.lock().facility = facility;
    }

    #[must_use]
    pub fn transport(&self) -> SyslogTransport {
        self.lock().transport.clone()
    }

    #[must_use]
    pub fn tag(&self) -> String {
        self.lock().tag.clone()
    }

    #[must_use]
    pub fn facility(&self) -> Facility {
        self.lock().facility
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn frame(&self, state: &State, level: Level, timestamp: DateTime<Local>, text: &str) -> String {
        let priority = u16::from(state.facility.code()) | u16::from(severity(level));
        let newline = if text.ends_with('\n') { "" } else { "\n" };
        if state.transport.is_local() {
            format!(
                "<{priority}>{} {}[{}]: {text}{newline}",
                timestamp.format("%b %e %H:%M:%S"),
                state.tag,
                self.pid
            )
        } else {
            format!(
                "<{priority}>{} {} {}[{}]: {text}{newline}",
                timestamp.to_rfc3339(),
                self.hostname,
                state.tag,
                self.pid
            )
        }
    }
}

impl Handler for SyslogHandler {
    fn name(&self) -> &str {
        "SyslogHandler"
    }

    fn is_opened(&self) -> bool {
        self.lock().opened
    }

    fn open(&self) {
        let mut state = self.lock();
        state.opened = true;
        if state.connection.is_none() {
            state.connect(&self.stats);
        }
    }

    fn write(&self, _logger_name: &str, event: &LogEvent, rendered: &str) {
        let mut state = self.lock();
        if state.connection.is_none() {
            state.connect(&self.stats);
        }
        let message = self.frame(&state, event.level(), event.timestamp(), rendered);
        let Some(connection) = state.connection.as_mut() else {
            return;
        };
        match connection.send(message.as_bytes()) {
            Ok(()) => self.stats.record_write(message.len()),
            Err(err) => {
                self.stats.record_error();
                state.connection = None;
                debug!(target: targets::SINK, "Syslog send failed: {}", err);
            }
        }
    }

    fn flush(&self) {
        self.stats.record_flush();
    }

    fn close(&self) {
        let mut state = self.lock();
        state.connection = None;
        state.opened = false;
    }

    fn stats(&self) -> HandlerStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for SyslogHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SyslogHandler")
            .field("transport", &state.transport)
            .field("tag", &state.tag)
            .field("facility", &state.facility)
            .field("connected", &state.connection.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    fn identity() -> ProcessIdentity {
        ProcessIdentity::new(321, "myhost", "daemon")
    }

    #[test]
    fn facility_codes_and_severity() {
        assert_eq!(Facility::Kern.code(), 0);
        assert_eq!(Facility::Local0.code(), 128);
        assert_eq!(Facility::Local7.code(), 184);
        assert_eq!("authpriv".parse::<Facility>(), Ok(Facility::AuthPriv));
        assert!("LOCAL9".parse::<Facility>().is_err());

        let severities: Vec<u8> = Level::ALL.iter().map(|l| severity(*l)).collect();
        assert_eq!(severities, vec![0, 1, 2, 3, 4, 5, 6, 7, 7]);
    }

    #[test]
    fn transport_parsing() {
        assert_eq!(SyslogTransport::from_network("", ""), Ok(SyslogTransport::Local));
        assert_eq!(
            SyslogTransport::from_network("UDP", "10.0.0.1:514"),
            Ok(SyslogTransport::Udp("10.0.0.1:514".into()))
        );
        assert!(SyslogTransport::from_network("tcp", "").is_err());
        assert!(SyslogTransport::from_network("carrier-pigeon", "x").is_err());
    }

    #[test]
    fn udp_messages_carry_priority_host_and_tag() {
        let collector = UdpSocket::bind("127.0.0.1:0").unwrap();
        collector
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let addr = collector.local_addr().unwrap().to_string();

        let handler = SyslogHandler::new(&identity())
            .with_transport(SyslogTransport::Udp(addr))
            .with_facility(Facility::Local0);
        handler.open();
        handler.write("app", &LogEvent::builder(Level::Info, "m").build(), "hello");

        let mut buf = [0u8; 1024];
        let len = collector.recv(&mut buf).unwrap();
        let received = std::str::from_utf8(&buf[..len]).unwrap();
        assert!(received.starts_with("<134>"), "{received}");
        assert!(received.contains(" myhost daemon[321]: hello"), "{received}");
        assert!(received.ends_with('\n'));
        assert_eq!(handler.stats().writes, 1);
    }

    #[cfg(unix)]
    #[test]
    fn unix_datagram_uses_local_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.sock");
        let server = UnixDatagram::bind(&path).unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let handler = SyslogHandler::new(&identity())
            .with_transport(SyslogTransport::Unix(path))
            .with_tag("worker")
            .with_facility(Facility::Daemon);
        handler.open();
        handler.write("app", &LogEvent::builder(Level::Trace, "m").build(), "x\n");

        let mut buf = [0u8; 1024];
        let len = server.recv(&mut buf).unwrap();
        let received = std::str::from_utf8(&buf[..len]).unwrap();
        assert!(received.starts_with("<31>"), "{received}");
        assert!(received.ends_with(" worker[321]: x\n"), "{received}");
        assert!(!received.contains("myhost"));
    }

    #[test]
    fn dial_failure_is_counted_and_retried() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let handler = SyslogHandler::new(&identity())
            .with_transport(SyslogTransport::Tcp(format!("127.0.0.1:{port}")));
        handler.open();
        assert!(handler.is_opened());
        let after_open = handler.stats().errors;
        assert!(after_open >= 1);

        handler.write("app", &LogEvent::builder(Level::Error, "m").build(), "lost");
        assert!(handler.stats().errors > after_open);
        assert_eq!(handler.stats().writes, 0);

        handler.close();
        assert!(!handler.is_opened());
    }
}
