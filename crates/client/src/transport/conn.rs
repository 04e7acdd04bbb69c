use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use courier_http::Uri;
use tracing::{debug, error};

use crate::error::TransportError;

/// An established connection, plain or wrapped in TLS.
#[derive(Debug)]
pub(crate) enum Conn {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

/// Where a uri connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl Endpoint {
    pub fn from_uri(uri: &Uri) -> Result<Self, TransportError> {
        let tls = match uri.scheme() {
            "http" => false,
            "https" => true,
            "" => return Err(TransportError::protocol(format!("no scheme in url `{uri}`"))),
            other => return Err(TransportError::protocol(format!("protocol `{other}` not supported"))),
        };

        if uri.host().is_empty() {
            return Err(TransportError::resolve(format!("no host in url `{uri}`")));
        }

        let port = uri.port().unwrap_or(if tls { 443 } else { 80 });
        Ok(Self { host: uri.host().to_string(), port, tls })
    }

    /// The `Host` header value; default ports are left out.
    pub fn authority(&self) -> String {
        let default_port = if self.tls { 443 } else { 80 };
        if self.port == default_port { self.host.clone() } else { format!("{}:{}", self.host, self.port) }
    }

    /// The host without ipv6 brackets, as used for resolution and TLS.
    fn domain(&self) -> &str {
        self.host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(&self.host)
    }
}

/// Resolves and connects to `endpoint`, trying each resolved address in turn.
///
/// Each attempt is bounded by `connect_timeout` and by the time left until `deadline`.
pub(crate) fn connect(
    endpoint: &Endpoint,
    connect_timeout: Option<Duration>,
    deadline: Option<Instant>,
) -> Result<Conn, TransportError> {
    let addrs: Vec<SocketAddr> = (endpoint.domain(), endpoint.port)
        .to_socket_addrs()
        .map_err(|e| TransportError::resolve(format!("could not resolve host `{}`: {e}", endpoint.host)))?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::resolve(format!("could not resolve host `{}`", endpoint.host)));
    }

    let mut last_error = None;
    for addr in addrs {
        let result = match connect_budget(connect_timeout, deadline)? {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };

        match result {
            Ok(stream) => {
                debug!(%addr, "connected");
                stream.set_nodelay(true).map_err(TransportError::connect)?;
                return wrap(endpoint, stream);
            }
            Err(e) => {
                debug!(%addr, cause = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    let timed_out = last_error.as_ref().is_some_and(|e| e.kind() == io::ErrorKind::TimedOut);
    let cause = last_error.map_or_else(|| "no address to connect to".to_string(), |e| e.to_string());
    let message = format!("failed to connect to {} port {}: {cause}", endpoint.host, endpoint.port);
    error!(%message, "connect failed");
    Err(if timed_out { TransportError::timeout(message) } else { TransportError::connect(message) })
}

/// The shorter of `connect_timeout` and the time left until `deadline`.
fn connect_budget(connect_timeout: Option<Duration>, deadline: Option<Instant>) -> Result<Option<Duration>, TransportError> {
    let Some(deadline) = deadline else {
        return Ok(connect_timeout);
    };

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(TransportError::timeout("connection timed out"));
    }
    Ok(Some(connect_timeout.map_or(remaining, |timeout| timeout.min(remaining))))
}

#[cfg(feature = "tls")]
fn wrap(endpoint: &Endpoint, stream: TcpStream) -> Result<Conn, TransportError> {
    if !endpoint.tls {
        return Ok(Conn::Plain(stream));
    }

    let connector = native_tls::TlsConnector::new().map_err(TransportError::tls)?;
    let tls_stream = connector.connect(endpoint.domain(), stream).map_err(TransportError::tls)?;
    Ok(Conn::Tls(Box::new(tls_stream)))
}

#[cfg(not(feature = "tls"))]
fn wrap(endpoint: &Endpoint, stream: TcpStream) -> Result<Conn, TransportError> {
    if endpoint.tls {
        return Err(TransportError::tls("https requires the `tls` feature"));
    }
    Ok(Conn::Plain(stream))
}

impl Conn {
    fn tcp(&self) -> &TcpStream {
        match self {
            Conn::Plain(stream) => stream,
            #[cfg(feature = "tls")]
            Conn::Tls(stream) => stream.get_ref(),
        }
    }

    /// Applies the time left until `deadline` to socket reads and writes.
    pub fn apply_deadline(&self, deadline: Option<Instant>) -> Result<(), TransportError> {
        let Some(deadline) = deadline else {
            return Ok(());
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::timeout("operation timed out"));
        }

        let tcp = self.tcp();
        tcp.set_read_timeout(Some(remaining))?;
        tcp.set_write_timeout(Some(remaining))?;
        Ok(())
    }
}

impl Read for Conn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Conn::Plain(stream) => stream.read(buf),
            #[cfg(feature = "tls")]
            Conn::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Conn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Conn::Plain(stream) => stream.write(buf),
            #[cfg(feature = "tls")]
            Conn::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Conn::Plain(stream) => stream.flush(),
            #[cfg(feature = "tls")]
            Conn::Tls(stream) => stream.flush(),
        }
    }
}
