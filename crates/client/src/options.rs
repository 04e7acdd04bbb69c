//! The typed option set handed to a [`Transport`](crate::transport::Transport) for
//! one transfer, and the base configuration every transfer starts from.

use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use bytes::Bytes;
use courier_http::Body;

/// Upper bound of a single pull from a streaming request body.
pub const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Base configuration injected into a client at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Follow `3xx` responses carrying a `Location`
    pub follow_redirects: bool,
    pub max_redirects: u32,
    /// Whether the raw transport output starts with the response head
    pub include_headers: bool,
    pub connect_timeout: Option<Duration>,
    /// Limit for the whole transfer
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { follow_redirects: false, max_redirects: 10, include_headers: true, connect_timeout: None, timeout: None }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http2,
    /// Let the transport pick the version
    #[default]
    Negotiate,
}

/// The request method as the transport sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Method {
    /// The transport default: `GET`, or `POST` when a body is attached
    #[default]
    Default,
    /// `HEAD`: no response body is transferred
    NoBody,
    Custom(http::Method),
}

impl Method {
    /// Resolves the method sent on the wire.
    pub fn resolve(&self, has_body: bool) -> http::Method {
        match self {
            Method::Default if has_body => http::Method::POST,
            Method::Default => http::Method::GET,
            Method::NoBody => http::Method::HEAD,
            Method::Custom(method) => method.clone(),
        }
    }
}

/// A request body, either in memory or pulled from the request's stream during the upload.
#[derive(Debug)]
pub enum RequestBody {
    Buffered(Bytes),
    Streaming { size: Option<u64>, reader: ReadCallback },
}

impl RequestBody {
    /// The number of bytes the upload declares, when known.
    pub fn size(&self) -> Option<u64> {
        match self {
            RequestBody::Buffered(bytes) => Some(bytes.len() as u64),
            RequestBody::Streaming { size, .. } => *size,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, RequestBody::Streaming { .. })
    }
}

/// Pull-based reader over a shared request [`Body`].
///
/// Every read locks the body and pulls at most [`READ_CHUNK_SIZE`] bytes.
#[derive(Clone)]
pub struct ReadCallback {
    body: Body,
}

impl ReadCallback {
    pub fn new(body: Body) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

impl Read for ReadCallback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(READ_CHUNK_SIZE);
        let mut stream = self.body.lock();
        Read::read(&mut *stream, &mut buf[..len])
    }
}

impl fmt::Debug for ReadCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadCallback").field("body", &self.body).finish()
    }
}

/// Everything a transport needs for one request.
#[derive(Debug)]
pub struct TransportOptions {
    pub url: String,
    pub version: HttpVersion,
    pub method: Method,
    pub body: Option<RequestBody>,
    /// Complete `Name: value` header lines
    pub headers: Vec<String>,
    /// `user[:password]` for basic authentication
    pub credentials: Option<String>,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub include_headers: bool,
    pub connect_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
}

impl TransportOptions {
    /// Starts an option set for `url` from the base configuration.
    pub fn new<S: Into<String>>(config: &ClientConfig, url: S) -> Self {
        Self {
            url: url.into(),
            version: HttpVersion::default(),
            method: Method::default(),
            body: None,
            headers: Vec::new(),
            credentials: None,
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            include_headers: config.include_headers,
            connect_timeout: config.connect_timeout,
            timeout: config.timeout,
        }
    }

    /// Returns the value of the first header line named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (line_name, value) = line.split_once(':')?;
            line_name.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}
