use std::fmt;
use std::io;

use courier_http::protocol::{InvalidHeaderValue, ParseError, StreamError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol version `{version}` is not supported by the transport")]
    UnsupportedProtocolVersion { version: String },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },

    #[error("response error: {source}")]
    Response {
        #[from]
        source: ParseError,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("header error: {source}")]
    Header {
        #[from]
        source: InvalidHeaderValue,
    },
}

impl ClientError {
    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedProtocolVersion { version: version.to_string() }
    }
}

/// Classification of a failed transfer.
///
/// Informational only: no kind is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Resolve,
    Connect,
    Timeout,
    Tls,
    Protocol,
    Io,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Resolve => "resolve",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// A failed transfer, carrying the transport's diagnostic verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new<S: ToString>(kind: TransportErrorKind, message: S) -> Self {
        Self { kind, message: message.to_string() }
    }

    pub fn resolve<S: ToString>(message: S) -> Self {
        Self::new(TransportErrorKind::Resolve, message)
    }

    pub fn connect<S: ToString>(message: S) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout<S: ToString>(message: S) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn tls<S: ToString>(message: S) -> Self {
        Self::new(TransportErrorKind::Tls, message)
    }

    pub fn protocol<S: ToString>(message: S) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::timeout(e),
            _ => Self::new(TransportErrorKind::Io, e),
        }
    }
}

/// Errors raised while encoding a request or decoding a response on the wire.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid response head: {reason}")]
    InvalidHead { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid content-length: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl CodecError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_head<S: ToString>(reason: S) -> Self {
        Self::InvalidHead { reason: reason.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

impl From<CodecError> for TransportError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io { source } => source.into(),
            e => Self::protocol(e),
        }
    }
}
