use std::convert::Infallible;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("uri error: {source}")]
    UriError {
        #[from]
        source: UriParseError,
    },

    #[error("header error: {source}")]
    HeaderError {
        #[from]
        source: InvalidHeaderValue,
    },

    #[error("stream error: {source}")]
    StreamError {
        #[from]
        source: StreamError,
    },

    #[error("response error: {source}")]
    ParseError {
        #[from]
        source: ParseError,
    },
}

impl From<Infallible> for HttpError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid uri `{uri}`: {reason}")]
pub struct UriParseError {
    uri: String,
    reason: String,
}

impl UriParseError {
    pub fn new<U: ToString, R: ToString>(uri: U, reason: R) -> Self {
        Self { uri: uri.to_string(), reason: reason.to_string() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid header value: {reason}")]
pub struct InvalidHeaderValue {
    reason: String,
}

impl InvalidHeaderValue {
    pub fn new<S: ToString>(reason: S) -> Self {
        Self { reason: reason.to_string() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("invalid stream state: {reason}")]
    State { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StreamError {
    pub fn state<S: ToString>(str: S) -> Self {
        Self::State { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn is_state(&self) -> bool {
        matches!(self, StreamError::State { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("`{line}` is not a valid http status line")]
    InvalidStatusLine { line: String },

    #[error("`{line}` is not a valid http header line")]
    InvalidHeaderLine { line: String },

    #[error("`{code}` is not a valid http status code, must be within 100..=599")]
    InvalidStatusCode { code: u16 },
}

impl ParseError {
    pub fn invalid_status_line<S: ToString>(line: S) -> Self {
        Self::InvalidStatusLine { line: line.to_string() }
    }

    pub fn invalid_header_line<S: ToString>(line: S) -> Self {
        Self::InvalidHeaderLine { line: line.to_string() }
    }

    pub fn invalid_status_code(code: u16) -> Self {
        Self::InvalidStatusCode { code }
    }
}
