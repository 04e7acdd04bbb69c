//! Turns a [`Request`] into [`TransportOptions`], performs the transfer and
//! rebuilds a [`Response`] from the raw bytes the transport returns.

use std::time::Duration;

use courier_http::{Request, Response, ResponseBuilder};
use http::Method as HttpMethod;
use tracing::{debug, trace};

use crate::error::ClientError;
use crate::options::{ClientConfig, HttpVersion, Method, ReadCallback, RequestBody, TransportOptions};
use crate::transport::{Http1Transport, RawResponse, Transport};

/// Bodies up to this size are handed to the transport in memory.
pub const MAX_BUFFERED_BODY: u64 = 1024 * 1024;

const CONTENT_LENGTH: &str = "content-length";

/// Sends one request and waits for its response.
pub trait Client {
    fn send(&mut self, request: &Request) -> Result<Response, ClientError>;
}

/// Configures and creates a [`TransportClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn include_headers(mut self, include: bool) -> Self {
        self.config.include_headers = include;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Builds a client on the built-in [`Http1Transport`].
    pub fn build(self) -> TransportClient<Http1Transport> {
        self.build_with(Http1Transport::new())
    }

    pub fn build_with<T: Transport>(self, transport: T) -> TransportClient<T> {
        TransportClient { transport, config: self.config }
    }
}

/// A [`Client`] executing each request as one transfer on a reusable transport handle.
///
/// `send` borrows the client mutably, so a client serves one request at a time.
#[derive(Debug)]
pub struct TransportClient<T = Http1Transport> {
    transport: T,
    config: ClientConfig,
}

impl TransportClient<Http1Transport> {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }
}

impl Default for TransportClient<Http1Transport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> TransportClient<T> {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Derives the option set for `request` without performing it.
    ///
    /// A streaming body is rewound here and read by the transport later.
    pub fn transport_options(&self, request: &Request) -> Result<TransportOptions, ClientError> {
        let mut options = TransportOptions::new(&self.config, request.uri().to_string());

        options.version = self.http_version(request.protocol_version())?;
        options.body = request_body(request)?;
        options.method = match *request.method() {
            HttpMethod::HEAD => Method::NoBody,
            HttpMethod::GET => Method::Default,
            ref other => Method::Custom(other.clone()),
        };
        options.headers = header_lines(request, options.body.as_ref());

        let user_info = request.uri().user_info();
        if !user_info.is_empty() {
            options.credentials = Some(user_info.to_string());
        }

        Ok(options)
    }

    fn http_version(&self, version: &str) -> Result<HttpVersion, ClientError> {
        let version = match version {
            "1.0" => HttpVersion::Http10,
            "1.1" => HttpVersion::Http11,
            "2.0" if self.transport.supports_http2() => HttpVersion::Http2,
            "2.0" => return Err(ClientError::unsupported_version(version)),
            _ => HttpVersion::Negotiate,
        };
        Ok(version)
    }

    fn build_response(&self, raw: &RawResponse) -> Result<Response, ClientError> {
        let (head, body) = raw.split();
        let head = head.trim_ascii();

        let response = if self.config.include_headers && !head.is_empty() {
            let mut builder = ResponseBuilder::new();
            builder.set_headers_from_str(&String::from_utf8_lossy(head))?;
            builder.into_response()
        } else {
            ResponseBuilder::new().into_response().with_status(raw.status, "")?
        };

        let body = body.trim_ascii();
        trace!(status = response.status(), body_size = body.len(), "received response");
        {
            let response_body = response.body();
            let mut stream = response_body.lock();
            stream.write(body)?;
            stream.rewind()?;
        }
        Ok(response)
    }
}

impl<T: Transport> Client for TransportClient<T> {
    fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        let options = self.transport_options(request)?;
        debug!(method = %request.method(), url = %options.url, version = ?options.version, "sending request");

        self.transport.reset();
        let raw = self.transport.perform(options)?;
        self.build_response(&raw)
    }
}

/// Picks how the request body travels: skipped, in memory, or pulled in chunks.
fn request_body(request: &Request) -> Result<Option<RequestBody>, ClientError> {
    if matches!(*request.method(), HttpMethod::GET | HttpMethod::HEAD | HttpMethod::TRACE) {
        return Ok(None);
    }

    let body = request.body();
    let mut stream = body.lock();
    let size = stream.size();
    if size == Some(0) {
        debug!("request body is empty, nothing to upload");
        return Ok(None);
    }

    if stream.is_seekable() {
        stream.rewind()?;
    }

    match size {
        Some(size) if size <= MAX_BUFFERED_BODY => {
            let bytes = stream.contents()?;
            debug!(size = bytes.len(), "buffered request body");
            Ok(Some(RequestBody::Buffered(bytes)))
        }
        size => {
            debug!(?size, "streaming request body");
            drop(stream);
            Ok(Some(RequestBody::Streaming { size, reader: ReadCallback::new(body) }))
        }
    }
}

/// Renders one `Name: value` line per header value and settles `Content-Length`.
fn header_lines(request: &Request, body: Option<&RequestBody>) -> Vec<String> {
    let headers = request.headers();
    let mut lines = Vec::with_capacity(headers.len() + 1);

    for (name, values) in headers {
        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            continue;
        }
        lines.extend(values.iter().map(|value| format!("{name}: {value}")));
    }

    let content_length = headers.canonical_name(CONTENT_LENGTH);
    match body.map(RequestBody::size) {
        Some(Some(size)) => lines.push(format!("{}: {size}", content_length.unwrap_or("Content-Length"))),
        Some(None) => {
            if let Some(name) = content_length {
                lines.extend(headers.get(name).iter().map(|value| format!("{name}: {value}")));
            }
        }
        None => {
            if let Some(name) = content_length {
                lines.push(format!("{name}: 0"));
            }
        }
    }
    lines
}
