//! Blocking HTTP/1.0 and HTTP/1.1 transport over `std::net`.
//!
//! Every transfer opens a fresh connection and sends `Connection: close`, so a
//! response without framing headers simply runs until the server closes.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{Bytes, BytesMut};
use courier_http::Uri;
use http::header::LOCATION;
use http::{Method, StatusCode, Version};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

use crate::codec::{RequestEncoder, RequestHead, ResponseDecoder, ResponseHead};
use crate::error::TransportError;
use crate::options::{HttpVersion, ReadCallback, RequestBody, TransportOptions};
use crate::payload::{Frame, PayloadItem, PayloadSize};
use crate::transport::conn::{self, Conn, Endpoint};
use crate::transport::{RawResponse, Transport};

const READ_BUF_SIZE: usize = 8 * 1024;

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// The built-in transport.
///
/// Supports `http` and, with the `tls` feature, `https` urls. HTTP/2 is not
/// spoken; negotiation settles on HTTP/1.1.
#[derive(Debug, Default)]
pub struct Http1Transport {
    effective_url: Option<String>,
    redirect_count: u32,
}

impl Http1Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The url of the last hop of the previous transfer.
    pub fn effective_url(&self) -> Option<&str> {
        self.effective_url.as_deref()
    }

    /// Number of redirects the previous transfer followed.
    pub fn redirect_count(&self) -> u32 {
        self.redirect_count
    }
}

impl Transport for Http1Transport {
    fn supports_http2(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.effective_url = None;
        self.redirect_count = 0;
    }

    fn perform(&mut self, options: TransportOptions) -> Result<RawResponse, TransportError> {
        let result = self.transfer(options);
        if let Err(e) = &result {
            error!(kind = %e.kind(), cause = %e.message(), "transfer failed");
        }
        result
    }
}

/// One request sent on one connection.
struct Hop {
    uri: Uri,
    method: Method,
    headers: Vec<String>,
    body: Option<RequestBody>,
}

struct Exchange {
    head: ResponseHead,
    body: BytesMut,
}

impl Http1Transport {
    fn transfer(&mut self, options: TransportOptions) -> Result<RawResponse, TransportError> {
        let TransportOptions {
            url,
            version,
            method,
            body,
            headers,
            credentials,
            follow_redirects,
            max_redirects,
            include_headers,
            connect_timeout,
            timeout,
        } = options;

        let version = match version {
            HttpVersion::Http10 => Version::HTTP_10,
            HttpVersion::Http11 | HttpVersion::Negotiate => Version::HTTP_11,
            HttpVersion::Http2 => return Err(TransportError::protocol("HTTP/2 is not supported by this transport")),
        };
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        let uri = Uri::parse(&url).map_err(TransportError::protocol)?;
        let origin = Endpoint::from_uri(&uri)?;
        let method = method.resolve(body.is_some());
        let authorization = credentials.map(|credentials| format!("Authorization: Basic {}", STANDARD.encode(credentials)));

        let mut hop = Hop { uri, method, headers, body };
        let mut first = true;

        loop {
            let endpoint = Endpoint::from_uri(&hop.uri)?;
            let same_origin = endpoint == origin;

            let mut lines = hop.headers.clone();
            if !first || !has_header(&lines, "host") {
                remove_header(&mut lines, "host");
                lines.insert(0, format!("Host: {}", endpoint.authority()));
            }
            if let Some(authorization) = &authorization
                && same_origin
                && !has_header(&lines, "authorization")
            {
                lines.push(authorization.clone());
            }
            if !has_header(&lines, "connection") {
                lines.push("Connection: close".to_string());
            }

            self.effective_url = Some(hop.uri.to_string());
            let exchange = exchange(&endpoint, &hop, lines, version, connect_timeout, deadline)?;
            let status = exchange.head.status;

            if !follow_redirects || !is_redirect(status) {
                return Ok(finish(exchange, include_headers));
            }

            let Some(location) = exchange.head.headers.get(LOCATION).and_then(|v| v.to_str().ok()) else {
                warn!(status = status.as_u16(), "redirect without a usable Location header");
                return Ok(finish(exchange, include_headers));
            };

            let Some(next) = resolve_location(&hop.uri, location) else {
                warn!(location, "unable to parse redirect location");
                return Ok(finish(exchange, include_headers));
            };

            if self.redirect_count >= max_redirects {
                return Err(TransportError::protocol(format!("maximum ({max_redirects}) redirects followed")));
            }

            let switch_to_get = matches!(status.as_u16(), 301..=303) && hop.method != Method::GET && hop.method != Method::HEAD;
            if switch_to_get {
                hop.method = Method::GET;
                hop.body = None;
                for name in ["content-length", "content-type", "transfer-encoding"] {
                    remove_header(&mut hop.headers, name);
                }
            } else if hop.body.as_ref().is_some_and(RequestBody::is_streaming) {
                warn!(location, "streaming request body can not be replayed, stop following redirects");
                return Ok(finish(exchange, include_headers));
            }

            if Endpoint::from_uri(&next).is_ok_and(|next| next != origin) {
                remove_header(&mut hop.headers, "authorization");
            }

            self.redirect_count += 1;
            debug!(status = status.as_u16(), from = %hop.uri, to = %next, method = %hop.method, hops = self.redirect_count, "following redirect");
            hop.uri = next;
            first = false;
        }
    }
}

fn exchange(
    endpoint: &Endpoint,
    hop: &Hop,
    headers: Vec<String>,
    version: Version,
    connect_timeout: Option<Duration>,
    deadline: Option<Instant>,
) -> Result<Exchange, TransportError> {
    let mut conn = conn::connect(endpoint, connect_timeout, deadline)?;

    let mut target = if hop.uri.path().is_empty() { "/".to_string() } else { hop.uri.path().to_string() };
    if !hop.uri.query().is_empty() {
        target.push('?');
        target.push_str(hop.uri.query());
    }

    let head = RequestHead { method: hop.method.clone(), target, version, headers };
    send_request(&mut conn, head, hop.body.as_ref(), deadline)?;
    read_response(&mut conn, hop.method == Method::HEAD, deadline)
}

fn send_request(
    conn: &mut Conn,
    head: RequestHead,
    body: Option<&RequestBody>,
    deadline: Option<Instant>,
) -> Result<(), TransportError> {
    let mut encoder = RequestEncoder::new();
    let mut buf = BytesMut::new();

    let upload = match body {
        None => None,
        Some(RequestBody::Buffered(bytes)) => Some(Upload::Buffered(bytes.clone())),
        Some(RequestBody::Streaming { size: Some(size), reader }) => Some(Upload::Reader(*size, reader.clone())),
        Some(RequestBody::Streaming { size: None, reader }) => {
            let declared = head.header("content-length").and_then(|value| value.parse::<u64>().ok());
            match declared {
                Some(size) => Some(Upload::Reader(size, reader.clone())),
                // HTTP/1.0 has no chunked encoding
                None if head.version == Version::HTTP_10 => {
                    let mut data = Vec::new();
                    reader.clone().read_to_end(&mut data)?;
                    Some(Upload::Buffered(Bytes::from(data)))
                }
                None => Some(Upload::Chunked(reader.clone())),
            }
        }
    };

    let payload_size = match &upload {
        None => PayloadSize::Empty,
        Some(Upload::Buffered(bytes)) => PayloadSize::Length(bytes.len() as u64),
        Some(Upload::Reader(size, _)) => PayloadSize::Length(*size),
        Some(Upload::Chunked(_)) => PayloadSize::Chunked,
    };
    debug!(method = %head.method, target = %head.target, version = ?head.version, ?payload_size, "sending request");

    encoder.encode(Frame::<_, Bytes>::Head((head, payload_size)), &mut buf)?;

    match upload {
        None => {}
        Some(Upload::Buffered(bytes)) => encoder.encode(Frame::Payload(PayloadItem::Chunk(bytes)), &mut buf)?,
        Some(Upload::Reader(_, mut reader) | Upload::Chunked(mut reader)) => {
            let mut chunk = vec![0u8; UPLOAD_CHUNK_SIZE];
            loop {
                let n = match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                trace!(n, "pulled upload chunk");
                encoder.encode(Frame::Payload(PayloadItem::Chunk(Bytes::copy_from_slice(&chunk[..n]))), &mut buf)?;

                if buf.len() >= UPLOAD_CHUNK_SIZE {
                    conn.apply_deadline(deadline)?;
                    conn.write_all(&buf)?;
                    buf.clear();
                }
            }
        }
    }
    encoder.encode(Frame::Payload(PayloadItem::<Bytes>::Eof), &mut buf)?;

    conn.apply_deadline(deadline)?;
    conn.write_all(&buf)?;
    conn.flush()?;
    Ok(())
}

enum Upload {
    Buffered(Bytes),
    Reader(u64, ReadCallback),
    Chunked(ReadCallback),
}

fn read_response(conn: &mut Conn, head_request: bool, deadline: Option<Instant>) -> Result<Exchange, TransportError> {
    let mut decoder = ResponseDecoder::new(head_request);
    let mut buf = BytesMut::with_capacity(READ_BUF_SIZE);
    let mut chunk = [0u8; READ_BUF_SIZE];
    let mut head: Option<ResponseHead> = None;
    let mut body = BytesMut::new();
    let mut eof = false;

    loop {
        let frame = if eof { decoder.decode_eof(&mut buf)? } else { decoder.decode(&mut buf)? };

        match frame {
            Some(Frame::Head((response_head, payload_size))) => {
                trace!(status = response_head.status.as_u16(), head_size = response_head.raw.len(), ?payload_size, "received response head");
                head = Some(response_head);
            }
            Some(Frame::Payload(PayloadItem::Chunk(bytes))) => {
                trace!(len = bytes.len(), "received body chunk");
                body.extend_from_slice(&bytes);
            }
            Some(Frame::Payload(PayloadItem::Eof)) => match head.take() {
                Some(response_head) if response_head.is_interim() => {
                    debug!(status = response_head.status.as_u16(), "skipping interim response");
                }
                Some(response_head) => return Ok(Exchange { head: response_head, body }),
                None => return Err(TransportError::protocol("response body without a head")),
            },
            None if eof => return Err(TransportError::protocol("connection closed before a complete response was received")),
            None => {
                conn.apply_deadline(deadline)?;
                let n = match conn.read(&mut chunk) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                if n == 0 {
                    eof = true;
                } else {
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

fn finish(exchange: Exchange, include_headers: bool) -> RawResponse {
    let Exchange { head, body } = exchange;
    let status = head.status.as_u16();

    if !include_headers {
        return RawResponse { data: body.freeze(), header_size: 0, status };
    }

    let header_size = head.raw.len();
    let mut data = BytesMut::with_capacity(header_size + body.len());
    data.extend_from_slice(&head.raw);
    data.extend_from_slice(&body);
    RawResponse { data: data.freeze(), header_size, status }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn has_header(lines: &[String], name: &str) -> bool {
    lines.iter().any(|line| header_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name)))
}

fn remove_header(lines: &mut Vec<String>, name: &str) {
    lines.retain(|line| !header_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name)));
}

fn header_name(line: &str) -> Option<&str> {
    line.split_once(':').map(|(name, _)| name.trim())
}

/// Resolves a `Location` value against the uri of the request it answers.
fn resolve_location(base: &Uri, location: &str) -> Option<Uri> {
    let reference = Uri::parse(location.trim()).ok()?;

    if !reference.scheme().is_empty() {
        return (!reference.host().is_empty()).then_some(reference);
    }
    if !reference.host().is_empty() {
        return Some(reference.with_scheme(base.scheme()));
    }

    let path = match reference.path() {
        "" => base.path().to_string(),
        path if path.starts_with('/') => remove_dot_segments(path),
        path => {
            let dir = base.path().rsplit_once('/').map_or("", |(dir, _)| dir);
            remove_dot_segments(&format!("{dir}/{path}"))
        }
    };
    let query = if reference.path().is_empty() && reference.query().is_empty() { base.query() } else { reference.query() };

    Some(base.with_path(&path).with_query(query).with_fragment(reference.fragment()))
}

fn remove_dot_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut parts = path.split('/').skip(1).peekable();

    while let Some(segment) = parts.next() {
        let last = parts.peek().is_none();
        match segment {
            "." => {
                if last {
                    segments.push("");
                }
            }
            ".." => {
                segments.pop();
                if last {
                    segments.push("");
                }
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Uri {
        Uri::parse("http://example.com/a/b/c?x=1").unwrap()
    }

    #[test]
    fn absolute_location() {
        let next = resolve_location(&base(), "https://other.org/path").unwrap();
        assert_eq!(next.to_string(), "https://other.org/path");

        let next = resolve_location(&base(), "//cdn.example.com/img").unwrap();
        assert_eq!(next.to_string(), "http://cdn.example.com/img");
    }

    #[test]
    fn relative_location() {
        assert_eq!(resolve_location(&base(), "/root?y=2").unwrap().to_string(), "http://example.com/root?y=2");
        assert_eq!(resolve_location(&base(), "d").unwrap().to_string(), "http://example.com/a/b/d");
        assert_eq!(resolve_location(&base(), "../d").unwrap().to_string(), "http://example.com/a/d");
        assert_eq!(resolve_location(&base(), "?z=3").unwrap().to_string(), "http://example.com/a/b/c?z=3");
    }

    #[test]
    fn dot_segments() {
        assert_eq!(remove_dot_segments("/a/./b/../c"), "/a/c");
        assert_eq!(remove_dot_segments("/a/b/.."), "/a/");
        assert_eq!(remove_dot_segments("/../x"), "/x");
    }

    #[test]
    fn header_line_helpers() {
        let mut lines = vec!["Host: a".to_string(), "content-length: 3".to_string()];
        assert!(has_header(&lines, "HOST"));
        remove_header(&mut lines, "Content-Length");
        assert_eq!(lines, vec!["Host: a".to_string()]);
    }

    #[test]
    fn finish_without_headers() {
        let head = ResponseHead {
            status: StatusCode::CREATED,
            version: Version::HTTP_11,
            headers: http::HeaderMap::new(),
            raw: Bytes::from_static(b"HTTP/1.1 201 Created\r\n\r\n"),
        };
        let exchange = Exchange { head: head.clone(), body: BytesMut::from(&b"done"[..]) };
        let raw = finish(exchange, false);
        assert_eq!(raw, RawResponse { data: Bytes::from_static(b"done"), header_size: 0, status: 201 });

        let raw = finish(Exchange { head, body: BytesMut::from(&b"done"[..]) }, true);
        assert_eq!(raw.header_size, 24);
        assert!(raw.data.ends_with(b"\r\n\r\ndone"));
    }
}
