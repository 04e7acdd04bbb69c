//! Response head decoding with `httparse`.
//!
//! The decoder parses the status line and header fields, keeps the raw head bytes
//! for the caller and decides how the following body is delimited, following
//! [RFC 9112 section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3):
//!
//! 1. responses to `HEAD`, `1xx`, `204` and `304` have no body
//! 2. a `Transfer-Encoding` ending in `chunked` means a chunked body, any other
//!    transfer coding means the body runs until the connection closes
//! 3. otherwise `Content-Length` gives the body size
//! 4. without either header the body runs until the connection closes

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::error::CodecError;
use crate::payload::PayloadSize;

const MAX_HEADER_NUM: usize = 100;

const MAX_HEADER_BYTES: usize = 64 * 1024;

/// A parsed response head together with its raw bytes.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// Status line and header fields up to and including the empty line
    pub raw: Bytes,
}

impl ResponseHead {
    /// Returns true for `1xx` responses that precede the final one.
    pub fn is_interim(&self) -> bool {
        self.status.is_informational() && self.status != StatusCode::SWITCHING_PROTOCOLS
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadDecoder {
    head_request: bool,
}

impl HeadDecoder {
    /// Creates a decoder; responses to `HEAD` requests never carry a body.
    pub fn new(head_request: bool) -> Self {
        Self { head_request }
    }
}

impl Decoder for HeadDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let status = res.parse(&src[..]).map_err(|e| match e {
            httparse::Error::TooManyHeaders => CodecError::too_many_headers(MAX_HEADER_NUM),
            e => CodecError::invalid_head(e),
        })?;

        let head_size = match status {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, CodecError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };
        trace!(head_size, "parsed response head");
        ensure!(head_size <= MAX_HEADER_BYTES, CodecError::too_large_header(head_size, MAX_HEADER_BYTES));

        let version = match res.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(CodecError::InvalidVersion(v)),
        };

        let code = res.code.ok_or_else(|| CodecError::invalid_head("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(CodecError::invalid_head)?;

        let mut header_map = HeaderMap::with_capacity(res.headers.len());
        for header in res.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(CodecError::invalid_head)?;
            let value = HeaderValue::from_bytes(header.value).map_err(CodecError::invalid_head)?;
            header_map.append(name, value);
        }

        let payload_size = payload_size(self.head_request, status, &header_map)?;
        let raw = src.split_to(head_size).freeze();

        Ok(Some((ResponseHead { status, version, headers: header_map, raw }, payload_size)))
    }
}

fn payload_size(head_request: bool, status: StatusCode, headers: &HeaderMap) -> Result<PayloadSize, CodecError> {
    if head_request
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return Ok(PayloadSize::Empty);
    }

    if let Some(te) = headers.get(TRANSFER_ENCODING) {
        return Ok(if is_chunked(te) { PayloadSize::Chunked } else { PayloadSize::UntilClose });
    }

    let mut lengths = headers.get_all(CONTENT_LENGTH).iter();
    let Some(first) = lengths.next() else {
        return Ok(PayloadSize::UntilClose);
    };

    let length = parse_length(first)?;
    for other in lengths {
        ensure!(parse_length(other)? == length, CodecError::invalid_content_length("conflicting values"));
    }
    Ok(if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) })
}

fn parse_length(value: &HeaderValue) -> Result<u64, CodecError> {
    let text = value.to_str().map_err(|_| CodecError::invalid_content_length("value is not visible ascii"))?;
    text.trim().parse::<u64>().map_err(|_| CodecError::invalid_content_length(format!("value {text} is not u64")))
}

fn is_chunked(value: &HeaderValue) -> bool {
    value.as_bytes().rsplit(|b| *b == b',').next().is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}
