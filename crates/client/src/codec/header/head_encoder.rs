use std::io::{self, ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use http::{Method, Version};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::FastWrite;
use crate::error::CodecError;
use crate::payload::PayloadSize;

const INIT_HEADER_SIZE: usize = 4 * 1024;

/// The request line and header lines of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    /// Complete `Name: value` lines without line terminators
    pub headers: Vec<String>,
}

impl RequestHead {
    /// Returns the value of the first header line named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (line_name, value) = line.split_once(':')?;
            line_name.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|line| line.split_once(':').is_none_or(|(line_name, _)| !line_name.trim().eq_ignore_ascii_case(name)));
    }
}

/// Serializes a [`RequestHead`], replacing the framing headers with the ones the
/// payload size demands.
#[derive(Debug)]
pub struct HeadEncoder;

impl Encoder<(RequestHead, PayloadSize)> for HeadEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        let version = match head.version {
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 => "HTTP/1.1",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        };

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} {version}\r\n", head.method, head.target)?;

        let framing = match payload_size {
            PayloadSize::Length(n) => Some(format!("Content-Length: {n}")),
            PayloadSize::Chunked | PayloadSize::UntilClose => Some("Transfer-Encoding: chunked".to_string()),
            PayloadSize::Empty => None,
        };
        if let Some(framing) = framing {
            head.remove_header("content-length");
            head.remove_header("transfer-encoding");
            head.headers.push(framing);
        }

        for line in &head.headers {
            dst.put_slice(line.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
