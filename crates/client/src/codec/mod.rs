//! Wire codecs for the client side of an HTTP/1.x exchange.
//!
//! [`RequestEncoder`] writes a request head followed by its payload frames and
//! [`ResponseDecoder`] reads a response head followed by its payload frames. Both
//! work on [`Frame`](crate::payload::Frame)s over a `BytesMut` buffer, so the
//! transport only moves bytes between the socket and the buffers.
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use courier_client::codec::{RequestEncoder, RequestHead, ResponseDecoder};
//! use courier_client::payload::{Frame, PayloadItem, PayloadSize};
//! use http::{Method, Version};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let head = RequestHead {
//!     method: Method::POST,
//!     target: "/".to_string(),
//!     version: Version::HTTP_11,
//!     headers: vec!["Host: localhost".to_string()],
//! };
//!
//! let mut out = BytesMut::new();
//! let mut encoder = RequestEncoder::new();
//! encoder.encode(Frame::<_, Bytes>::Head((head, PayloadSize::Length(2))), &mut out).unwrap();
//! encoder.encode(Frame::Payload(PayloadItem::Chunk(Bytes::from_static(b"hi"))), &mut out).unwrap();
//! assert!(out.ends_with(b"\r\n\r\nhi"));
//!
//! let mut input = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok"[..]);
//! let mut decoder = ResponseDecoder::new(false);
//! assert!(matches!(decoder.decode(&mut input).unwrap(), Some(Frame::Head(_))));
//! ```

use std::io::{self, Write};

use bytes::{BufMut, BytesMut};

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use body::{PayloadDecoder, PayloadEncoder};
pub use header::{HeadDecoder, HeadEncoder, RequestHead, ResponseHead};
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;

/// Writer over a `BytesMut` the caller already reserved space in.
pub(crate) struct FastWrite<'a>(pub &'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
