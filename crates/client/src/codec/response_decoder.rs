//! Streaming decoder for one HTTP/1.x response.
//!
//! The decoder first yields the response head, then payload chunks and finally
//! [`PayloadItem::Eof`]. Interim `1xx` responses come out as a head followed
//! directly by `Eof`, after which the decoder waits for the next head.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{HeadDecoder, ResponseHead};
use crate::error::CodecError;
use crate::payload::{Frame, PayloadItem, PayloadSize};

/// Decodes a response head and its payload.
///
/// The `payload_decoder` field tracks the state:
/// - `None`: waiting for a response head
/// - `Some(_)`: reading the payload of the last head
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    head_decoder: HeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    /// Creates a decoder for the response to a request; `head_request` marks
    /// responses that never carry a body.
    pub fn new(head_request: bool) -> Self {
        Self { head_decoder: HeadDecoder::new(head_request), payload_decoder: None }
    }

    fn payload(&mut self, item: Option<PayloadItem>) -> Option<Frame<(ResponseHead, PayloadSize)>> {
        match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Frame::Payload(item)),
            Some(item @ PayloadItem::Eof) => {
                self.payload_decoder.take();
                Some(Frame::Payload(item))
            }
            None => None,
        }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Frame<(ResponseHead, PayloadSize)>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.payload(item));
        }

        let frame = match self.head_decoder.decode(src)? {
            Some((head, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Frame::Head((head, payload_size)))
            }
            None => None,
        };
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode_eof(src)?;
            return Ok(self.payload(item));
        }

        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::invalid_head("connection closed inside the response head")),
        }
    }
}
