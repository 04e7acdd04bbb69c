use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::error::CodecError;
use crate::payload::PayloadItem;

/// Decodes a body delimited by `Content-Length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = self.remaining.min(src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();
        self.remaining -= len;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            None => Err(CodecError::invalid_body(format!("connection closed with {} body bytes missing", self.remaining))),
            item => Ok(item),
        }
    }
}
