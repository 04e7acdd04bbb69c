use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::error::CodecError;
use crate::payload::PayloadItem;

/// Decodes a body that runs until the server closes the connection.
///
/// Only [`Decoder::decode_eof`] ever yields [`PayloadItem::Eof`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseDecoder {
    done: bool,
}

impl Decoder for CloseDecoder {
    type Item = PayloadItem;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.done || src.is_empty() {
            return Ok(None);
        }
        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        self.done = true;
        Ok(Some(PayloadItem::Eof))
    }
}
