use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::error::CodecError;
use crate::payload::PayloadItem;

/// Writes an upload of declared size, refusing to exceed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    #[cfg(test)]
    fn is_finish(&self) -> bool {
        self.remaining == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                let len = bytes.remaining() as u64;
                if len > self.remaining {
                    warn!(len, remaining = self.remaining, "body exceeds its declared length");
                    return Err(CodecError::invalid_body(format!("{len} bytes exceed the remaining declared length {}", self.remaining)));
                }

                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let n = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(n);
                }
                self.remaining -= len;
                Ok(())
            }
            PayloadItem::Eof if self.remaining > 0 => {
                Err(CodecError::invalid_body(format!("body ended with {} declared bytes missing", self.remaining)))
            }
            PayloadItem::Eof => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn writes_declared_length() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"abc")), &mut dst).unwrap();
        assert!(!encoder.is_finish());
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"de")), &mut dst).unwrap();
        assert!(encoder.is_finish());
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"abcde");
    }

    #[test]
    fn rejects_mismatched_length() {
        let mut dst = BytesMut::new();
        assert!(LengthEncoder::new(2).encode(PayloadItem::Chunk(Bytes::from_static(b"abc")), &mut dst).is_err());
        assert!(LengthEncoder::new(2).encode(PayloadItem::<Bytes>::Eof, &mut dst).is_err());
    }
}
