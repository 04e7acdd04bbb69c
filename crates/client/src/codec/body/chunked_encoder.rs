use std::io::Write;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::FastWrite;
use crate::error::CodecError;
use crate::payload::PayloadItem;

/// Frames an upload of unknown size with chunked transfer encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            // an empty chunk would read as the terminator
            PayloadItem::Chunk(bytes) if !bytes.has_remaining() => Ok(()),
            PayloadItem::Chunk(mut bytes) => {
                write!(FastWrite(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(len);
                }
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}
