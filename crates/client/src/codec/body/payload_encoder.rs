use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::error::CodecError;
use crate::payload::{PayloadItem, PayloadSize};

/// Picks the body encoding strategy from a [`PayloadSize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    NoBody,
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }
}

impl From<PayloadSize> for PayloadEncoder {
    fn from(size: PayloadSize) -> Self {
        match size {
            PayloadSize::Length(n) => Self::fix_length(n),
            // a request can not be delimited by closing the connection
            PayloadSize::Chunked | PayloadSize::UntilClose => Self::chunked(),
            PayloadSize::Empty => Self::empty(),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::NoBody => Ok(()),
        }
    }
}
