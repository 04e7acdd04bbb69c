use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::close_decoder::CloseDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::error::CodecError;
use crate::payload::{PayloadItem, PayloadSize};

/// Picks the body decoding strategy from a [`PayloadSize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    UntilClose(CloseDecoder),
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose(CloseDecoder::default()) }
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(size: PayloadSize) -> Self {
        match size {
            PayloadSize::Length(n) => Self::fix_length(n),
            PayloadSize::Chunked => Self::chunked(),
            PayloadSize::UntilClose => Self::until_close(),
            PayloadSize::Empty => Self::empty(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
            Kind::UntilClose(decoder) => decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode_eof(src),
            Kind::Chunked(decoder) => match decoder.decode(src)? {
                None => Err(CodecError::invalid_body("connection closed before the last chunk")),
                item => Ok(item),
            },
            Kind::UntilClose(decoder) => decoder.decode_eof(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}
