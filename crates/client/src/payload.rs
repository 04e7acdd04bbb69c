use bytes::{Buf, Bytes};

/// One unit flowing through the wire codecs: a message head or a piece of its payload.
#[derive(Debug)]
pub enum Frame<T, Data: Buf = Bytes> {
    Head(T),
    Payload(PayloadItem<Data>),
}

/// A chunk of payload data, or the end of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    Eof,
}

/// How a payload is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length` bytes
    Length(u64),
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// Everything until the peer closes the connection
    UntilClose,
    /// No payload at all
    Empty,
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }
}

#[cfg(test)]
impl PayloadItem {
    pub(crate) fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub(crate) fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
