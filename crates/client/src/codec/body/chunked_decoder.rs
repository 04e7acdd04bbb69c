//! Decoder for `Transfer-Encoding: chunked` response bodies,
//! see [RFC 9112 section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).

use std::task::Poll;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::error::CodecError;
use crate::payload::PayloadItem;

use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    Size,
    SizeLws,
    Extension,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked body");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut chunk = None;
            self.state = match self.state.step(src, &mut self.remaining, &mut chunk) {
                Poll::Pending => return Ok(None),
                Poll::Ready(result) => result?,
            };

            if let Some(bytes) = chunk {
                trace!(len = bytes.len(), "read chunk");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! next_byte {
    ($src:ident) => {{
        if $src.is_empty() {
            return Poll::Pending;
        }
        $src.get_u8()
    }};
}

fn invalid<T>(reason: &str) -> Poll<Result<T, CodecError>> {
    Poll::Ready(Err(CodecError::invalid_body(format!("malformed chunked body: {reason}"))))
}

impl ChunkedState {
    fn step(self, src: &mut BytesMut, remaining: &mut u64, chunk: &mut Option<Bytes>) -> Poll<Result<ChunkedState, CodecError>> {
        match self {
            Size => Self::read_size(src, remaining),
            SizeLws => Self::read_size_lws(src),
            Extension => Self::read_extension(src),
            SizeLf => Self::read_size_lf(src, *remaining),
            Body => Self::read_body(src, remaining, chunk),
            BodyCr => Self::expect(src, b'\r', BodyLf, "missing CR after chunk data"),
            BodyLf => Self::expect(src, b'\n', Size, "missing LF after chunk data"),
            Trailer => Self::read_trailer(src),
            TrailerLf => Self::expect(src, b'\n', EndCr, "missing LF after trailer field"),
            EndCr => Self::read_end_cr(src),
            EndLf => Self::expect(src, b'\n', End, "missing final LF"),
            End => Poll::Ready(Ok(End)),
        }
    }

    fn read_size(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, CodecError>> {
        let digit = match next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            _ => return invalid("invalid chunk size"),
        };

        match size.checked_mul(16).and_then(|s| s.checked_add(u64::from(digit))) {
            Some(next) => {
                *size = next;
                Poll::Ready(Ok(Size))
            }
            None => invalid("chunk size overflow"),
        }
    }

    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, CodecError>> {
        match next_byte!(src) {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => invalid("invalid whitespace after chunk size"),
        }
    }

    // extensions are skipped up to CRLF, a bare LF is rejected
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, CodecError>> {
        match next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => invalid("chunk extension contains newline"),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, size: u64) -> Poll<Result<ChunkedState, CodecError>> {
        match next_byte!(src) {
            b'\n' if size == 0 => Poll::Ready(Ok(EndCr)),
            b'\n' => Poll::Ready(Ok(Body)),
            _ => invalid("missing LF after chunk size"),
        }
    }

    fn read_body(src: &mut BytesMut, remaining: &mut u64, chunk: &mut Option<Bytes>) -> Poll<Result<ChunkedState, CodecError>> {
        if *remaining == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        let available = usize::try_from(*remaining).unwrap_or(usize::MAX).min(src.len());
        *remaining -= available as u64;
        *chunk = Some(src.split_to(available).freeze());

        if *remaining > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_trailer(src: &mut BytesMut) -> Poll<Result<ChunkedState, CodecError>> {
        match next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_end_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, CodecError>> {
        match next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn expect(src: &mut BytesMut, byte: u8, next: ChunkedState, reason: &str) -> Poll<Result<ChunkedState, CodecError>> {
        if next_byte!(src) == byte { Poll::Ready(Ok(next)) } else { invalid(reason) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut buffer = BytesMut::from(input);
        let mut decoder = ChunkedDecoder::new();
        let mut body = Vec::new();
        loop {
            match decoder.decode(&mut buffer)? {
                Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => return Ok(body),
                None => panic!("decoder needs more data"),
            }
        }
    }

    #[test]
    fn single_chunk() {
        assert_eq!(decode_all(b"10\r\n1234567890abcdef\r\n0\r\n\r\n").unwrap(), b"1234567890abcdef");
    }

    #[test]
    fn multiple_chunks() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hello"));

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b", world"));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn extensions_and_trailers() {
        assert_eq!(decode_all(b"5;name=value\r\nhello\r\n0\r\n\r\n").unwrap(), b"hello");
        assert_eq!(decode_all(b"5\r\nhello\r\n0\r\nExpires: never\r\n\r\n").unwrap(), b"hello");
        assert_eq!(decode_all(b"5  \r\nhello\r\n0\r\n\r\n").unwrap(), b"hello");
    }

    #[test]
    fn partial_input() {
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo\r\n0\r\n");
        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"lo"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn malformed_input() {
        assert!(decode_all(b"xyz\r\n").is_err());
        assert!(decode_all(b"5\r\nhelloBad").is_err());
        assert!(decode_all(b"5;ext\nhello\r\n").is_err());
        assert!(decode_all(b"fffffffffffffffff\r\n").is_err());
    }

    #[test]
    fn large_chunk() {
        let size = 1024 * 1024;
        let mut data = format!("{size:x}\r\n").into_bytes();
        data.extend(vec![b'A'; size]);
        data.extend_from_slice(b"\r\n0\r\n\r\n");

        let body = decode_all(&data).unwrap();
        assert_eq!(body.len(), size);
        assert!(body.iter().all(|&b| b == b'A'));
    }
}
