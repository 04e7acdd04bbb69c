//! Body framing on the wire.
//!
//! Decoders turn response bytes into [`PayloadItem`](crate::payload::PayloadItem)s for
//! `Content-Length`, chunked and close-delimited bodies. Encoders frame request
//! uploads either by declared length or with chunked transfer encoding.

mod chunked_decoder;
mod chunked_encoder;
mod close_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
