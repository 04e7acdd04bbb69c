use std::io::{self, ErrorKind};

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::{HeadEncoder, RequestHead};
use crate::error::CodecError;
use crate::payload::{Frame, PayloadSize};

/// Encodes a request head followed by its payload frames.
#[derive(Debug)]
pub struct RequestEncoder {
    head_encoder: HeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self { head_encoder: HeadEncoder, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Frame<(RequestHead, PayloadSize), D>> for RequestEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: Frame<(RequestHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Frame::Head((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.payload_encoder = Some(payload_size.into());
                self.head_encoder.encode((head, payload_size), dst)
            }

            Frame::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect request head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let is_eof = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);
                if is_eof {
                    self.payload_encoder.take();
                }
                result
            }
        }
    }
}
