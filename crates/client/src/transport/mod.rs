//! The seam between [`TransportClient`](crate::TransportClient) and the wire.
//!
//! A [`Transport`] performs exactly one transfer per [`Transport::perform`] call and
//! returns the raw response bytes. [`Http1Transport`] is the built-in blocking
//! HTTP/1.x implementation.

use bytes::Bytes;

use crate::error::TransportError;
use crate::options::TransportOptions;

mod conn;
mod http1;

pub use http1::Http1Transport;

/// Raw output of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// The response head, when requested, followed by the decoded body
    pub data: Bytes,
    /// Number of leading bytes of `data` that belong to the head
    pub header_size: usize,
    pub status: u16,
}

impl RawResponse {
    /// Splits `data` at `header_size`.
    ///
    /// A `header_size` beyond the data is clamped to its length.
    pub fn split(&self) -> (Bytes, Bytes) {
        let at = self.header_size.min(self.data.len());
        (self.data.slice(..at), self.data.slice(at..))
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn supports_http2(&self) -> bool;

    /// Clears per-transfer state so the handle can be reused.
    fn reset(&mut self);

    fn perform(&mut self, options: TransportOptions) -> Result<RawResponse, TransportError>;
}
