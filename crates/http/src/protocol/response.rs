use http::StatusCode;

use crate::ensure;
use crate::protocol::ParseError;
use crate::protocol::header::Headers;
use crate::protocol::message::{DEFAULT_VERSION, Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: u16,
    reason: String,
}

/// A received HTTP response.
///
/// Responses are only produced by [`ResponseBuilder`](crate::ResponseBuilder), they start
/// as `200 OK` with no headers and an empty body.
pub type Response = Message<ResponseHead>;

impl Message<ResponseHead> {
    pub(crate) fn new() -> Self {
        let head = ResponseHead { status: 200, reason: "OK".to_string() };
        Message::from_head(head, Headers::new(), DEFAULT_VERSION.to_string(), None)
    }

    pub fn status(&self) -> u16 {
        self.head().status
    }

    pub fn reason_phrase(&self) -> &str {
        &self.head().reason
    }

    /// The registered phrase for the status code, independent of what the server sent.
    pub fn canonical_reason(&self) -> Option<&'static str> {
        StatusCode::from_u16(self.status()).ok().and_then(|s| s.canonical_reason())
    }

    /// Sets the status code and reason phrase; `reason` is stored as given, even when empty.
    ///
    /// # Errors
    ///
    /// Fails with [`ParseError::InvalidStatusCode`] when `code` is outside `100..=599`.
    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self, ParseError> {
        ensure!((100..=599).contains(&code), ParseError::invalid_status_code(code));

        let head = self.head();
        if head.status == code && head.reason == reason {
            return Ok(self.clone());
        }
        Ok(self.update_head(|head, _| {
            head.status = code;
            head.reason = reason.to_string();
        }))
    }
}
