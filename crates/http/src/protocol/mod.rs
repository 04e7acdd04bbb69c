//! Immutable HTTP message model.
//!
//! - [`Message`]: generic immutable message, parameterized by its head
//! - [`Request`] / [`Response`]: the two message kinds
//! - [`Headers`]: case-insensitive, order-preserving header storage
//! - [`Body`]: shared handle to the [`Stream`](crate::stream::Stream) a message carries
//! - [`error`]: the error types of this crate

mod body;
pub use body::Body;

mod header;
pub use header::HeaderScalar;
pub use header::Headers;
pub use header::IntoHeaderValues;

mod message;
pub use message::Message;

mod request;
pub use request::Request;
pub use request::RequestBuilder;
pub use request::RequestHead;

mod response;
pub use response::Response;
pub use response::ResponseHead;

pub mod error;
pub use error::HttpError;
pub use error::InvalidHeaderValue;
pub use error::ParseError;
pub use error::StreamError;
pub use error::UriParseError;
