//! Immutable HTTP message model
//!
//! This crate provides the value types an HTTP client exchanges with its transport:
//! a normalized [`Uri`], request and response [`Message`]s that are never mutated in
//! place, and the byte [`Stream`] carrying message bodies.
//!
//! # Example
//!
//! ```
//! use courier_http::{Body, Request, Uri};
//! use http::Method;
//!
//! let uri = Uri::parse("https://api.example.com/items?page=2").unwrap();
//! let request = Request::new(Method::POST, uri)
//!     .with_header("Content-Type", "application/json")
//!     .unwrap()
//!     .with_body(Body::from_bytes(r#"{"name":"anvil"}"#).unwrap());
//!
//! assert_eq!(request.request_target(), "/items?page=2");
//! assert_eq!(request.header_line("host"), "api.example.com");
//!
//! // the original is left untouched
//! let get = request.with_method(Method::GET);
//! assert_eq!(request.method(), Method::POST);
//! assert_eq!(get.method(), Method::GET);
//! ```
//!
//! # Architecture
//!
//! - [`uri`]: parsing, rendering and replacing uri components
//! - [`stream`]: byte streams over memory, files, pipes and sinks
//! - [`protocol`]: headers, messages, requests, responses and errors
//! - [`builder`]: rebuilding a [`Response`] from a raw header block
//!
//! # Immutability
//!
//! Messages and uris share their data behind an `Arc`. Every `with_*` method returns
//! a new value; when the change is already in effect the original allocation is
//! returned instead, observable through `ptr_eq`. Bodies are the exception: a
//! [`Body`] is a shared handle, so messages derived from each other read and write
//! the same stream.

pub mod builder;
pub mod protocol;
pub mod stream;
pub mod uri;

pub use builder::ResponseBuilder;
pub use protocol::{Body, HttpError, Message, Request, RequestBuilder, Response};
pub use stream::{OpenMode, Stream};
pub use uri::Uri;

mod utils;
pub(crate) use utils::ensure;
