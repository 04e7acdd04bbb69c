//! Blocking HTTP transport client for the `courier-http` message model
//!
//! [`TransportClient`] turns an immutable [`Request`](courier_http::Request) into a
//! typed [`TransportOptions`] set, hands it to a [`Transport`] for exactly one
//! transfer and rebuilds a [`Response`](courier_http::Response) from the raw status
//! line, header block and body bytes the transport returns.
//!
//! # Example
//!
//! ```no_run
//! use courier_client::{Client, TransportClient};
//! use courier_http::{Request, Uri};
//! use http::Method;
//! use std::time::Duration;
//!
//! let mut client = TransportClient::builder()
//!     .follow_redirects(true)
//!     .timeout(Duration::from_secs(10))
//!     .build();
//!
//! let request = Request::new(Method::GET, Uri::parse("http://example.com/").unwrap());
//! let response = client.send(&request).unwrap();
//! println!("{} {}", response.status(), response.body().to_string_lossy());
//! ```
//!
//! # Architecture
//!
//! - [`client`]: the request to option set to response state machine
//! - [`options`]: [`ClientConfig`] and the per-transfer [`TransportOptions`]
//! - [`transport`]: the [`Transport`] seam and the built-in [`Http1Transport`]
//! - [`codec`]: HTTP/1.x wire codecs used by [`Http1Transport`]
//! - [`error`]: [`ClientError`] and the classified [`TransportError`]
//!
//! # Features
//!
//! - `tls`: `https` urls through `native-tls`

pub mod client;
pub mod codec;
pub mod error;
pub mod options;
pub mod payload;
pub mod transport;

pub use client::{Client, ClientBuilder, TransportClient};
pub use error::{ClientError, TransportError, TransportErrorKind};
pub use options::{ClientConfig, HttpVersion, Method, ReadCallback, RequestBody, TransportOptions};
pub use transport::{Http1Transport, RawResponse, Transport};

mod utils;
pub(crate) use utils::ensure;
