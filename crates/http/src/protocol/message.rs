use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::protocol::body::Body;
use crate::protocol::header::{self, Headers, IntoHeaderValues};
use crate::protocol::InvalidHeaderValue;

pub(crate) const DEFAULT_VERSION: &str = "1.1";

#[derive(Clone)]
struct Parts<H> {
    head: H,
    headers: Headers,
    version: String,
    body: OnceLock<Body>,
}

/// An immutable HTTP message: a head `H`, headers, a protocol version and a body.
///
/// Every `with_*` method returns a new message and leaves `self` untouched. When the
/// requested change is already in effect the returned message shares the original
/// allocation, see [`Message::ptr_eq`]. The body is shared between a message and the
/// messages derived from it.
pub struct Message<H> {
    inner: Arc<Parts<H>>,
}

impl<H: Clone> Clone for Message<H> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<H: Clone> Message<H> {
    pub(crate) fn from_head(head: H, headers: Headers, version: String, body: Option<Body>) -> Self {
        let body = body.map(OnceLock::from).unwrap_or_default();
        Self { inner: Arc::new(Parts { head, headers, version, body }) }
    }

    /// Returns true when both messages share the same underlying allocation.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    /// The protocol version without the `HTTP/` prefix, `"1.1"` unless set otherwise.
    pub fn protocol_version(&self) -> &str {
        &self.inner.version
    }

    pub fn with_protocol_version(&self, version: &str) -> Self {
        if self.inner.version == version {
            return self.clone();
        }
        self.update(|parts| parts.version = version.to_string())
    }

    pub fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.inner.headers.contains(name)
    }

    /// Values of `name`, empty when absent.
    pub fn header(&self, name: &str) -> &[String] {
        self.inner.headers.get(name)
    }

    /// Values of `name` joined by `", "`, empty when absent.
    pub fn header_line(&self, name: &str) -> String {
        self.inner.headers.line(name)
    }

    /// Replaces the header `name` case-insensitively.
    ///
    /// # Errors
    ///
    /// Fails when the name is not a valid token or the value is rejected by
    /// [`IntoHeaderValues`].
    pub fn with_header<V: IntoHeaderValues>(&self, name: &str, value: V) -> Result<Self, InvalidHeaderValue> {
        header::validate_name(name)?;
        let values = value.into_header_values()?;
        Ok(self.update_headers(|headers| headers.set(name, values)))
    }

    /// Merges values into the header `name`, dropping duplicates.
    pub fn with_added_header<V: IntoHeaderValues>(&self, name: &str, value: V) -> Result<Self, InvalidHeaderValue> {
        header::validate_name(name)?;
        let values = value.into_header_values()?;
        Ok(self.update_headers(|headers| headers.append(name, values)))
    }

    pub fn without_header(&self, name: &str) -> Self {
        if !self.has_header(name) {
            return self.clone();
        }
        self.update(|parts| {
            parts.headers.remove(name);
        })
    }

    /// The message body, an empty stream unless one was set.
    pub fn body(&self) -> Body {
        self.inner.body.get_or_init(Body::empty).clone()
    }

    pub fn with_body(&self, body: Body) -> Self {
        if self.inner.body.get().is_some_and(|current| Body::ptr_eq(current, &body)) {
            return self.clone();
        }
        self.update(|parts| parts.body = OnceLock::from(body))
    }

    pub(crate) fn head(&self) -> &H {
        &self.inner.head
    }

    fn update<F: FnOnce(&mut Parts<H>)>(&self, f: F) -> Self {
        let mut inner = Arc::clone(&self.inner);
        f(Arc::make_mut(&mut inner));
        Self { inner }
    }

    pub(crate) fn update_head<F: FnOnce(&mut H, &mut Headers)>(&self, f: F) -> Self {
        self.update(|parts| f(&mut parts.head, &mut parts.headers))
    }

    fn update_headers<F: FnOnce(&mut Headers)>(&self, f: F) -> Self {
        let mut headers = self.inner.headers.clone();
        f(&mut headers);
        if headers == self.inner.headers {
            return self.clone();
        }
        self.update(|parts| parts.headers = headers)
    }
}

impl<H: fmt::Debug> fmt::Debug for Message<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("head", &self.inner.head)
            .field("version", &self.inner.version)
            .field("headers", &self.inner.headers)
            .finish_non_exhaustive()
    }
}
