//! Outgoing HTTP requests.
//!
//! A [`Request`] is a [`Message`] whose head carries the method, the target [`Uri`] and
//! an optional request-target override. The `Host` header follows the uri: it is
//! derived on construction unless the caller supplied one, and recomputed whenever the
//! uri is replaced unless the caller asks to preserve it. A derived `Host` is always the
//! first header.

use http::Method;

use crate::Uri;
use crate::protocol::body::Body;
use crate::protocol::header::{self, Headers, IntoHeaderValues};
use crate::protocol::message::{DEFAULT_VERSION, Message};
use crate::protocol::HttpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    request_target: Option<String>,
}

pub type Request = Message<RequestHead>;

impl Message<RequestHead> {
    /// Creates a request without headers and with an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self::from_parts(method, uri, Headers::new(), DEFAULT_VERSION.to_string(), None)
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    fn from_parts(method: Method, uri: Uri, mut headers: Headers, version: String, body: Option<Body>) -> Self {
        if !headers.contains("host") {
            update_host(&mut headers, &uri);
        }
        let head = RequestHead { method, uri, request_target: None };
        Message::from_head(head, headers, version, body)
    }

    pub fn method(&self) -> &Method {
        &self.head().method
    }

    pub fn uri(&self) -> &Uri {
        &self.head().uri
    }

    /// The path-and-query sent on the request line.
    ///
    /// An explicit override wins. Otherwise it is the uri path, `/` when the path is
    /// empty, followed by `?query` when the query is not empty.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.head().request_target {
            return target.clone();
        }

        let uri = self.uri();
        let mut target = if uri.path().is_empty() { "/".to_string() } else { uri.path().to_string() };
        if !uri.query().is_empty() {
            target.push('?');
            target.push_str(uri.query());
        }
        target
    }

    pub fn with_method(&self, method: Method) -> Self {
        if self.head().method == method {
            return self.clone();
        }
        self.update_head(|head, _| head.method = method)
    }

    pub fn with_request_target(&self, target: &str) -> Self {
        if self.head().request_target.as_deref() == Some(target) {
            return self.clone();
        }
        self.update_head(|head, _| head.request_target = Some(target.to_string()))
    }

    /// Replaces the target uri.
    ///
    /// The `Host` header is recomputed from the new uri unless `preserve_host` is set
    /// and a `Host` header is already present.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        if self.head().uri == uri {
            return self.clone();
        }

        let keep_host = preserve_host && self.has_header("host");
        self.update_head(|head, headers| {
            if !keep_host {
                update_host(headers, &uri);
            }
            head.uri = uri;
        })
    }
}

fn update_host(headers: &mut Headers, uri: &Uri) {
    let host = uri.host();
    if host.is_empty() {
        return;
    }

    let value = match uri.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    headers.set_first("Host", value);
}

/// Builder for [`Request`], errors are collected and reported by [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    inner: Result<Draft, HttpError>,
}

#[derive(Debug)]
struct Draft {
    method: Method,
    uri: Uri,
    headers: Headers,
    version: String,
    body: Option<Body>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        let draft =
            Draft { method: Method::GET, uri: Uri::default(), headers: Headers::new(), version: DEFAULT_VERSION.to_string(), body: None };
        Self { inner: Ok(draft) }
    }

    pub fn method(self, method: Method) -> Self {
        self.and_then(|draft| {
            draft.method = method;
            Ok(())
        })
    }

    /// Accepts a parsed [`Uri`] or anything parsed into one, such as `&str` or `String`.
    pub fn uri<T>(self, uri: T) -> Self
    where
        T: TryInto<Uri>,
        T::Error: Into<HttpError>,
    {
        self.and_then(|draft| {
            draft.uri = uri.try_into().map_err(Into::into)?;
            Ok(())
        })
    }

    /// Adds values to `name`, merging with earlier values of the same header.
    pub fn header<V: IntoHeaderValues>(self, name: &str, value: V) -> Self {
        self.and_then(|draft| {
            header::validate_name(name)?;
            draft.headers.append(name, value.into_header_values()?);
            Ok(())
        })
    }

    pub fn version(self, version: &str) -> Self {
        self.and_then(|draft| {
            draft.version = version.to_string();
            Ok(())
        })
    }

    pub fn body<B: Into<Body>>(self, body: B) -> Self {
        self.and_then(|draft| {
            draft.body = Some(body.into());
            Ok(())
        })
    }

    pub fn build(self) -> Result<Request, HttpError> {
        let Draft { method, uri, headers, version, body } = self.inner?;
        Ok(Request::from_parts(method, uri, headers, version, body))
    }

    fn and_then<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut Draft) -> Result<(), HttpError>,
    {
        let inner = self.inner.and_then(|mut draft| f(&mut draft).map(|()| draft));
        Self { inner }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
