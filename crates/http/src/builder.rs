//! Reconstruction of a [`Response`] from raw status and header lines.
//!
//! ```
//! use courier_http::ResponseBuilder;
//!
//! let mut builder = ResponseBuilder::new();
//! builder.set_headers_from_str("HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\n").unwrap();
//!
//! let response = builder.into_response();
//! assert_eq!(response.status(), 404);
//! assert_eq!(response.header_line("content-type"), "text/plain");
//! ```

use tracing::trace;

use crate::protocol::{ParseError, Response};

#[derive(Debug)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self { response: Response::new() }
    }

    /// The response built so far.
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    /// Applies a status line such as `HTTP/1.1 200 OK`.
    ///
    /// The line is split on spaces into at most three tokens. The first must start with
    /// `http/` (any case) and the second must be a status code in `100..=599`; the third,
    /// if present, becomes the reason phrase. The text after `http/` becomes the protocol
    /// version.
    pub fn set_status(&mut self, line: &str) -> Result<&mut Self, ParseError> {
        let mut tokens = line.splitn(3, ' ');
        let (Some(protocol), Some(code)) = (tokens.next(), tokens.next()) else {
            return Err(ParseError::invalid_status_line(line));
        };
        let reason = tokens.next().unwrap_or_default();

        let is_http = protocol.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("http/"));
        if !is_http {
            return Err(ParseError::invalid_status_line(line));
        }
        let code: u16 = code.parse().map_err(|_| ParseError::invalid_status_line(line))?;

        self.response = self
            .response
            .with_status(code, reason)
            .map_err(|_| ParseError::invalid_status_line(line))?
            .with_protocol_version(&protocol[5..]);
        Ok(self)
    }

    /// Applies a `Name: value` header line, appending to an existing header of the
    /// same name.
    pub fn add_header(&mut self, line: &str) -> Result<&mut Self, ParseError> {
        let Some((name, value)) = line.split_once(':') else {
            return Err(ParseError::invalid_header_line(line));
        };
        let (name, value) = (name.trim(), value.trim());

        let response = if self.response.has_header(name) {
            self.response.with_added_header(name, value)
        } else {
            self.response.with_header(name, value)
        };
        self.response = response.map_err(|_| ParseError::invalid_header_line(line))?;
        Ok(self)
    }

    /// Applies a status line followed by header lines; blank lines are skipped.
    pub fn set_headers_from_lines<I, S>(&mut self, lines: I) -> Result<&mut Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = lines.into_iter();
        let status = lines.next();
        self.set_status(status.as_ref().map_or("", |line| line.as_ref()))?;

        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            self.add_header(line)?;
        }

        trace!(status = self.response.status(), headers = self.response.headers().len(), "parsed response head");
        Ok(self)
    }

    /// Splits a raw header block on CRLF (bare LF is tolerated) and applies it.
    pub fn set_headers_from_str(&mut self, block: &str) -> Result<&mut Self, ParseError> {
        self.set_headers_from_lines(block.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)))
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn set_status() {
        let mut builder = ResponseBuilder::new();
        builder.set_status("HTTP/1.1 200 OK").unwrap();

        let response = builder.response();
        assert_eq!(response.status(), 200);
        assert_eq!(response.reason_phrase(), "OK");
        assert_eq!(response.protocol_version(), "1.1");
    }

    #[test]
    fn set_status_variants() {
        let mut builder = ResponseBuilder::new();

        builder.set_status("http/1.0 503 Service Temporarily Unavailable").unwrap();
        assert_eq!(builder.response().status(), 503);
        assert_eq!(builder.response().reason_phrase(), "Service Temporarily Unavailable");
        assert_eq!(builder.response().protocol_version(), "1.0");

        builder.set_status("HTTP/2 204").unwrap();
        assert_eq!(builder.response().status(), 204);
        assert_eq!(builder.response().reason_phrase(), "");
        assert_eq!(builder.response().canonical_reason(), Some("No Content"));
        assert_eq!(builder.response().protocol_version(), "2");
    }

    #[test]
    fn invalid_status_lines() {
        let mut builder = ResponseBuilder::new();
        for line in ["BAD 200 OK", "HTTP/1.1", "", "HTTP/1.1 abc OK", "HTTP/1.1 700 Nope", "HTT 200"] {
            let err = builder.set_status(line).unwrap_err();
            assert_eq!(err, ParseError::invalid_status_line(line));
        }
        assert_eq!(builder.response().status(), 200);
    }

    #[test]
    fn add_header_appends() {
        let mut builder = ResponseBuilder::new();
        builder.add_header("X-A: 1").unwrap().add_header("x-a:2").unwrap();
        assert_eq!(builder.response().header("X-A"), ["1", "2"]);

        builder.add_header("Date: Mon, 01 Jan 2024 00:00:00 GMT").unwrap();
        assert_eq!(builder.response().header_line("date"), "Mon, 01 Jan 2024 00:00:00 GMT");
    }

    #[test]
    fn invalid_header_lines() {
        let mut builder = ResponseBuilder::new();
        for line in ["no colon here", ": value", "bad name: value"] {
            let err = builder.add_header(line).unwrap_err();
            assert_eq!(err, ParseError::invalid_header_line(line));
        }
    }

    #[test]
    fn headers_from_lines() {
        let lines = ["HTTP/1.1 201 Created", "Location: /items/7", "", "  ", "X-Id: 7"];
        let mut builder = ResponseBuilder::new();
        builder.set_headers_from_lines(lines).unwrap();

        let response = builder.into_response();
        assert_eq!(response.status(), 201);
        assert_eq!(response.header_line("location"), "/items/7");
        assert_eq!(response.header_line("x-id"), "7");
        assert_eq!(response.headers().len(), 2);
    }

    #[test]
    fn headers_from_str() {
        let block = indoc! {r##"
        HTTP/1.1 200 OK
        Content-Type: application/json
        Set-Cookie: a=1
        Set-Cookie: b=2
        Cache-Control: no-cache
        "##}
        .replace('\n', "\r\n");

        let mut builder = ResponseBuilder::new();
        builder.set_headers_from_str(&block).unwrap();

        let response = builder.into_response();
        assert_eq!(response.status(), 200);
        assert_eq!(response.header("set-cookie"), ["a=1", "b=2"]);
        let names: Vec<_> = response.headers().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Content-Type", "Set-Cookie", "Cache-Control"]);
    }

    #[test]
    fn headers_from_str_tolerates_bare_lf() {
        let mut builder = ResponseBuilder::new();
        builder.set_headers_from_str("HTTP/1.1 302 Found\nLocation: /next").unwrap();
        assert_eq!(builder.response().status(), 302);
        assert_eq!(builder.response().header_line("Location"), "/next");
    }

    #[test]
    fn empty_block_fails() {
        let mut builder = ResponseBuilder::new();
        assert!(builder.set_headers_from_str("").is_err());
        assert!(builder.set_headers_from_lines(Vec::<String>::new()).is_err());
    }
}
