use std::io::{Cursor, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use courier_client::{Client, ClientError, Http1Transport, Transport, TransportClient, TransportErrorKind, TransportOptions};
use courier_http::{Body, Request, Stream, Uri};
use http::Method;
use indoc::indoc;

/// Serves `responses` in order, one connection each, and reports every raw request.
fn serve(responses: Vec<Vec<u8>>) -> (SocketAddr, Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            tx.send(request).unwrap();
            stream.write_all(&response).unwrap();
        }
    });

    (addr, rx)
}

fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        if request_len(&data).is_some_and(|len| data.len() >= len) {
            return data;
        }
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            return data;
        }
        data.extend_from_slice(&buf[..n]);
    }
}

fn request_len(data: &[u8]) -> Option<usize> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut request = httparse::Request::new(&mut headers);
    let httparse::Status::Complete(head_len) = request.parse(data).ok()? else {
        return None;
    };

    let mut content_length = 0;
    for header in request.headers.iter() {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            return data.ends_with(b"0\r\n\r\n").then_some(data.len());
        }
        if header.name.eq_ignore_ascii_case("content-length") {
            content_length = std::str::from_utf8(header.value).unwrap().trim().parse().unwrap();
        }
    }
    Some(head_len + content_length)
}

fn split_request(raw: &[u8]) -> (String, Vec<u8>) {
    let text = String::from_utf8_lossy(raw);
    let end = text.find("\r\n\r\n").unwrap() + 4;
    (text[..end].to_string(), raw[end..].to_vec())
}

fn dechunk(mut body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let line_end = body.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(std::str::from_utf8(&body[..line_end]).unwrap(), 16).unwrap();
        if size == 0 {
            return out;
        }
        let start = line_end + 2;
        out.extend_from_slice(&body[start..start + size]);
        body = &body[start + size + 2..];
    }
}

fn crlf(text: &str) -> Vec<u8> {
    text.replace('\n', "\r\n").into_bytes()
}

fn url(addr: SocketAddr, path: &str) -> Uri {
    Uri::parse(&format!("http://{addr}{path}")).unwrap()
}

#[test]
fn get_with_length_delimited_body() {
    let (addr, requests) = serve(vec![crlf(indoc! {"
        HTTP/1.1 200 OK
        Content-Length: 5
        X-Served-By: test

        hello"})]);

    let request = Request::new(Method::GET, url(addr, "/items?page=2")).with_header("Accept", "text/plain").unwrap();
    let response = TransportClient::new().send(&request).unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.reason_phrase(), "OK");
    assert_eq!(response.header_line("x-served-by"), "test");
    assert_eq!(response.body().to_string_lossy(), "hello");

    let (head, body) = split_request(&requests.recv().unwrap());
    assert!(head.starts_with("GET /items?page=2 HTTP/1.1\r\n"));
    assert!(head.contains(&format!("Host: {addr}\r\n")));
    assert!(head.contains("Accept: text/plain\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert!(body.is_empty());
}

#[test]
fn post_small_body_is_sent_with_length() {
    let (addr, requests) = serve(vec![crlf("HTTP/1.1 201 Created\nContent-Length: 0\n\n")]);

    let request = Request::new(Method::POST, url(addr, "/items"))
        .with_header("Content-Type", "application/json")
        .unwrap()
        .with_body(Body::from_bytes(r#"{"name":"anvil"}"#).unwrap());
    let response = TransportClient::new().send(&request).unwrap();
    assert_eq!(response.status(), 201);

    let (head, body) = split_request(&requests.recv().unwrap());
    assert!(head.starts_with("POST /items HTTP/1.1\r\n"));
    assert!(head.contains("Content-Length: 16\r\n"));
    assert_eq!(body, br#"{"name":"anvil"}"#);
}

#[test]
fn large_body_is_streamed_with_declared_length() {
    let (addr, requests) = serve(vec![crlf("HTTP/1.1 204 No Content\n\n")]);

    let payload: Vec<u8> = (0..1024 * 1024 + 100).map(|i| (i % 251) as u8).collect();
    let request = Request::new(Method::PUT, url(addr, "/blob")).with_body(Body::from_bytes(&payload).unwrap());
    let response = TransportClient::new().send(&request).unwrap();
    assert_eq!(response.status(), 204);

    let (head, body) = split_request(&requests.recv().unwrap());
    assert!(head.contains(&format!("Content-Length: {}\r\n", payload.len())));
    assert_eq!(body, payload);
}

#[test]
fn unknown_size_body_is_chunked() {
    let (addr, requests) = serve(vec![crlf("HTTP/1.1 200 OK\nContent-Length: 2\n\nok")]);

    let stream = Stream::from_reader(Cursor::new(b"streamed upload".to_vec()));
    let request = Request::new(Method::POST, url(addr, "/pipe")).with_body(Body::new(stream));
    TransportClient::new().send(&request).unwrap();

    let (head, body) = split_request(&requests.recv().unwrap());
    assert!(head.contains("Transfer-Encoding: chunked\r\n"));
    assert!(!head.to_ascii_lowercase().contains("content-length"));
    assert_eq!(dechunk(&body), b"streamed upload");
}

#[test]
fn chunked_response_is_decoded() {
    let (addr, _requests) = serve(vec![crlf(indoc! {"
        HTTP/1.1 200 OK
        Transfer-Encoding: chunked

        5
        hello
        7
        , world
        0

    "})]);

    let response = TransportClient::new().send(&Request::new(Method::GET, url(addr, "/"))).unwrap();
    assert_eq!(response.body().to_string_lossy(), "hello, world");
    assert_eq!(response.header_line("transfer-encoding"), "chunked");
}

#[test]
fn close_delimited_response() {
    let (addr, _requests) = serve(vec![b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nuntil the end".to_vec()]);

    let response = TransportClient::new().send(&Request::new(Method::GET, url(addr, "/"))).unwrap();
    assert_eq!(response.protocol_version(), "1.0");
    assert_eq!(response.body().to_string_lossy(), "until the end");
}

#[test]
fn interim_response_is_skipped() {
    let (addr, _requests) = serve(vec![crlf("HTTP/1.1 100 Continue\n\nHTTP/1.1 202 Accepted\nContent-Length: 4\n\ndone")]);

    let request = Request::new(Method::POST, url(addr, "/jobs")).with_body(Body::from_bytes("job").unwrap());
    let response = TransportClient::new().send(&request).unwrap();

    assert_eq!(response.status(), 202);
    assert_eq!(response.reason_phrase(), "Accepted");
    assert_eq!(response.body().to_string_lossy(), "done");
}

#[test]
fn head_response_has_no_body() {
    let (addr, requests) = serve(vec![crlf("HTTP/1.1 200 OK\nContent-Length: 10\n\n")]);

    let response = TransportClient::new().send(&Request::new(Method::HEAD, url(addr, "/file"))).unwrap();
    assert_eq!(response.header_line("content-length"), "10");
    assert_eq!(response.body().to_string_lossy(), "");

    let (head, _) = split_request(&requests.recv().unwrap());
    assert!(head.starts_with("HEAD /file HTTP/1.1\r\n"));
}

#[test]
fn redirects_are_not_followed_by_default() {
    let (addr, _requests) = serve(vec![crlf("HTTP/1.1 302 Found\nLocation: /next\nContent-Length: 0\n\n")]);

    let response = TransportClient::new().send(&Request::new(Method::GET, url(addr, "/start"))).unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(response.header_line("location"), "/next");
}

#[test]
fn see_other_switches_to_get() {
    let (addr, requests) = serve(vec![
        crlf("HTTP/1.1 303 See Other\nLocation: /result?id=7\nContent-Length: 0\n\n"),
        crlf("HTTP/1.1 200 OK\nContent-Length: 6\n\nresult"),
    ]);

    let request = Request::new(Method::POST, url(addr, "/submit"))
        .with_header("Content-Type", "text/plain")
        .unwrap()
        .with_body(Body::from_bytes("form").unwrap());
    let mut client = TransportClient::builder().follow_redirects(true).build();
    let response = client.send(&request).unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.body().to_string_lossy(), "result");
    assert_eq!(client.transport().redirect_count(), 1);
    assert_eq!(client.transport().effective_url(), Some(format!("http://{addr}/result?id=7").as_str()));

    let (first, _) = split_request(&requests.recv().unwrap());
    assert!(first.starts_with("POST /submit HTTP/1.1\r\n"));

    let (second, body) = split_request(&requests.recv().unwrap());
    assert!(second.starts_with("GET /result?id=7 HTTP/1.1\r\n"));
    assert!(!second.contains("Content-Type"));
    assert!(!second.contains("Content-Length"));
    assert!(body.is_empty());
}

#[test]
fn temporary_redirect_replays_buffered_body() {
    let (addr, requests) = serve(vec![
        crlf("HTTP/1.1 307 Temporary Redirect\nLocation: /v2/items\nContent-Length: 0\n\n"),
        crlf("HTTP/1.1 201 Created\nContent-Length: 0\n\n"),
    ]);

    let request = Request::new(Method::POST, url(addr, "/items")).with_body(Body::from_bytes("payload").unwrap());
    let response = TransportClient::builder().follow_redirects(true).build().send(&request).unwrap();
    assert_eq!(response.status(), 201);

    requests.recv().unwrap();
    let (second, body) = split_request(&requests.recv().unwrap());
    assert!(second.starts_with("POST /v2/items HTTP/1.1\r\n"));
    assert_eq!(body, b"payload");
}

#[test]
fn redirect_limit_is_enforced() {
    let (addr, _requests) = serve(vec![
        crlf("HTTP/1.1 301 Moved Permanently\nLocation: /b\nContent-Length: 0\n\n"),
        crlf("HTTP/1.1 301 Moved Permanently\nLocation: /c\nContent-Length: 0\n\n"),
    ]);

    let mut client = TransportClient::builder().follow_redirects(true).max_redirects(1).build();
    let err = client.send(&Request::new(Method::GET, url(addr, "/a"))).unwrap_err();

    let ClientError::Transport { source } = err else {
        panic!("expected a transport error, got {err:?}");
    };
    assert_eq!(source.kind(), TransportErrorKind::Protocol);
    assert_eq!(source.message(), "maximum (1) redirects followed");
}

#[test]
fn credentials_become_basic_authorization() {
    let (addr, requests) = serve(vec![crlf("HTTP/1.1 200 OK\nContent-Length: 0\n\n")]);

    let uri = Uri::parse(&format!("http://user:secret@{addr}/private")).unwrap();
    TransportClient::new().send(&Request::new(Method::GET, uri)).unwrap();

    let (head, _) = split_request(&requests.recv().unwrap());
    assert!(head.contains("Authorization: Basic dXNlcjpzZWNyZXQ=\r\n"));
}

#[test]
fn raw_output_without_headers() {
    let (addr, _requests) = serve(vec![crlf("HTTP/1.1 404 Not Found\nContent-Length: 7\n\nmissing")]);

    let mut transport = Http1Transport::new();
    let mut options = TransportOptions::new(&Default::default(), format!("http://{addr}/gone"));
    options.include_headers = false;
    let raw = transport.perform(options).unwrap();

    assert_eq!(raw.status, 404);
    assert_eq!(raw.header_size, 0);
    assert_eq!(&raw.data[..], b"missing");
}

#[test]
fn refused_connection_is_a_connect_error() {
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();

    let err = TransportClient::new().send(&Request::new(Method::GET, url(addr, "/"))).unwrap_err();
    let ClientError::Transport { source } = err else {
        panic!("expected a transport error, got {err:?}");
    };
    assert_eq!(source.kind(), TransportErrorKind::Connect);
}

#[test]
fn slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        thread::sleep(Duration::from_secs(2));
    });

    let mut client = TransportClient::builder().timeout(Duration::from_millis(200)).build();
    let err = client.send(&Request::new(Method::GET, url(addr, "/slow"))).unwrap_err();

    let ClientError::Transport { source } = err else {
        panic!("expected a transport error, got {err:?}");
    };
    assert_eq!(source.kind(), TransportErrorKind::Timeout);
}
