//! Sends one request and prints the response.
//!
//! ```text
//! cargo run -p courier-client --example send -- http://example.com/
//! cargo run -p courier-client --example send -- http://httpbin.org/post POST 'hello'
//! ```

use std::env;
use std::time::Duration;

use courier_client::{Client, TransportClient};
use courier_http::{Body, Request};
use http::Method;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "http://example.com/".to_string());
    let method = args.next().map_or(Ok(Method::GET), |m| m.parse::<Method>());
    let body = args.next();

    let Ok(method) = method else {
        error!("invalid method");
        return;
    };

    let mut builder = Request::builder().method(method).uri(url.as_str()).header("User-Agent", "courier-send/0.1");
    if let Some(body) = body {
        builder = builder.body(Body::from_bytes(body).expect("in-memory body"));
    }

    let request = match builder.build() {
        Ok(request) => request,
        Err(e) => {
            error!(cause = %e, "invalid request");
            return;
        }
    };

    let mut client = TransportClient::builder()
        .follow_redirects(true)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build();

    match client.send(&request) {
        Ok(response) => {
            info!(status = response.status(), reason = response.reason_phrase(), "received response");
            for (name, values) in response.headers() {
                println!("{name}: {}", values.join(", "));
            }
            println!();
            println!("{}", response.body().to_string_lossy());
        }
        Err(e) => error!(cause = %e, "request failed"),
    }
}
