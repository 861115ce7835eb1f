use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, redirect};
use std::time::Duration;

/// User agent sent with every request of a run
pub const USER_AGENT: &str = concat!("seoscan/", env!("CARGO_PKG_VERSION"), " (SEO audit bot)");
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const PROBE_ACCEPT_ENCODING: &str = "gzip, deflate, br";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers
}

/// Creates the client shared by one analysis run.
///
/// With `follow_redirects` off, 3xx responses are returned to the caller as-is
/// so the page fetcher can record the redirect status itself.
pub fn build_http_client(timeout: Duration, follow_redirects: bool) -> reqwest::Result<Client> {
    let policy = if follow_redirects {
        redirect::Policy::limited(10)
    } else {
        redirect::Policy::none()
    };

    ClientBuilder::new()
        .user_agent(USER_AGENT)
        .default_headers(default_headers())
        .timeout(timeout)
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// Creates a client that never decompresses, so `Content-Encoding` survives
/// in the response headers.
pub fn build_probe_client(timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = default_headers();
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static(PROBE_ACCEPT_ENCODING),
    );

    ClientBuilder::new()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .redirect(redirect::Policy::limited(10))
        .no_gzip()
        .no_brotli()
        .no_deflate()
        .build()
}
