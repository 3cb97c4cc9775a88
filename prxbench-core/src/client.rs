mod error;
mod types;

pub use error::{Error, Result, TransportErrorKind};
pub use types::{HttpRequest, HttpResponse};

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

/// HTTP/1.1 client that routes every request through a forward proxy.
///
/// Each request opens a fresh connection to the proxy and sends the target
/// URL in absolute form, so consecutive requests can rotate proxies freely.
/// Only `http://` targets are supported; CONNECT tunneling is not.
#[derive(Debug, Clone)]
pub struct ProxyHttpClient {
    connect_timeout: Option<Duration>,
}

impl Default for ProxyHttpClient {
    fn default() -> Self {
        // The OS-level TCP connect timeout can be very long (tens of
        // seconds); failed proxy connects should surface promptly.
        Self::new(Some(Duration::from_secs(3)))
    }
}

impl ProxyHttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// Issues `req` through the proxy at `proxy_addr` (`host:port`).
    ///
    /// The request deadline, when set, bounds the whole exchange: connect,
    /// handshake, request, and body read.
    pub async fn request_via(&self, proxy_addr: &str, req: HttpRequest) -> Result<HttpResponse> {
        match req.timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.request_inner(proxy_addr, req)).await {
                    Ok(res) => res,
                    Err(_) => Err(Error::Timeout(deadline)),
                }
            }
            None => self.request_inner(proxy_addr, req).await,
        }
    }

    async fn request_inner(&self, proxy_addr: &str, req: HttpRequest) -> Result<HttpResponse> {
        let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
        if parsed.scheme() != "http" {
            return Err(Error::UnsupportedScheme(req.url));
        }

        let stream = match self.connect_timeout {
            Some(t) => tokio::time::timeout(t, TcpStream::connect(proxy_addr))
                .await
                .map_err(|_| Error::ConnectTimeout(t))??,
            None => TcpStream::connect(proxy_addr).await?,
        };

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(Error::Request)?;
        // The connection task owns the socket and winds down once the
        // sender is dropped.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        // Absolute-form request target; the proxy picks the origin from it.
        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = Request::builder().method(req.method.clone()).uri(uri);

        // Make implicit headers explicit; HTTP/1.1 requires Host even in
        // absolute form.
        if !has_header(&req.headers, "host")
            && let Some(host) = host_header_value(&parsed)
        {
            builder = builder.header(http::header::HOST, host);
        }
        if !req.body.is_empty() && !has_header(&req.headers, "content-length") {
            builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
        }

        for (k, v) in &req.headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(v)?;
            builder = builder.header(name, value);
        }

        let request: Request<Full<Bytes>> = builder.body(Full::new(req.body))?;
        let res: hyper::Response<Incoming> =
            sender.send_request(request).await.map_err(Error::Request)?;

        let (parts, body) = res.into_parts();
        let status = parts.status.as_u16();

        // Normalize headers to lowercase keys; join repeated values.
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            let key = name.as_str().to_ascii_lowercase();
            let v = String::from_utf8_lossy(value.as_bytes()).to_string();
            merged
                .entry(key)
                .and_modify(|cur| {
                    if !cur.is_empty() {
                        cur.push_str(", ");
                    }
                    cur.push_str(&v);
                })
                .or_insert(v);
        }
        let headers: Vec<(String, String)> = merged.into_iter().collect();

        let body = body.collect().await.map_err(Error::BodyRead)?.to_bytes();

        Ok(HttpResponse {
            status,
            body,
            headers,
        })
    }
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

fn host_header_value(url: &url::Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}
