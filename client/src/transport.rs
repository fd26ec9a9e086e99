//! Per-request connection establishment and exchange.
//!
//! # Design
//! Each send opens a fresh connection: TCP connect (directly or through
//! the configured proxy), an optional TLS handshake with ALPN, then a
//! hyper HTTP/1.1 or HTTP/2 handshake. Connection pooling is deliberately
//! out of scope. The connection phase runs under the minimum of the
//! client's connect timeout and the remaining per-request budget, and any
//! elapse there surfaces as `ConnectTimeout` — which is why a very short
//! per-request timeout reports a connect timeout rather than a request
//! timeout. Only once the connection is up does an elapsed per-request
//! budget surface as `RequestTimeout`.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HOST};
use http::{Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use log::debug;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use crate::client::{Config, Version};
use crate::error::Error;
use crate::redirect;
use crate::request::Request;
use crate::response::Response;

/// An established connection ready to carry one exchange.
enum Conn {
    Http1(http1::SendRequest<Full<Bytes>>),
    Http2(http2::SendRequest<Full<Bytes>>),
}

/// Execute `request` against the network, following redirects per the
/// client's policy, and return the raw-bytes response.
pub(crate) async fn execute(config: &Config, request: &Request) -> Result<Response<Bytes>, Error> {
    let deadline = request.timeout().map(|t| Instant::now() + t);
    let mut uri = request.uri().clone();
    let mut method = request.method().clone();
    let mut headers = request.headers().clone();
    let mut body = request.body().as_bytes();
    let mut hops = 0usize;

    loop {
        let response = send_once(config, &uri, &method, &headers, body.clone(), deadline).await?;
        if !response.status().is_redirection() {
            return Ok(response);
        }
        // A 3xx without Location is returned to the caller as-is.
        let location = match response.first_header("location") {
            Some(value) => value.to_string(),
            None => return Ok(response),
        };
        let next = redirect::resolve_location(&uri, &location)?;
        if !redirect::should_follow(config.redirect, &uri, &next) {
            return Ok(response);
        }
        hops += 1;
        if hops > redirect::MAX_REDIRECTS {
            return Err(Error::TooManyRedirects {
                limit: redirect::MAX_REDIRECTS,
            });
        }
        let next_method = redirect::redirect_method(response.status(), &method);
        if next_method == Method::GET && method != Method::GET {
            body = Bytes::new();
            redirect::strip_content_headers(&mut headers);
        }
        redirect::strip_sensitive_headers(&mut headers, &uri, &next);
        debug!("following {} redirect: {uri} -> {next}", response.status());
        method = next_method;
        uri = next;
    }
}

/// One connect-and-exchange round trip, with the two timeout phases.
async fn send_once(
    config: &Config,
    uri: &Uri,
    method: &Method,
    headers: &HeaderMap,
    body: Bytes,
    deadline: Option<Instant>,
) -> Result<Response<Bytes>, Error> {
    let connecting = connect(config, uri);
    let conn = match connect_bound(config.connect_timeout, deadline) {
        Some(limit) => match timeout(limit, connecting).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::ConnectTimeout),
        },
        None => connecting.await?,
    };

    let absolute_form = config.proxy.is_some() && uri.scheme_str() == Some("http");
    let exchanging = exchange(conn, absolute_form, uri, method, headers, body);
    match remaining(deadline) {
        Some(left) => match timeout(left, exchanging).await {
            Ok(result) => result,
            Err(_) => Err(Error::RequestTimeout),
        },
        None => exchanging.await,
    }
}

/// The bound on the connection phase: the smaller of the client-wide
/// connect timeout and whatever is left of the per-request budget.
fn connect_bound(connect_timeout: Option<Duration>, deadline: Option<Instant>) -> Option<Duration> {
    match (connect_timeout, remaining(deadline)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

/// Establish a connection for `uri`: TCP (possibly via proxy), then TLS
/// with ALPN where the scheme requires it, then the HTTP handshake.
///
/// Plaintext connections always speak HTTP/1.1; h2c upgrade is out of
/// scope. Over TLS, `Version::Negotiate` offers h2 via ALPN and falls back
/// to HTTP/1.1 when the server declines.
async fn connect(config: &Config, uri: &Uri) -> Result<Conn, Error> {
    let tls = uri.scheme_str() == Some("https");
    let host = uri
        .host()
        .ok_or_else(|| Error::InvalidRequest("uri has no host".to_string()))?;
    let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });

    let tcp = match &config.proxy {
        Some(proxy) => {
            debug!("connecting to {host}:{port} via proxy {}:{}", proxy.host, proxy.port);
            let tcp = TcpStream::connect((proxy.host.as_str(), proxy.port)).await?;
            if tls {
                tunnel(tcp, host, port).await?
            } else {
                tcp
            }
        }
        None => {
            debug!("connecting to {host}:{port}");
            TcpStream::connect((host, port)).await?
        }
    };

    if !tls {
        let (sender, conn) = http1::handshake(TokioIo::new(tcp)).await?;
        drive(conn);
        return Ok(Conn::Http1(sender));
    }

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::InvalidRequest(format!("invalid server name: {host}")))?;
    let stream = config.tls.connect(server_name, tcp).await?;
    let negotiated_h2 = {
        let (_, session) = stream.get_ref();
        session.alpn_protocol() == Some(&b"h2"[..])
    };
    if config.version == Version::Negotiate && negotiated_h2 {
        debug!("negotiated h2 with {host}");
        let (sender, conn) = http2::handshake(TokioExecutor::new(), TokioIo::new(stream)).await?;
        drive(conn);
        Ok(Conn::Http2(sender))
    } else {
        let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        drive(conn);
        Ok(Conn::Http1(sender))
    }
}

/// Spawn the hyper connection driver; the task exits when the exchange
/// completes or the peer hangs up.
fn drive<F>(conn: F)
where
    F: std::future::Future<Output = Result<(), hyper::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            debug!("connection closed: {err}");
        }
    });
}

/// Issue one request on an established connection and collect the full
/// response payload.
async fn exchange(
    conn: Conn,
    absolute_form: bool,
    uri: &Uri,
    method: &Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response<Bytes>, Error> {
    let is_h2 = matches!(conn, Conn::Http2(_));
    let request = build_wire_request(is_h2, absolute_form, uri, method, headers, body)?;
    let response = match conn {
        Conn::Http1(mut sender) => sender.send_request(request).await?,
        Conn::Http2(mut sender) => sender.send_request(request).await?,
    };
    let (parts, incoming) = response.into_parts();
    let raw = incoming.collect().await?.to_bytes();
    Ok(Response::new(parts.status, parts.headers, raw))
}

/// Build the on-the-wire request. HTTP/1.1 uses origin-form with an
/// explicit Host header (absolute-form when talking through a plaintext
/// proxy); HTTP/2 keeps the absolute URI so hyper derives the pseudo
/// headers from it.
fn build_wire_request(
    is_h2: bool,
    absolute_form: bool,
    uri: &Uri,
    method: &Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<http::Request<Full<Bytes>>, Error> {
    let target: Uri = if is_h2 || absolute_form {
        uri.clone()
    } else {
        uri.path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("invalid request path: {e}")))?
    };

    let mut builder = http::Request::builder().method(method.clone()).uri(target);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    if !is_h2 && !headers.contains_key(HOST) {
        let authority = uri.authority().map(|a| a.as_str()).unwrap_or_default();
        builder = builder.header(HOST, authority);
    }
    builder
        .body(Full::new(body))
        .map_err(|e| Error::InvalidRequest(e.to_string()))
}

/// Open a tunnel through a plaintext proxy with an HTTP CONNECT request.
async fn tunnel(mut tcp: TcpStream, host: &str, port: u16) -> Result<TcpStream, Error> {
    let connect = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n");
    tcp.write_all(connect.as_bytes()).await?;

    let mut response = Vec::with_capacity(256);
    let mut buf = [0u8; 256];
    loop {
        let n = tcp.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::Network("proxy closed connection during CONNECT".to_string()));
        }
        response.extend_from_slice(&buf[..n]);
        if response.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if response.len() > 8192 {
            return Err(Error::Network("oversized CONNECT response".to_string()));
        }
    }

    let head = String::from_utf8_lossy(&response);
    let accepted = head
        .split_whitespace()
        .nth(1)
        .is_some_and(|code| code.starts_with('2'));
    if accepted {
        Ok(tcp)
    } else {
        Err(Error::Network(format!(
            "proxy refused CONNECT: {}",
            head.lines().next().unwrap_or("")
        )))
    }
}
