//! Immutable HTTP request description.
//!
//! # Design
//! A `Request` is built once via `RequestBuilder` and never mutated
//! afterwards, so a single built request is safe to reuse across any number
//! of send invocations — each send produces an independent response.
//! Invalid input (bad URI, unsupported scheme, malformed header) is
//! remembered by the builder and surfaced from `build()`, keeping the
//! fluent chain free of intermediate `Result`s.

use std::io::Read;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};

use crate::error::Error;

/// The payload of an outbound request.
///
/// Bodies are held as [`Bytes`] so cloning a request for a retry or a
/// redirect hop is cheap. A reader-sourced body is drained once at
/// construction; the buffered bytes are then reused on every send.
#[derive(Debug, Clone)]
pub enum Body {
    /// No payload. GET and HEAD requests use this.
    Empty,
    /// An in-memory payload.
    Bytes(Bytes),
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Source the payload from an in-memory string.
    pub fn from_string(text: impl Into<String>) -> Self {
        Body::Bytes(Bytes::from(text.into()))
    }

    pub fn from_bytes(raw: impl Into<Bytes>) -> Self {
        Body::Bytes(raw.into())
    }

    /// Source the payload from a readable byte stream. The reader is
    /// drained eagerly; a read failure surfaces as [`Error::Body`].
    pub fn from_reader(mut reader: impl Read) -> Result<Self, Error> {
        let mut raw = Vec::new();
        reader
            .read_to_end(&mut raw)
            .map_err(|e| Error::Body(format!("failed to read request body: {e}")))?;
        Ok(Body::Bytes(Bytes::from(raw)))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(raw) => raw.is_empty(),
        }
    }

    /// The buffered payload bytes. Empty bodies yield an empty buffer.
    pub(crate) fn as_bytes(&self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Bytes(raw) => raw.clone(),
        }
    }
}

/// An immutable description of an outbound HTTP call.
///
/// Built via [`Request::builder`]; safe to reuse across multiple sends.
#[derive(Debug, Clone)]
pub struct Request {
    uri: Uri,
    method: Method,
    headers: HeaderMap,
    body: Body,
    timeout: Option<Duration>,
}

impl Request {
    /// Start building a request for `uri`. The URI is validated at
    /// [`RequestBuilder::build`] time.
    pub fn builder(uri: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            uri: uri.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Body::Empty,
            timeout: None,
            invalid: None,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The per-request timeout, covering the entire exchange including
    /// connection setup. See the crate docs for the connect/request
    /// timeout boundary.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Fluent builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    uri: String,
    method: Method,
    headers: HeaderMap,
    body: Body,
    timeout: Option<Duration>,
    invalid: Option<String>,
}

impl RequestBuilder {
    /// Set the HTTP method. Defaults to GET when not called.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header. Repeated names accumulate multiple values.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let parsed_name = name.parse::<HeaderName>();
        let parsed_value = HeaderValue::from_str(value);
        match (parsed_name, parsed_value) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => {
                if self.invalid.is_none() {
                    self.invalid = Some(format!("malformed header: {name}"));
                }
            }
        }
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Set a timeout for the whole request/response exchange, connection
    /// setup included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate and freeze the request.
    pub fn build(self) -> Result<Request, Error> {
        if let Some(msg) = self.invalid {
            return Err(Error::InvalidRequest(msg));
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("invalid uri {:?}: {e}", self.uri)))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(other) => {
                return Err(Error::InvalidRequest(format!("unsupported scheme: {other}")));
            }
            None => {
                return Err(Error::InvalidRequest(format!("uri has no scheme: {:?}", self.uri)));
            }
        }
        if uri.host().is_none() {
            return Err(Error::InvalidRequest(format!("uri has no host: {:?}", self.uri)));
        }
        Ok(Request {
            uri,
            method: self.method,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        })
    }
}
