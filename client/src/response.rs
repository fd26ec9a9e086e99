//! Response type and body-handling strategies.
//!
//! # Design
//! The transport always materializes the response payload as raw bytes;
//! the caller picks what to do with them by passing a [`BodyHandler`] to
//! `send`/`send_async`. `Response<T>` is parameterized over the handler's
//! output so "text", "raw bytes", "written to file", and "discarded" all
//! share one response shape. A response is produced exactly once per send
//! and owned exclusively by the caller.

use std::path::PathBuf;

use bytes::Bytes;
use http::header::HeaderMap;
use http::StatusCode;

use crate::error::Error;

/// The result of a completed HTTP exchange.
#[derive(Debug)]
pub struct Response<T> {
    status: StatusCode,
    headers: HeaderMap,
    body: T,
}

impl<T> Response<T> {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: T) -> Self {
        Response { status, headers, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The first value of `name`, if present and valid UTF-8. Header name
    /// lookup is case-insensitive.
    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// True for status codes in the 200..=299 range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn into_body(self) -> T {
        self.body
    }
}

impl Response<Bytes> {
    /// Apply a body handler, keeping status and headers.
    pub(crate) fn handled<H: BodyHandler>(self, handler: H) -> Result<Response<H::Output>, Error> {
        let Response { status, headers, body } = self;
        Ok(Response {
            status,
            headers,
            body: handler.handle(body)?,
        })
    }
}

/// Strategy for turning the raw response payload into a caller-chosen value.
pub trait BodyHandler: Send + 'static {
    type Output: Send + 'static;

    fn handle(self, raw: Bytes) -> Result<Self::Output, Error>;
}

/// Materialize the body as a `String`, replacing invalid UTF-8 sequences.
pub fn text() -> Text {
    Text { _priv: () }
}

/// Keep the body as raw [`Bytes`].
pub fn bytes() -> Raw {
    Raw { _priv: () }
}

/// Drop the body, keeping only status and headers.
pub fn discard() -> Discard {
    Discard { _priv: () }
}

/// Write the body to `path`, yielding the path on success.
pub fn to_file(path: impl Into<PathBuf>) -> ToFile {
    ToFile { path: path.into() }
}

#[derive(Debug)]
pub struct Text {
    _priv: (),
}

impl BodyHandler for Text {
    type Output = String;

    fn handle(self, raw: Bytes) -> Result<String, Error> {
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

#[derive(Debug)]
pub struct Raw {
    _priv: (),
}

impl BodyHandler for Raw {
    type Output = Bytes;

    fn handle(self, raw: Bytes) -> Result<Bytes, Error> {
        Ok(raw)
    }
}

#[derive(Debug)]
pub struct Discard {
    _priv: (),
}

impl BodyHandler for Discard {
    type Output = ();

    fn handle(self, _raw: Bytes) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct ToFile {
    path: PathBuf,
}

impl BodyHandler for ToFile {
    type Output = PathBuf;

    fn handle(self, raw: Bytes) -> Result<PathBuf, Error> {
        std::fs::write(&self.path, &raw)
            .map_err(|e| Error::Body(format!("failed to write {}: {e}", self.path.display())))?;
        Ok(self.path)
    }
}
