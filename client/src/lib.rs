//! Blocking and non-blocking HTTP client facade.
//!
//! # Overview
//! A thin, configurable client for issuing HTTP requests over HTTP/1.1 or
//! HTTP/2 (negotiated via TLS ALPN), with synchronous and asynchronous
//! send paths, per-request timeouts, redirect policies, and an optional
//! forward proxy. The wire protocols themselves are delegated to hyper
//! and rustls; this crate owns configuration, timeout semantics, redirect
//! decisions, and the async continuation surface.
//!
//! # Design
//! - `Client` is immutable once built and shares one worker runtime across
//!   clones, so concurrent callers need no external locking.
//! - `Request` is immutable once built and reusable across sends; each
//!   send produces an independent `Response` owned by its caller.
//! - Body handling is caller-chosen per send: `text()`, `bytes()`,
//!   `discard()`, or `to_file(path)`.
//! - `send_async` returns a `Pending` handle whose continuations run on
//!   the client's worker pool, never the registering thread.
//!
//! # Timeout boundary
//! The per-request timeout covers the entire exchange, connection setup
//! included. When it elapses while the connection is still being
//! established the failure surfaces as [`Error::ConnectTimeout`], not
//! [`Error::RequestTimeout`] — a deliberately preserved quirk of the
//! behavior this client reproduces. See `transport` for the mechanics.
//!
//! # Example
//! ```no_run
//! use httpc::{handler, Client, Request};
//!
//! # fn main() -> Result<(), httpc::Error> {
//! let client = Client::new()?;
//! let request = Request::builder("http://localhost:3000/text").build()?;
//! let response = client.send(&request, handler::text())?;
//! assert!(response.is_success());
//! println!("{}", response.body());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod pending;
pub mod redirect;
pub mod request;
pub mod response;
mod transport;

pub use client::{Client, ClientBuilder, Proxy, Version};
pub use error::Error;
pub use pending::Pending;
pub use redirect::Redirect;
pub use request::{Body, Request, RequestBuilder};
pub use response::{BodyHandler, Response};

/// Body-handling strategies, re-exported under one name for call sites.
pub mod handler {
    pub use crate::response::{bytes, discard, text, to_file};
}

pub use http::{Method, StatusCode};
