//! Error types for the HTTP client.
//!
//! # Design
//! The two timeout phases get dedicated variants because callers need to
//! distinguish "the connection was never established" from "the server was
//! too slow to answer." Note that the per-request timeout covers the whole
//! exchange including connection setup, so a short per-request timeout can
//! surface as `ConnectTimeout` rather than `RequestTimeout` — this mirrors
//! the behavior callers observe in practice and is tested, not hidden.
//! Everything the underlying stack reports (DNS, resets, TLS, framing)
//! lands in `Network` with the original message for debugging.

use std::fmt;

/// Errors returned by [`Client`](crate::Client) sends and by
/// [`Pending`](crate::Pending) chains.
#[derive(Debug)]
pub enum Error {
    /// The connection phase (TCP connect, proxy tunnel, TLS and HTTP
    /// handshake) exceeded its bound — either the client-wide connect
    /// timeout or the remaining per-request budget.
    ConnectTimeout,

    /// The per-request timeout elapsed after the connection was
    /// established but before the full response was received.
    RequestTimeout,

    /// A composed async chain's timeout elapsed, or the chain was
    /// dropped, before a terminal value was produced.
    AsyncTimeout,

    /// The redirect chain exceeded the hop limit.
    TooManyRedirects { limit: usize },

    /// The request could not be built or sent: malformed URI, unsupported
    /// scheme, missing host, or an invalid header.
    InvalidRequest(String),

    /// A transport-level failure: DNS resolution, connection reset, TLS
    /// failure, or malformed response framing.
    Network(String),

    /// A body handler failed to process the response payload, e.g. a file
    /// write error in `to_file`.
    Body(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConnectTimeout => write!(f, "connection phase timed out"),
            Error::RequestTimeout => write!(f, "request timed out"),
            Error::AsyncTimeout => {
                write!(f, "async chain timed out or was cancelled before completion")
            }
            Error::TooManyRedirects { limit } => {
                write!(f, "redirect chain exceeded {limit} hops")
            }
            Error::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Error::Network(msg) => write!(f, "network error: {msg}"),
            Error::Body(msg) => write!(f, "body handling failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::Network(err.to_string())
    }
}
