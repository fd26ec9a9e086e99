//! Redirect policy and pure redirect decisions.
//!
//! # Design
//! Everything here is free of I/O so the policy matrix, Location
//! resolution, and method rewriting are testable without a server. The
//! transport's redirect loop calls into these helpers on each 3xx hop.
//! `Normal` (the default) refuses exactly one thing: a hop that downgrades
//! https to http. Credentials are stripped when a hop changes host so they
//! never leak to a third party.

use http::header::{
    HeaderMap, AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE,
    PROXY_AUTHORIZATION, TRANSFER_ENCODING,
};
use http::{Method, StatusCode, Uri};

use crate::error::Error;

/// Upper bound on automatically followed hops per send.
pub(crate) const MAX_REDIRECTS: usize = 5;

/// Controls whether 3xx responses are followed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// Return 3xx responses to the caller untouched.
    Never,
    /// Follow every redirect, downgrades included.
    Always,
    /// Follow redirects except https → http downgrades. The default.
    Normal,
}

/// Whether `policy` permits following a hop from `from` to `to`.
pub(crate) fn should_follow(policy: Redirect, from: &Uri, to: &Uri) -> bool {
    match policy {
        Redirect::Never => false,
        Redirect::Always => true,
        Redirect::Normal => {
            !(from.scheme_str() == Some("https") && to.scheme_str() == Some("http"))
        }
    }
}

/// Resolve a `Location` header value against the URI that produced it.
///
/// Handles absolute locations, host-relative (`/path`) locations, and
/// path-relative locations merged against the base path's directory.
pub(crate) fn resolve_location(base: &Uri, location: &str) -> Result<Uri, Error> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location
            .parse()
            .map_err(|e| Error::Network(format!("invalid redirect location {location:?}: {e}")));
    }
    let scheme = base.scheme_str().unwrap_or("http");
    let authority = base
        .authority()
        .map(|a| a.as_str())
        .ok_or_else(|| Error::Network("redirect base uri has no authority".to_string()))?;
    let combined = if location.starts_with('/') {
        format!("{scheme}://{authority}{location}")
    } else {
        let path = base.path();
        let dir = match path.rfind('/') {
            Some(i) => &path[..=i],
            None => "/",
        };
        format!("{scheme}://{authority}{dir}{location}")
    };
    combined
        .parse()
        .map_err(|e| Error::Network(format!("invalid redirect location {location:?}: {e}")))
}

/// The method to use after a redirect with `status`.
///
/// 303 always rewrites to GET; 301 and 302 rewrite POST to GET (matching
/// what servers and clients expect in practice); 307 and 308 preserve the
/// original method and body.
pub(crate) fn redirect_method(status: StatusCode, method: &Method) -> Method {
    if status == StatusCode::SEE_OTHER {
        return Method::GET;
    }
    if (status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND)
        && *method == Method::POST
    {
        return Method::GET;
    }
    method.clone()
}

/// Drop body-describing headers. Called when a redirect rewrites the
/// method to GET and the body is discarded, so the follow-up request does
/// not advertise a payload it no longer carries.
pub(crate) fn strip_content_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
    headers.remove(CONTENT_ENCODING);
    headers.remove(TRANSFER_ENCODING);
}

/// Drop credential-bearing headers when a hop moves to a different host.
pub(crate) fn strip_sensitive_headers(headers: &mut HeaderMap, from: &Uri, to: &Uri) {
    if from.host() != to.host() || from.port_u16() != to.port_u16() {
        headers.remove(AUTHORIZATION);
        headers.remove(COOKIE);
        headers.remove(PROXY_AUTHORIZATION);
    }
}
