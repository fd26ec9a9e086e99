//! The HTTP client facade and its configuration surface.
//!
//! # Design
//! `Client` is built once from a `ClientBuilder` and immutable afterwards;
//! clones share the same configuration and worker runtime, so a single
//! client can serve concurrent callers without external locking. The
//! client owns a small multi-thread tokio runtime: synchronous sends block
//! the calling thread on it, asynchronous sends and their continuations
//! run on its worker threads. There is no default connect timeout — the
//! OS network defaults apply until one is configured.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::runtime::Runtime;
use tokio_rustls::TlsConnector;

use crate::error::Error;
use crate::pending::Pending;
use crate::redirect::Redirect;
use crate::request::Request;
use crate::response::{BodyHandler, Response};
use crate::transport;

/// Protocol selection for the TLS handshake.
///
/// Plaintext connections always speak HTTP/1.1 regardless of this setting;
/// h2c upgrade is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// Offer HTTP/2 via ALPN and fall back to HTTP/1.1 when the server
    /// does not support it. The default.
    Negotiate,
    /// Only ever offer HTTP/1.1.
    Http1Only,
}

/// A plaintext forward proxy target.
///
/// http targets are sent through it in absolute-form; https targets are
/// tunnelled with CONNECT.
#[derive(Debug, Clone)]
pub struct Proxy {
    pub(crate) host: String,
    pub(crate) port: u16,
}

impl Proxy {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Proxy { host: host.into(), port }
    }
}

/// Frozen client configuration shared by all clones of a `Client`.
pub(crate) struct Config {
    pub(crate) version: Version,
    pub(crate) redirect: Redirect,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) proxy: Option<Proxy>,
    pub(crate) tls: TlsConnector,
}

/// A configurable entry point for issuing HTTP requests.
///
/// Cheap to clone; all clones share one configuration and worker runtime.
/// Safe for concurrent use from multiple threads.
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    runtime: Arc<Runtime>,
}

impl Client {
    /// A client with default settings: protocol negotiation with HTTP/1.1
    /// fallback, `Redirect::Normal`, no connect timeout, no proxy.
    /// Equivalent to `Client::builder().build()`.
    pub fn new() -> Result<Client, Error> {
        Client::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Send `request` and block the calling thread until a response
    /// arrives, a timeout elapses, or the transport fails.
    ///
    /// The request is borrowed, not consumed — a built request can be
    /// sent any number of times. Must not be called from async context or
    /// from continuation code running on this client's worker pool.
    pub fn send<H: BodyHandler>(
        &self,
        request: &Request,
        handler: H,
    ) -> Result<Response<H::Output>, Error> {
        let raw = self.runtime.block_on(transport::execute(&self.config, request))?;
        raw.handled(handler)
    }

    /// Send `request` without blocking; returns a [`Pending`] handle that
    /// resolves on the client's worker pool.
    ///
    /// Continuations registered on the handle run on worker threads, not
    /// the calling thread.
    pub fn send_async<H: BodyHandler>(
        &self,
        request: &Request,
        handler: H,
    ) -> Pending<Response<H::Output>> {
        let config = Arc::clone(&self.config);
        let request = request.clone();
        Pending::spawn(self.runtime.handle().clone(), async move {
            let raw = transport::execute(&config, &request).await?;
            raw.handled(handler)
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("version", &self.config.version)
            .field("redirect", &self.config.redirect)
            .field("connect_timeout", &self.config.connect_timeout)
            .field("proxy", &self.config.proxy)
            .finish()
    }
}

/// Fluent builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    version: Version,
    redirect: Redirect,
    connect_timeout: Option<Duration>,
    proxy: Option<Proxy>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder {
            version: Version::Negotiate,
            redirect: Redirect::Normal,
            connect_timeout: None,
            proxy: None,
        }
    }
}

impl ClientBuilder {
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn follow_redirects(mut self, redirect: Redirect) -> Self {
        self.redirect = redirect;
        self
    }

    /// Bound the connection phase (TCP connect, proxy tunnel, TLS and
    /// HTTP handshake). Exceeding it fails with [`Error::ConnectTimeout`].
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Route outbound connections through `proxy`.
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Freeze the configuration and start the client's worker runtime.
    pub fn build(self) -> Result<Client, Error> {
        let tls = build_tls(self.version)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_io()
            .enable_time()
            .thread_name("httpc-worker")
            .build()
            .map_err(|e| Error::Network(format!("failed to start worker runtime: {e}")))?;
        info!(
            "client ready (version: {:?}, redirects: {:?}, connect timeout: {:?})",
            self.version, self.redirect, self.connect_timeout
        );
        Ok(Client {
            config: Arc::new(Config {
                version: self.version,
                redirect: self.redirect,
                connect_timeout: self.connect_timeout,
                proxy: self.proxy,
                tls,
            }),
            runtime: Arc::new(runtime),
        })
    }
}

/// rustls connector with the webpki root set and an ALPN list matching the
/// requested protocol version.
fn build_tls(version: Version) -> Result<TlsConnector, Error> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Network(format!("tls configuration failed: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = match version {
        Version::Negotiate => vec![b"h2".to_vec(), b"http/1.1".to_vec()],
        Version::Http1Only => vec![b"http/1.1".to_vec()],
    };
    Ok(TlsConnector::from(Arc::new(config)))
}
