//! The hyper-util client behind [`HttpDispatcher`](crate::HttpDispatcher).

use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{self, Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tower::Service;

use super::tls;
use crate::Error;

/// Body type of requests sent by [`HyperTransport`].
pub type RequestBody = Full<Bytes>;

type Connector = HttpsConnector<HttpConnector>;

/// Pooled HTTP/1.1 and HTTP/2 transport over plain TCP or rustls.
///
/// Clones share one connection pool.
///
/// # Example
///
/// ```ignore
/// use fexios::{Client, transport::HyperTransport};
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .connect_timeout(Duration::from_secs(3))
///     .build()?;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .transport(transport)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<Connector, RequestBody>,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Transport with default settings and feature-selected TLS.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Send a request and wait for the response head.
    ///
    /// The body of the returned response is still unread.
    pub async fn request(&self, request: http::Request<RequestBody>) -> Result<http::Response<Incoming>, Error> {
        self.client.request(request).await.map_err(transport_error)
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }
}

/// Flatten a hyper-util error and its causes into one message.
fn transport_error(err: legacy::Error) -> Error {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    Error::Transport(message)
}

impl Service<http::Request<RequestBody>> for HyperTransport {
    type Response = http::Response<Incoming>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The legacy client queues internally and is always ready.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<RequestBody>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.request(request).await })
    }
}

/// Settings for a [`HyperTransport`].
///
/// Defaults: feature-selected TLS, TCP_NODELAY on, no connect timeout,
/// idle connections kept for 90 seconds, at most 32 idle per host.
#[derive(Debug, Clone)]
pub struct HyperTransportBuilder {
    tls_config: Option<ClientConfig>,
    accept_invalid_certs: bool,
    http2_only: bool,
    connect_timeout: Option<Duration>,
    nodelay: bool,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self {
            tls_config: None,
            accept_invalid_certs: false,
            http2_only: false,
            connect_timeout: None,
            nodelay: true,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom rustls config, e.g. for private roots or client certificates.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Accept any server certificate.
    ///
    /// Overrides [`tls_config`](Self::tls_config). Development only.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.accept_invalid_certs = true;
        self
    }

    /// Speak HTTP/2 without negotiating it first.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Give up on TCP connects that take longer than this.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Close pooled connections idle for longer than this. `None` keeps them.
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Fails when no TLS config was given and none can be derived from the
    /// enabled features.
    pub fn build(self) -> Result<HyperTransport, Error> {
        let tls = match (self.accept_invalid_certs, self.tls_config) {
            (true, _) => tls::insecure_tls_config()?,
            (false, Some(config)) => config,
            (false, None) => tls::default_tls_config()?,
        };

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(self.nodelay);
        http.set_connect_timeout(self.connect_timeout);

        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_all_versions()
            .wrap_connector(http);

        let mut client = Client::builder(TokioExecutor::new());
        client
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .http2_only(self.http2_only);

        Ok(HyperTransport {
            client: client.build(connector),
            http2_only: self.http2_only,
        })
    }
}
