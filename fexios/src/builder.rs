//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use serde_json::Value;

use crate::Error;
use crate::client::Client;
use crate::config::{ClientDefaults, Credentials};
use crate::dispatch::{Dispatch, HttpDispatcher};
use crate::transport::HyperTransport;

/// Builder for creating a [`Client`].
///
/// Header errors are deferred: an invalid name or value makes
/// [`build`](Self::build) fail instead of panicking mid-chain.
///
/// # Example
///
/// ```ignore
/// use fexios::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .header("content-type", "application/json")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    /// Defaults accumulated so far.
    defaults: ClientDefaults,
    /// Transport for the default HTTP dispatcher.
    transport: Option<HyperTransport>,
    /// Custom dispatcher, replacing the HTTP one entirely.
    dispatcher: Option<Arc<dyn Dispatch>>,
    /// First configuration error, reported by `build`.
    error: Option<Error>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("defaults", &self.defaults)
            .field("transport", &self.transport)
            .field("dispatcher", &self.dispatcher.is_some())
            .field("error", &self.error)
            .finish()
    }
}

impl ClientBuilder {
    /// Create a builder with empty defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of defaults.
    pub fn defaults(mut self, defaults: ClientDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the base URL relative request URLs resolve against.
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    /// Add a default header.
    ///
    /// An invalid name or value is reported by [`build`](Self::build).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match crate::headers::parse_pair(name, value) {
            Ok((name, value)) => {
                self.defaults.headers.insert(name, value);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Add every header in `headers`, replacing same-name defaults.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        crate::headers::overlay(&mut self.defaults.headers, headers);
        self
    }

    /// Set the default dispatch deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Set the default credential policy.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.defaults.credentials = Some(credentials);
        self
    }

    /// Set a default passthrough option.
    pub fn option<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.defaults.options.insert(key.into(), value);
        self
    }

    /// Use a pre-configured hyper transport.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use fexios::{Client, transport::HyperTransport};
    ///
    /// let transport = HyperTransport::builder().http2_only(true).build()?;
    /// let client = Client::builder().transport(transport).build()?;
    /// ```
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Send requests through a custom dispatcher instead of HTTP.
    ///
    /// Takes precedence over [`transport`](Self::transport).
    pub fn dispatcher<D: Dispatch>(mut self, dispatcher: D) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let dispatcher = match (self.dispatcher, self.transport) {
            (Some(dispatcher), _) => dispatcher,
            (None, Some(transport)) => Arc::new(HttpDispatcher::new(transport)),
            (None, None) => Arc::new(HttpDispatcher::new(HyperTransport::new()?)),
        };

        Ok(Client::from_parts(self.defaults, dispatcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestConfig;
    use crate::dispatch::dispatch_fn;
    use crate::response::{Body, ResponseEnvelope};
    use http::StatusCode;
    use serde_json::json;

    fn echo() -> impl Dispatch {
        dispatch_fn(|config: RequestConfig| async move {
            Ok(ResponseEnvelope::new(
                StatusCode::OK,
                HeaderMap::new(),
                Body::Json(json!({})),
                config,
            ))
        })
    }

    #[test]
    fn test_builder_collects_defaults() {
        let client = ClientBuilder::new()
            .base_url("https://api.example.com")
            .header("content-type", "application/json")
            .timeout(Duration::from_secs(5))
            .credentials(Credentials::SameOrigin)
            .option("cache", json!("no-store"))
            .dispatcher(echo())
            .build()
            .unwrap();

        let defaults = client.defaults();
        assert_eq!(defaults.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(defaults.headers.get("content-type").unwrap(), "application/json");
        assert_eq!(defaults.timeout, Some(Duration::from_secs(5)));
        assert_eq!(defaults.credentials, Some(Credentials::SameOrigin));
        assert_eq!(defaults.options["cache"], "no-store");
    }

    #[test]
    fn test_invalid_header_fails_build() {
        let result = ClientBuilder::new()
            .header("bad header", "value")
            .header("x-ok", "fine")
            .dispatcher(echo())
            .build();

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_headers_replace_by_name() {
        let mut extra = HeaderMap::new();
        extra.insert("x-env", "prod".parse().unwrap());

        let client = ClientBuilder::new()
            .header("x-env", "dev")
            .header("x-keep", "1")
            .headers(extra)
            .dispatcher(echo())
            .build()
            .unwrap();

        assert_eq!(client.defaults().headers.get("x-env").unwrap(), "prod");
        assert_eq!(client.defaults().headers.get("x-keep").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_custom_dispatcher_is_used() {
        let client = ClientBuilder::new()
            .base_url("https://api.example.com")
            .dispatcher(echo())
            .build()
            .unwrap();

        let res = client.get("/ping").await.unwrap();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.config.url, "/ping");
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn test_build_with_default_transport() {
        let client = ClientBuilder::new().build();
        assert!(client.is_ok());
    }
}
