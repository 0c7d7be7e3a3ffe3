//! The fetch-style HTTP client.

use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use serde::Serialize;

use crate::Error;
use crate::builder::ClientBuilder;
use crate::config::{ClientDefaults, RequestConfig, RequestOptions, merge_config, merge_defaults};
use crate::dispatch::{Dispatch, HttpDispatcher};
use crate::interceptor::Interceptors;
use crate::pipeline::Pipeline;
use crate::response::ResponseEnvelope;
use crate::transport::HyperTransport;

/// Future returned by [`Client::request`] and the verb shortcuts.
pub type ResponseFuture = BoxFuture<'static, Result<ResponseEnvelope, Error>>;

/// HTTP client with request and response interceptor chains.
///
/// Each client owns its defaults and a pair of interceptor registries.
/// Cloning is cheap; clones share both.
///
/// Every call builds a fresh chain from snapshots of the registries taken
/// when the call is made, merges the call's config over the defaults, and
/// runs it to completion. Calls are independent of each other.
///
/// # Example
///
/// ```ignore
/// use fexios::{Client, HeaderInterceptor};
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .header("content-type", "application/json")
///     .build()?;
///
/// client.interceptors().request.use_handler(HeaderInterceptor::new("x-trace", "abc"));
///
/// let res = client.get("/users/1").await?;
/// println!("{} {:?}", res.status, res.data.as_json());
/// ```
#[derive(Clone)]
pub struct Client {
    /// Immutable snapshot of the defaults passed at construction.
    defaults: Arc<ClientDefaults>,
    /// Request and response registries.
    interceptors: Arc<Interceptors>,
    /// Performs the network call.
    dispatcher: Arc<dyn Dispatch>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.defaults)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client over the default hyper transport.
    ///
    /// Fails only if the transport cannot be built (for example, no TLS
    /// roots could be loaded).
    pub fn new(defaults: ClientDefaults) -> Result<Self, Error> {
        let transport = HyperTransport::new()?;
        Ok(Self::with_dispatcher(defaults, HttpDispatcher::new(transport)))
    }

    /// Create a client that sends requests through `dispatcher`.
    pub fn with_dispatcher<D: Dispatch>(defaults: ClientDefaults, dispatcher: D) -> Self {
        Self::from_parts(defaults, Arc::new(dispatcher))
    }

    pub(crate) fn from_parts(defaults: ClientDefaults, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            defaults: Arc::new(defaults),
            interceptors: Arc::new(Interceptors::new()),
            dispatcher,
        }
    }

    /// Create a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The defaults every call starts from.
    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// The request and response interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// Derive a client whose defaults are these defaults with `overrides`
    /// merged on top.
    ///
    /// The derived client shares the dispatcher but starts with empty
    /// interceptor registries.
    pub fn create(&self, overrides: ClientDefaults) -> Client {
        Self::from_parts(merge_defaults(&self.defaults, overrides), self.dispatcher.clone())
    }

    /// Prepare the chain for one call without running it.
    ///
    /// Serializes the payload, merges the defaults, and snapshots both
    /// registries. A payload that fails to serialize does not fail here: the
    /// pipeline starts rejected with [`Error::Serialization`], so the
    /// `on_rejected` handlers of both chains see it.
    pub fn pipeline<T: Serialize>(&self, config: RequestConfig<T>) -> Pipeline {
        let mut failure = None;
        let config = config.map_data(|data| match data.as_ref().map(serde_json::to_value).transpose() {
            Ok(value) => value,
            Err(err) => {
                failure = Some(Error::from(err));
                None
            }
        });

        let pipeline = Pipeline::new(
            merge_config(&self.defaults, config),
            self.interceptors.request.snapshot(),
            self.interceptors.response.snapshot(),
            self.dispatcher.clone(),
        );
        match failure {
            Some(err) => pipeline.rejected(err),
            None => pipeline,
        }
    }

    /// Issue a request.
    ///
    /// The chain is assembled before this returns: interceptors registered
    /// or ejected after the call do not affect it, even if the future has not
    /// been polled yet.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use fexios::RequestConfig;
    ///
    /// let res = client
    ///     .request(RequestConfig::post("/users").with_data(&new_user))
    ///     .await?;
    /// ```
    pub fn request<T: Serialize>(&self, config: RequestConfig<T>) -> ResponseFuture {
        Box::pin(self.pipeline(config).run())
    }

    /// Issue a body-less request with the given method.
    pub fn send(&self, method: Method, url: &str, options: RequestOptions) -> ResponseFuture {
        self.request(RequestConfig::from_options(method, url, options))
    }

    /// Issue a request with the given method and JSON payload.
    pub fn send_with_data<T: Serialize>(
        &self,
        method: Method,
        url: &str,
        data: Option<&T>,
        options: RequestOptions,
    ) -> ResponseFuture {
        let config = RequestConfig::from_options(method, url, options).map_data(|_| data);
        self.request(config)
    }

    pub fn get(&self, url: &str) -> ResponseFuture {
        self.send(Method::GET, url, RequestOptions::default())
    }

    pub fn get_with_options(&self, url: &str, options: RequestOptions) -> ResponseFuture {
        self.send(Method::GET, url, options)
    }

    pub fn head(&self, url: &str) -> ResponseFuture {
        self.send(Method::HEAD, url, RequestOptions::default())
    }

    pub fn head_with_options(&self, url: &str, options: RequestOptions) -> ResponseFuture {
        self.send(Method::HEAD, url, options)
    }

    pub fn options(&self, url: &str) -> ResponseFuture {
        self.send(Method::OPTIONS, url, RequestOptions::default())
    }

    pub fn options_with_options(&self, url: &str, options: RequestOptions) -> ResponseFuture {
        self.send(Method::OPTIONS, url, options)
    }

    pub fn delete(&self, url: &str) -> ResponseFuture {
        self.send(Method::DELETE, url, RequestOptions::default())
    }

    pub fn delete_with_options(&self, url: &str, options: RequestOptions) -> ResponseFuture {
        self.send(Method::DELETE, url, options)
    }

    pub fn post<T: Serialize>(&self, url: &str, data: &T) -> ResponseFuture {
        self.send_with_data(Method::POST, url, Some(data), RequestOptions::default())
    }

    pub fn post_with_options<T: Serialize>(
        &self,
        url: &str,
        data: Option<&T>,
        options: RequestOptions,
    ) -> ResponseFuture {
        self.send_with_data(Method::POST, url, data, options)
    }

    pub fn put<T: Serialize>(&self, url: &str, data: &T) -> ResponseFuture {
        self.send_with_data(Method::PUT, url, Some(data), RequestOptions::default())
    }

    pub fn put_with_options<T: Serialize>(
        &self,
        url: &str,
        data: Option<&T>,
        options: RequestOptions,
    ) -> ResponseFuture {
        self.send_with_data(Method::PUT, url, data, options)
    }

    pub fn patch<T: Serialize>(&self, url: &str, data: &T) -> ResponseFuture {
        self.send_with_data(Method::PATCH, url, Some(data), RequestOptions::default())
    }

    pub fn patch_with_options<T: Serialize>(
        &self,
        url: &str,
        data: Option<&T>,
        options: RequestOptions,
    ) -> ResponseFuture {
        self.send_with_data(Method::PATCH, url, data, options)
    }
}
