//! The dispatch stage: turning an effective config into a response envelope.
//!
//! [`Dispatch`] is the seam between the pipeline and the network. The bundled
//! [`HttpDispatcher`] drives any tower [`Service`] that speaks
//! `http::Request`/`http::Response` ([`HyperTransport`] by default), and
//! [`dispatch_fn`] adapts a plain async closure, which is handy for tests and
//! for in-process backends.
//!
//! A completed call becomes a [`ResponseEnvelope`]:
//! - a `Content-Type` containing `application/json` decodes the body into
//!   [`Body::Json`]; anything else keeps the unread body as [`Body::Other`]
//! - headers are flattened to one value per name
//! - a non-2xx status fails the dispatch with [`Error::Status`] carrying the
//!   whole envelope

use std::future::Future;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::{BodyExt, Full};
use tower::{Service, ServiceExt};

use crate::config::RequestConfig;
use crate::response::{Body, RawBody, ResponseEnvelope};
use crate::transport::{HyperTransport, RequestBody};
use crate::{BoxError, Error, headers};

/// Performs the network call for one effective config.
pub trait Dispatch: Send + Sync + 'static {
    /// Send the request described by `config`.
    ///
    /// Fails with a transport error when no response arrives, and with
    /// [`Error::Status`] when the response status is not 2xx.
    fn dispatch(&self, config: RequestConfig) -> BoxFuture<'static, Result<ResponseEnvelope, Error>>;
}

/// Dispatcher backed by a tower HTTP service.
#[derive(Debug, Clone)]
pub struct HttpDispatcher<S = HyperTransport> {
    service: S,
}

impl<S> HttpDispatcher<S> {
    /// Wrap an HTTP service.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Borrow the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }
}

impl<S, B> Dispatch for HttpDispatcher<S>
where
    S: Service<http::Request<RequestBody>, Response = http::Response<B>, Error = Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    fn dispatch(&self, config: RequestConfig) -> BoxFuture<'static, Result<ResponseEnvelope, Error>> {
        let service = self.service.clone();
        Box::pin(async move {
            let request = build_request(&config)?;
            let deadline = config.timeout;

            let exchange = async move {
                let response = service.oneshot(request).await?;
                into_envelope(response, config).await
            };

            let envelope = match deadline {
                Some(limit) => tokio::time::timeout(limit, exchange)
                    .await
                    .map_err(|_| Error::Timeout(limit))??,
                None => exchange.await?,
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                status = %envelope.status,
                kind = envelope.kind().as_str(),
                "response received"
            );

            if envelope.is_success() {
                Ok(envelope)
            } else {
                Err(Error::Status(Box::new(envelope)))
            }
        })
    }
}

/// Build the HTTP request for an effective config.
///
/// The body is serialized only when `data` is present and not `null`; a JSON
/// content type is added in that case unless the config already sets one.
pub fn build_request(config: &RequestConfig) -> Result<http::Request<RequestBody>, Error> {
    let url = config.resolved_url()?;

    let mut headers = config.headers.clone();
    let body = match config.data.as_ref().filter(|data| !data.is_null()) {
        Some(data) => {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Bytes::from(serde_json::to_vec(data)?)
        }
        None => Bytes::new(),
    };

    let mut request = http::Request::builder()
        .method(config.method.clone())
        .uri(url.as_str())
        .body(Full::new(body))
        .map_err(|e| Error::InvalidRequest(format!("failed to build request: {}", e)))?;
    *request.headers_mut() = headers;
    Ok(request)
}

/// Shape a received response into an envelope, whatever its status.
async fn into_envelope<B>(response: http::Response<B>, config: RequestConfig) -> Result<ResponseEnvelope, Error>
where
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = response.into_parts();
    let headers = headers::flatten(&parts.headers);

    let data = if is_json(&headers) {
        let bytes = body
            .collect()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response body: {}", e.into())))?
            .to_bytes();
        // Bodiless JSON responses (HEAD, 204) decode to null.
        if bytes.is_empty() {
            Body::Json(serde_json::Value::Null)
        } else {
            Body::Json(serde_json::from_slice(&bytes)?)
        }
    } else {
        Body::Other(RawBody::new(body))
    };

    Ok(ResponseEnvelope::new(parts.status, headers, data, config))
}

fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

/// Dispatcher built from an async closure. See [`dispatch_fn`].
#[derive(Clone)]
pub struct DispatchFn<F> {
    f: F,
}

/// Create a dispatcher from an async closure.
///
/// # Example
///
/// ```
/// use fexios::{dispatch_fn, Body, ClientDefaults, Client, ResponseEnvelope};
/// use http::{HeaderMap, StatusCode};
///
/// let offline = dispatch_fn(|config| async move {
///     Ok(ResponseEnvelope::new(StatusCode::OK, HeaderMap::new(), Body::Json(serde_json::json!({})), config))
/// });
/// let client = Client::with_dispatcher(ClientDefaults::default(), offline);
/// ```
pub fn dispatch_fn<F, Fut>(f: F) -> DispatchFn<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseEnvelope, Error>> + Send + 'static,
{
    DispatchFn { f }
}

impl<F, Fut> Dispatch for DispatchFn<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseEnvelope, Error>> + Send + 'static,
{
    fn dispatch(&self, config: RequestConfig) -> BoxFuture<'static, Result<ResponseEnvelope, Error>> {
        Box::pin((self.f)(config))
    }
}

impl<F> std::fmt::Debug for DispatchFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchFn").finish()
    }
}
