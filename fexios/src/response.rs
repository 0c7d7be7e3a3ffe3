//! Response types.
//!
//! This module provides [`ResponseEnvelope`], the structured result of a
//! completed network call, and [`Body`], which couples the payload shape to
//! the response kind: a JSON response carries the decoded value, anything
//! else carries the raw, unconsumed transport body.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Error;
use crate::config::RequestConfig;

/// Which decoding the dispatcher applied to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// The body was declared as JSON and has been decoded.
    Json,
    /// The body was left untouched.
    Other,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Json => "json",
            ResponseKind::Other => "other",
        }
    }
}

/// Response payload as produced by dispatch.
#[derive(Debug)]
pub enum Body {
    /// Decoded JSON payload.
    Json(Value),
    /// Raw transport body, not yet read.
    Other(RawBody),
}

impl Body {
    /// The kind this payload corresponds to.
    pub fn kind(&self) -> ResponseKind {
        match self {
            Body::Json(_) => ResponseKind::Json,
            Body::Other(_) => ResponseKind::Other,
        }
    }

    /// Borrow the decoded JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Other(_) => None,
        }
    }
}

/// An unread response body.
///
/// Reading consumes it, like the body of a fetch `Response`.
pub struct RawBody {
    inner: BoxBody<Bytes, Error>,
}

impl RawBody {
    /// Wrap any body whose chunks are `Bytes`.
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<crate::BoxError>,
    {
        let inner = body
            .map_err(|e| Error::Transport(format!("failed to read response body: {}", e.into())))
            .boxed();
        Self { inner }
    }

    /// A body holding the given bytes.
    pub fn from_bytes<B: Into<Bytes>>(bytes: B) -> Self {
        Self::new(http_body_util::Full::new(bytes.into()))
    }

    /// Read the whole body.
    pub async fn bytes(self) -> Result<Bytes, Error> {
        Ok(self.inner.collect().await?.to_bytes())
    }

    /// Read the whole body as UTF-8 text.
    pub async fn text(self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Serialization(format!("response body is not UTF-8: {}", e)))
    }

    /// Read the whole body and decode it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Unwrap the boxed body.
    pub fn into_inner(self) -> BoxBody<Bytes, Error> {
        self.inner
    }
}

impl std::fmt::Debug for RawBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBody")
            .field("size_hint", &http_body::Body::size_hint(&self.inner))
            .finish()
    }
}

/// The structured result of a completed network call.
///
/// Created once by dispatch; response interceptors replace it by returning a
/// new value. `D` is the payload type: [`Body`] inside the chain, any
/// deserialized type after [`json`](Self::json).
///
/// # Example
///
/// ```ignore
/// let res = client.get("/users/1").await?;
/// assert_eq!(res.status, 200);
///
/// let user: ResponseEnvelope<User> = res.json().await?;
/// println!("{}", user.data.name);
/// ```
#[derive(Debug)]
pub struct ResponseEnvelope<D = Body> {
    /// HTTP status.
    pub status: StatusCode,
    /// Canonical reason phrase for the status (empty when unknown).
    pub status_text: String,
    /// Response headers, one value per name.
    pub headers: HeaderMap,
    /// Payload.
    pub data: D,
    /// The config that was dispatched.
    pub config: RequestConfig,
}

impl ResponseEnvelope {
    /// Build an envelope, deriving `status_text` from the status.
    pub fn new(status: StatusCode, headers: HeaderMap, data: Body, config: RequestConfig) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            data,
            config,
        }
    }

    /// How the payload was decoded.
    pub fn kind(&self) -> ResponseKind {
        self.data.kind()
    }

    /// Deserialize the payload into `T`.
    ///
    /// JSON payloads convert from the decoded value; raw payloads are read
    /// and parsed as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<ResponseEnvelope<T>, Error> {
        let (envelope, body) = self.split();
        let data = match body {
            Body::Json(value) => serde_json::from_value(value)?,
            Body::Other(raw) => raw.json().await?,
        };
        Ok(envelope.map(|_| data))
    }

    /// Read the payload as text.
    ///
    /// JSON payloads are re-serialized.
    pub async fn text(self) -> Result<ResponseEnvelope<String>, Error> {
        let (envelope, body) = self.split();
        let text = match body {
            Body::Json(value) => value.to_string(),
            Body::Other(raw) => raw.text().await?,
        };
        Ok(envelope.map(|_| text))
    }

    fn split(self) -> (ResponseEnvelope<()>, Body) {
        let ResponseEnvelope {
            status,
            status_text,
            headers,
            data,
            config,
        } = self;
        let envelope = ResponseEnvelope {
            status,
            status_text,
            headers,
            data: (),
            config,
        };
        (envelope, data)
    }
}

impl<D> ResponseEnvelope<D> {
    /// True when the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Transform the payload, keeping status, headers and config.
    pub fn map<U, F>(self, f: F) -> ResponseEnvelope<U>
    where
        F: FnOnce(D) -> U,
    {
        ResponseEnvelope {
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            data: f(self.data),
            config: self.config,
        }
    }

    /// Extract the payload, discarding everything else.
    pub fn into_data(self) -> D {
        self.data
    }
}
