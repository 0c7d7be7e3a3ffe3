//! Per-request configuration.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::Error;

/// Credential policy forwarded with a request.
///
/// The bundled HTTP dispatcher does not manage cookies; the value is carried
/// through the chain so interceptors and custom dispatchers can act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials only to the origin of the base URL.
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// The full description of one request.
///
/// A config is built per call, merged with the client defaults, and then
/// handed from stage to stage through the request interceptors until it
/// reaches dispatch. Interceptors replace it by returning a new value.
///
/// `T` is the request payload type. The client serializes it to JSON at the
/// `request()` boundary, so everything inside the chain works with
/// `RequestConfig<Value>` (the default).
///
/// # Example
///
/// ```
/// use fexios::RequestConfig;
/// use std::time::Duration;
///
/// let config = RequestConfig::post("/users")
///     .header("x-request-id", "abc-123")
///     .timeout(Duration::from_secs(5))
///     .with_data(serde_json::json!({ "name": "ada" }));
///
/// assert_eq!(config.method, http::Method::POST);
/// assert!(config.data.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig<T = Value> {
    /// Target URL, absolute or relative to `base_url`.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    /// Base URL that a relative `url` is resolved against.
    pub base_url: Option<String>,
    /// Request payload. Serialized as JSON only when present.
    pub data: Option<T>,
    /// Deadline for the dispatch stage.
    pub timeout: Option<Duration>,
    /// Credential policy.
    pub credentials: Option<Credentials>,
    /// Free-form options for integrators, merged recursively with defaults.
    pub options: Map<String, Value>,
}

impl RequestConfig {
    /// Create a config with the given method and URL.
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HeaderMap::new(),
            base_url: None,
            data: None,
            timeout: None,
            credentials: None,
            options: Map::new(),
        }
    }

    pub fn get<S: Into<String>>(url: S) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post<S: Into<String>>(url: S) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put<S: Into<String>>(url: S) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch<S: Into<String>>(url: S) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete<S: Into<String>>(url: S) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Build a config from body-less options plus a fixed method and URL.
    pub fn from_options<S: Into<String>>(method: Method, url: S, options: RequestOptions) -> Self {
        Self {
            url: url.into(),
            method,
            headers: options.headers,
            base_url: options.base_url,
            data: None,
            timeout: options.timeout,
            credentials: options.credentials,
            options: options.options,
        }
    }
}

impl<T> RequestConfig<T> {
    /// Attach a payload, changing the payload type.
    pub fn with_data<U>(self, data: U) -> RequestConfig<U> {
        self.map_data(|_| Some(data))
    }

    /// Transform the payload, keeping every other field.
    pub fn map_data<U, F>(self, f: F) -> RequestConfig<U>
    where
        F: FnOnce(Option<T>) -> Option<U>,
    {
        RequestConfig {
            url: self.url,
            method: self.method,
            headers: self.headers,
            base_url: self.base_url,
            data: f(self.data),
            timeout: self.timeout,
            credentials: self.credentials,
            options: self.options,
        }
    }

    /// Set a header on this request.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Set a header on this request, returning an error if it is invalid.
    pub fn try_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = crate::headers::parse_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set the base URL for this request.
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the dispatch deadline for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the credential policy for this request.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set a passthrough option.
    pub fn option<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Resolve `url` against `base_url` using standard URL resolution.
    ///
    /// An absolute `url` ignores the base entirely. A relative `url` without
    /// a usable base is an error.
    pub fn resolved_url(&self) -> Result<Url, Error> {
        let base = self.base_url.as_deref().filter(|base| !base.is_empty());
        let resolved = match base {
            Some(base) => Url::parse(base)
                .and_then(|base| base.join(&self.url))
                .map_err(|e| {
                    Error::InvalidRequest(format!("cannot resolve {:?} against {:?}: {}", self.url, base, e))
                })?,
            None => Url::parse(&self.url)
                .map_err(|e| Error::InvalidRequest(format!("invalid url {:?}: {}", self.url, e)))?,
        };
        Ok(resolved)
    }
}

impl<T: Serialize> RequestConfig<T> {
    /// Serialize the payload to JSON, producing the config the chain works with.
    pub fn into_json(self) -> Result<RequestConfig<Value>, Error> {
        let data = self.data.as_ref().map(serde_json::to_value).transpose()?;
        Ok(self.map_data(|_| data))
    }
}

/// Body-less request options accepted by the verb shortcuts.
///
/// # Example
///
/// ```
/// use fexios::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::new()
///     .timeout(Duration::from_secs(5))
///     .header("authorization", "Bearer token123");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub credentials: Option<Credentials>,
    pub options: Map<String, Value>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Add a header, returning an error if it is invalid.
    pub fn try_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = crate::headers::parse_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn option<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relative_url_resolves_against_base() {
        let config = RequestConfig::get("/users/1").base_url("https://api.example.com");
        assert_eq!(
            config.resolved_url().unwrap().as_str(),
            "https://api.example.com/users/1"
        );
    }

    #[test]
    fn test_absolute_url_ignores_base() {
        let config = RequestConfig::get("https://other.example.org/ping")
            .base_url("https://api.example.com");
        assert_eq!(
            config.resolved_url().unwrap().as_str(),
            "https://other.example.org/ping"
        );
    }

    #[test]
    fn test_empty_base_is_ignored() {
        let config = RequestConfig::get("https://api.example.com/a").base_url("");
        assert_eq!(config.resolved_url().unwrap().as_str(), "https://api.example.com/a");
    }

    #[test]
    fn test_relative_url_without_base_fails() {
        let err = RequestConfig::get("/users/1").resolved_url().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_into_json_serializes_payload() {
        #[derive(Serialize)]
        struct NewUser {
            name: &'static str,
        }

        let config = RequestConfig::post("/users").with_data(NewUser { name: "ada" });
        let config = config.into_json().unwrap();
        assert_eq!(config.data, Some(json!({ "name": "ada" })));
        assert_eq!(config.method, Method::POST);
    }

    #[test]
    fn test_into_json_without_payload() {
        let config = RequestConfig::get("/users").into_json().unwrap();
        assert!(config.data.is_none());
    }

    #[test]
    fn test_from_options_keeps_fields() {
        let options = RequestOptions::new()
            .header("x-trace", "abc")
            .base_url("https://api.example.com")
            .timeout(Duration::from_secs(3))
            .credentials(Credentials::Include)
            .option("retry", json!({ "max": 2 }));

        let config = RequestConfig::from_options(Method::HEAD, "/health", options);
        assert_eq!(config.method, Method::HEAD);
        assert_eq!(config.headers.get("x-trace").unwrap(), "abc");
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.credentials, Some(Credentials::Include));
        assert_eq!(config.options["retry"]["max"], 2);
        assert!(config.data.is_none());
    }

    #[test]
    fn test_try_header_rejects_invalid_value() {
        let result = RequestConfig::get("/").try_header("x-bad", "line\nbreak");
        assert!(result.is_err());
    }

    #[test]
    fn test_extension_method_passes_through() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        let config = RequestConfig::new(purge.clone(), "/cache/key");
        assert_eq!(config.method, purge);
    }
}
