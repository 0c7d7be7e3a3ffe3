//! Fetch-style HTTP client with interceptor chains.
//!
//! Every request flows through an ordered chain of stages:
//!
//! 1. the registered request interceptors, in registration order
//! 2. dispatch, which performs the network call
//! 3. the registered response interceptors, in registration order
//!
//! Each stage receives either the previous stage's value or its error, and
//! an `on_rejected` handler anywhere downstream may recover an error into a
//! normal value.
//!
//! ## Example
//!
//! ```ignore
//! use fexios::{Client, Error, Handler, HeaderInterceptor};
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .header("content-type", "application/json")
//!     .build()?;
//!
//! // Tag every outgoing request
//! client.interceptors().request.use_handler(HeaderInterceptor::new("x-trace", "abc"));
//!
//! // Log every failure without swallowing it
//! client.interceptors().response.use_handler(
//!     Handler::new().on_rejected_sync(|err: Error| {
//!         eprintln!("request failed: {err}");
//!         Err(err)
//!     }),
//! );
//!
//! let res = client.get("/users/1").await?;
//! let user = res.json::<User>().await?.data;
//! ```
//!
//! ## Responses
//!
//! A response whose `Content-Type` contains `application/json` is decoded
//! into [`Body::Json`]; any other response keeps its unread body in
//! [`Body::Other`]. A non-2xx status rejects with [`Error::Status`], which
//! carries the full [`ResponseEnvelope`] so handlers can inspect or recover
//! it.
//!
//! ## Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` | `rustls`, `rustls-native-certs` |
//! | `tls-ring` / `tls-aws-lc` | Crypto provider | `rustls` |
//! | `tls-native-roots` / `tls-webpki-roots` | Root certificates | `rustls-native-certs` / `webpki-roots` |
//! | `tracing` (default) | Spans and events for each request | `tracing` |
//!
//! When `tracing` is enabled, each request runs inside an `http.request` span
//! carrying `method`, `url`, `request_stages` and `response_stages`.

mod builder;
mod client;
pub mod config;
mod dispatch;
mod error;
pub mod headers;
mod interceptor;
mod pipeline;
mod response;
pub mod transport;

pub use builder::ClientBuilder;
pub use client::{Client, ResponseFuture};
pub use config::{
    ClientDefaults, Credentials, RequestConfig, RequestOptions, deep_merge, merge_config,
    merge_defaults,
};
pub use dispatch::{Dispatch, DispatchFn, HttpDispatcher, build_request, dispatch_fn};
pub use error::{BoxError, Error};
pub use interceptor::{
    Handler, HandlerFuture, HeaderInterceptor, InterceptorId, InterceptorRegistry, Interceptors,
    Snapshot,
};
pub use pipeline::Pipeline;
pub use response::{Body, RawBody, ResponseEnvelope, ResponseKind};

// Re-export commonly used external types
pub use http::{HeaderMap, Method, StatusCode};
