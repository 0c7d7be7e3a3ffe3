//! Client-side error types.
//!
//! This module provides [`Error`], the single rejection type that flows through
//! the interceptor chain. Every failure kind (transport, status, interceptor,
//! serialization) travels on the same channel so that any later `on_rejected`
//! handler can inspect and recover it.

use std::time::Duration;

use http::StatusCode;

use crate::response::ResponseEnvelope;

/// Boxed error used for failures raised by user handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error variants produced by the client and its interceptor chain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network-level failure before any HTTP status exists (DNS, connect, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The dispatch did not complete within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-2xx status. Carries the full envelope.
    #[error("HTTP status {}", .0.status)]
    Status(Box<ResponseEnvelope>),

    /// A request or response handler failed.
    #[error("interceptor failed: {0}")]
    Interceptor(#[source] BoxError),

    /// JSON encoding of the request data or decoding of a JSON response failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The configuration could not be turned into an HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Wrap an arbitrary error (or message) raised inside a handler.
    ///
    /// ```
    /// use fexios::Error;
    ///
    /// let err = Error::interceptor("token expired");
    /// assert_eq!(err.to_string(), "interceptor failed: token expired");
    /// ```
    pub fn interceptor<E: Into<BoxError>>(err: E) -> Self {
        Error::Interceptor(err.into())
    }

    /// True for connection-level failures, including timeouts.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }

    /// True when the dispatch exceeded its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// True when the server answered with a non-2xx status.
    pub fn is_status(&self) -> bool {
        matches!(self, Error::Status(_))
    }

    /// The HTTP status of a failed response, if this is a status error.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|res| res.status)
    }

    /// Borrow the envelope carried by a status error.
    pub fn response(&self) -> Option<&ResponseEnvelope> {
        match self {
            Error::Status(res) => Some(&**res),
            _ => None,
        }
    }

    /// Take the envelope out of a status error.
    ///
    /// Returns the original error unchanged when it carries no envelope.
    pub fn into_response(self) -> Result<ResponseEnvelope, Error> {
        match self {
            Error::Status(res) => Ok(*res),
            other => Err(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
