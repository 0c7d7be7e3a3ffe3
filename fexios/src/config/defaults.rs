//! Client-wide defaults.

use std::time::Duration;

use http::HeaderMap;
use serde_json::{Map, Value};

use super::Credentials;

/// Values every request issued by a client starts from.
///
/// The client copies these into an immutable, shared value at construction,
/// so later changes to the value the caller passed in cannot leak into
/// requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDefaults {
    /// Base URL used when a request does not carry its own.
    pub base_url: Option<String>,
    /// Headers sent with every request unless overridden by name.
    pub headers: HeaderMap,
    /// Default dispatch deadline.
    pub timeout: Option<Duration>,
    /// Default credential policy.
    pub credentials: Option<Credentials>,
    /// Default passthrough options.
    pub options: Map<String, Value>,
}

impl ClientDefaults {
    /// Defaults with only a base URL set.
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }
}
