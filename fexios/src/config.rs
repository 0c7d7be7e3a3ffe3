//! Configuration types for the client and for individual requests.
//!
//! This module contains:
//! - [`RequestConfig`]: Everything needed to issue one request
//! - [`RequestOptions`]: The body-less part of a request, used by verb shortcuts
//! - [`ClientDefaults`]: Client-wide values every request starts from
//! - [`merge_config`] / [`deep_merge`]: How defaults and per-call values combine

mod defaults;
mod merge;
mod request;

pub use defaults::ClientDefaults;
pub use merge::{deep_merge, merge_config, merge_defaults};
pub use request::{Credentials, RequestConfig, RequestOptions};
