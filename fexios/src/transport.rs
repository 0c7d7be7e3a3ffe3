//! Network transport for the default dispatcher.
//!
//! [`HyperTransport`] wraps hyper-util's pooled legacy client behind an
//! HTTPS-or-HTTP rustls connector and implements `tower::Service`, which is
//! all [`HttpDispatcher`](crate::HttpDispatcher) asks of a transport.
//!
//! TLS is feature-gated:
//!
//! - `tls` (default): `tls-ring` + `tls-native-roots`
//! - `tls-ring` / `tls-aws-lc`: crypto provider
//! - `tls-native-roots` / `tls-webpki-roots`: trusted roots

mod hyper;
mod tls;

pub use self::hyper::{HyperTransport, HyperTransportBuilder, RequestBody};
pub use tls::{default_tls_config, has_tls_support, insecure_tls_config};

pub use rustls::ClientConfig as TlsClientConfig;
