//! rustls configuration for the HTTPS connector.
//!
//! A client config needs a crypto provider and a set of trusted roots:
//!
//! - provider: `tls-ring` wins over `tls-aws-lc`; with neither feature the
//!   process-wide default installed through `CryptoProvider::install_default`
//!   is used
//! - roots: `tls-native-roots` loads the platform store, `tls-webpki-roots`
//!   adds the bundled Mozilla set; both may be enabled at once

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::Error;

/// True when the enabled features provide both a crypto provider and roots.
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

fn crypto_provider() -> Result<Arc<CryptoProvider>, Error> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = CryptoProvider::get_default().cloned();

    provider.ok_or_else(|| {
        Error::Transport(
            "no TLS crypto provider: enable `tls-ring` or `tls-aws-lc`, \
             or install a process-wide default provider"
                .to_string(),
        )
    })
}

fn config_builder(
    provider: Arc<CryptoProvider>,
) -> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, Error> {
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Transport(format!("unusable TLS crypto provider: {}", e)))
}

#[allow(unused_mut)]
fn root_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let loaded = rustls_native_certs::load_native_certs();
        #[cfg(feature = "tracing")]
        {
            for err in &loaded.errors {
                tracing::debug!(error = %err, "skipping unreadable native root certificates");
            }
        }
        let (_added, _ignored) = roots.add_parsable_certificates(loaded.certs);
        #[cfg(feature = "tracing")]
        tracing::debug!(added = _added, ignored = _ignored, "loaded native root certificates");
    }

    #[cfg(feature = "tls-webpki-roots")]
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    roots
}

/// Client config that verifies servers against the feature-selected roots.
///
/// # Errors
///
/// Fails when no crypto provider is available or no root certificate
/// feature is enabled.
pub fn default_tls_config() -> Result<ClientConfig, Error> {
    if !cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots")) {
        return Err(Error::Transport(
            "no root certificates: enable `tls-native-roots` or `tls-webpki-roots`, \
             or pass a custom TLS config"
                .to_string(),
        ));
    }

    Ok(config_builder(crypto_provider()?)?
        .with_root_certificates(root_store())
        .with_no_client_auth())
}

/// Client config that accepts any server certificate.
///
/// Handshake signatures are still checked with the provider's algorithms;
/// only the certificate chain and host name are not. For local development
/// against self-signed servers.
pub fn insecure_tls_config() -> Result<ClientConfig, Error> {
    let provider = crypto_provider()?;
    Ok(config_builder(provider.clone())?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipCertVerification { provider }))
        .with_no_client_auth())
}

#[derive(Debug)]
struct SkipCertVerification {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for SkipCertVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
