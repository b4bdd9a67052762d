//! rustls client configuration for broker connections
//!
//! TLS 1.2 and 1.3 only, AES-256-GCM and ChaCha20-Poly1305 suites, P-384 and
//! P-256 key exchange. Server certificates are verified against the
//! configured CA bundle alone.

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::crypto::ring::{self, cipher_suite, kx_group};
use rustls::version::{TLS12, TLS13};
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use super::TlsFiles;
use crate::error::DeliveryError;

fn provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: vec![
            cipher_suite::TLS13_AES_256_GCM_SHA384,
            cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
            cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
            cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        ],
        kx_groups: vec![kx_group::SECP384R1, kx_group::SECP256R1],
        ..ring::default_provider()
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, DeliveryError> {
    let certs = CertificateDer::pem_file_iter(path)
        .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
        .map_err(|e| {
            DeliveryError::Tls(format!("failed to read certificates from {}: {e}", path.display()))
        })?;
    if certs.is_empty() {
        return Err(DeliveryError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, DeliveryError> {
    PrivateKeyDer::from_pem_file(path).map_err(|e| {
        DeliveryError::Tls(format!("failed to read private key from {}: {e}", path.display()))
    })
}

/// Build the client TLS configuration
pub fn client_config(files: &TlsFiles) -> Result<Arc<ClientConfig>, DeliveryError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&files.ca_cert)? {
        roots
            .add(cert)
            .map_err(|e| DeliveryError::Tls(format!("failed to parse CA certificate: {e}")))?;
    }

    let builder = ClientConfig::builder_with_provider(Arc::new(provider()))
        .with_protocol_versions(&[&TLS13, &TLS12])
        .map_err(|e| DeliveryError::Tls(e.to_string()))?
        .with_root_certificates(roots);

    let config = match &files.client {
        Some((cert, key)) => builder
            .with_client_auth_cert(load_certs(cert)?, load_key(key)?)
            .map_err(|e| DeliveryError::Tls(format!("failed to load client certificate: {e}")))?,
        None => builder.with_no_client_auth(),
    };

    Ok(Arc::new(config))
}
