//! Mutual-TLS client configuration for relay sessions.
//!
//! Certificates and keys are PEM files located by the `taskd.*` settings:
//! the CA bundle verifies the server, the client certificate/key pair
//! authenticates us to it.

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};
use crate::settings::TlsSettings;

/// Split a `taskd.server` value into host and port.
///
/// The port is the substring after the last colon, so IPv6 hosts with
/// embedded colons work; surrounding brackets are stripped from the host.
pub fn parse_server(server: &str) -> Result<(String, u16)> {
    let Some(idx) = server.rfind(':') else {
        return Err(Error::Config {
            message: format!("taskd.server has no port: {server}"),
        });
    };
    let port = server[idx + 1..].parse::<u16>().map_err(|_| Error::Config {
        message: format!("taskd.server has an invalid port: {server}"),
    })?;
    let host = server[..idx]
        .trim_start_matches('[')
        .trim_end_matches(']');
    if host.is_empty() {
        return Err(Error::Config {
            message: format!("taskd.server has no host: {server}"),
        });
    }
    Ok((host.to_string(), port))
}

/// Load a certificate chain from a PEM file.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let pem = std::fs::read(path).map_err(|e| Error::Tls {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let mut reader = std::io::BufReader::new(pem.as_slice());

    let mut certs = Vec::new();
    for cert in rustls_pemfile::certs(&mut reader) {
        certs.push(cert.map_err(|e| Error::Tls {
            message: format!("failed to parse certificate in {}: {e}", path.display()),
        })?);
    }
    if certs.is_empty() {
        return Err(Error::Tls {
            message: format!("no certificates found in {}", path.display()),
        });
    }
    Ok(certs)
}

/// Load a private key from a PEM file, trying PKCS8 then PKCS1.
fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let pem = std::fs::read(path).map_err(|e| Error::Tls {
        message: format!("failed to read {}: {e}", path.display()),
    })?;

    let mut reader = std::io::BufReader::new(pem.as_slice());
    for key in rustls_pemfile::pkcs8_private_keys(&mut reader).flatten() {
        return Ok(PrivateKeyDer::from(key));
    }

    let mut reader = std::io::BufReader::new(pem.as_slice());
    for key in rustls_pemfile::rsa_private_keys(&mut reader).flatten() {
        return Ok(PrivateKeyDer::from(key));
    }

    Err(Error::Tls {
        message: format!("no private key found in {}", path.display()),
    })
}

/// Build a TLS connector from the settings snapshot: server verification
/// against the configured CA plus client-certificate authentication.
pub fn build_connector(settings: &TlsSettings) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&settings.ca)? {
        roots.add(cert).map_err(|e| Error::Tls {
            message: format!("invalid CA certificate in {}: {e}", settings.ca.display()),
        })?;
    }

    let certs = load_certs(&settings.certificate)?;
    let key = load_key(&settings.key)?;

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| Error::Tls {
            message: format!("invalid client certificate/key pair: {e}"),
        })?;

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Resolve the TLS server name used for the handshake.
pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_string()).map_err(|e| Error::Tls {
        message: format!("invalid server name {host}: {e}"),
    })
}
