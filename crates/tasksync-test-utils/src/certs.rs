//! Generated certificates for mutual-TLS tests.

use std::path::{Path, PathBuf};

use rcgen::{BasicConstraints, CertificateParams, IsCa, Issuer, KeyPair};

/// A fresh CA plus server and client certificates signed by it, all PEM.
pub struct TestCa {
    pub ca_pem: String,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    pub client_cert_pem: String,
    pub client_key_pem: String,
}

impl TestCa {
    /// Generate a CA, a server certificate for `localhost`/`127.0.0.1` and
    /// a client certificate, both signed by the CA.
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().expect("generate CA key");
        let mut ca_params = CertificateParams::new(Vec::new()).expect("CA params");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).expect("self-sign CA");
        let ca_pem = ca_cert.pem();
        let issuer = Issuer::new(ca_params, ca_key);

        let server_key = KeyPair::generate().expect("generate server key");
        let server_cert = CertificateParams::new(vec![
            "localhost".to_string(),
            "127.0.0.1".to_string(),
        ])
        .expect("server params")
        .signed_by(&server_key, &issuer)
        .expect("sign server certificate");

        let client_key = KeyPair::generate().expect("generate client key");
        let client_cert = CertificateParams::new(vec!["client".to_string()])
            .expect("client params")
            .signed_by(&client_key, &issuer)
            .expect("sign client certificate");

        Self {
            ca_pem,
            server_cert_pem: server_cert.pem(),
            server_key_pem: server_key.serialize_pem(),
            client_cert_pem: client_cert.pem(),
            client_key_pem: client_key.serialize_pem(),
        }
    }

    /// Write the CA and client materials into `dir` and return the
    /// `(ca, certificate, key)` paths, the shape `taskd.*` settings expect.
    pub fn write_client_files(&self, dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        let ca = dir.join("ca.pem");
        let cert = dir.join("client.cert.pem");
        let key = dir.join("client.key.pem");
        std::fs::write(&ca, &self.ca_pem).expect("write ca.pem");
        std::fs::write(&cert, &self.client_cert_pem).expect("write client cert");
        std::fs::write(&key, &self.client_key_pem).expect("write client key");
        (ca, cert, key)
    }
}
