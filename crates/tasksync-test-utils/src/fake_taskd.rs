//! Minimal fake taskd server for relay tests.
//!
//! Accepts mutually-authenticated TLS connections; for each one it reads a
//! single length-prefixed request frame, records the payload, and answers
//! with a canned framed response.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use rustls::RootCertStore;
use rustls::server::WebPkiClientVerifier;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::debug;

use tasksync_core::relay::encode_frame;

use crate::certs::TestCa;

/// In-process stand-in for the remote sync server.
pub struct FakeTaskd {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
    accept_task: JoinHandle<()>,
}

impl FakeTaskd {
    /// Start the server on an ephemeral local port.
    ///
    /// Clients must present a certificate signed by `ca`; every request is
    /// answered with `response_payload` wrapped in a frame.
    pub async fn start(ca: &TestCa, response_payload: Vec<u8>) -> Self {
        let acceptor = tls_acceptor(ca);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake taskd");
        let addr = listener.local_addr().expect("fake taskd address");

        let requests: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((tcp, peer)) = listener.accept().await else {
                    break;
                };
                debug!(peer = %peer, "Fake taskd connection");
                let acceptor = acceptor.clone();
                let recorded = recorded.clone();
                let response = response_payload.clone();
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(tcp).await else {
                        return;
                    };

                    let mut head = [0u8; 4];
                    if tls.read_exact(&mut head).await.is_err() {
                        return;
                    }
                    let total = u32::from_be_bytes(head) as usize;
                    let mut payload = vec![0u8; total.saturating_sub(4)];
                    if tls.read_exact(&mut payload).await.is_err() {
                        return;
                    }
                    recorded.lock().expect("requests lock").push(payload);

                    let frame = encode_frame(&response);
                    let _ = tls.write_all(&frame).await;
                    let _ = tls.flush().await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        Self {
            addr,
            requests,
            accept_task,
        }
    }

    /// The bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Value suitable for the `taskd.server` setting.
    pub fn server_setting(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }

    /// Request payloads received so far, in arrival order.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for FakeTaskd {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

fn tls_acceptor(ca: &TestCa) -> TlsAcceptor {
    let mut roots = RootCertStore::empty();
    let mut reader = std::io::BufReader::new(ca.ca_pem.as_bytes());
    for cert in rustls_pemfile::certs(&mut reader) {
        roots
            .add(cert.expect("parse CA certificate"))
            .expect("add CA certificate");
    }
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .expect("client verifier");

    let mut reader = std::io::BufReader::new(ca.server_cert_pem.as_bytes());
    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<_, _>>()
        .expect("parse server certificate");
    let mut reader = std::io::BufReader::new(ca.server_key_pem.as_bytes());
    let key = rustls_pemfile::private_key(&mut reader)
        .expect("parse server key")
        .expect("server key present");

    let config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .expect("server TLS config");
    TlsAcceptor::from(Arc::new(config))
}
