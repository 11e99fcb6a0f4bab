//! End-to-end relay tests against a fake mutual-TLS sync server.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use tasksync_core::logging::init_test_logging;
use tasksync_core::relay::{RelayListener, encode_frame, sync_socket_path};
use tasksync_core::settings::TlsSettings;
use tasksync_test_utils::{FakeTaskd, TestCa};

fn settings_for(ca: &TestCa, dir: &std::path::Path, server: String) -> TlsSettings {
    let (ca_path, cert_path, key_path) = ca.write_client_files(dir);
    TlsSettings {
        ca: ca_path,
        certificate: cert_path,
        key: key_path,
        server,
    }
}

async fn read_frame(stream: &mut UnixStream) -> Vec<u8> {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.expect("frame header");
    let total = u32::from_be_bytes(head) as usize;
    let mut payload = vec![0u8; total - 4];
    stream.read_exact(&mut payload).await.expect("frame payload");
    payload
}

#[tokio::test(flavor = "multi_thread")]
async fn relays_one_request_and_one_response() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let ca = TestCa::generate();
    let server = FakeTaskd::start(&ca, vec![0x10, 0x20, 0x30]).await;

    let settings = settings_for(&ca, tmp.path(), server.server_setting());
    let socket = sync_socket_path(tmp.path(), "work");
    let _listener = RelayListener::start(socket.clone(), settings).unwrap();

    let mut conn = UnixStream::connect(&socket).await.expect("local connect");
    conn.write_all(&encode_frame(&[0xAA, 0xBB, 0xCC, 0xDD]))
        .await
        .unwrap();
    conn.flush().await.unwrap();

    let response = read_frame(&mut conn).await;
    assert_eq!(response, vec![0x10, 0x20, 0x30]);
    assert_eq!(server.requests(), vec![vec![0xAA, 0xBB, 0xCC, 0xDD]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_survives_multiple_sessions() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let ca = TestCa::generate();
    let server = FakeTaskd::start(&ca, vec![0x01]).await;

    let settings = settings_for(&ca, tmp.path(), server.server_setting());
    let socket = sync_socket_path(tmp.path(), "work");
    let _listener = RelayListener::start(socket.clone(), settings).unwrap();

    for i in 0..3u8 {
        let mut conn = UnixStream::connect(&socket).await.expect("local connect");
        conn.write_all(&encode_frame(&[i])).await.unwrap();
        conn.flush().await.unwrap();
        assert_eq!(read_frame(&mut conn).await, vec![0x01]);
    }

    assert_eq!(server.requests(), vec![vec![0], vec![1], vec![2]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn session_with_bad_credentials_closes_local_end() {
    init_test_logging();
    let tmp = tempfile::tempdir().unwrap();
    let ca = TestCa::generate();
    let server = FakeTaskd::start(&ca, vec![0x01]).await;

    // Certificate paths that do not exist: the session must abort and close
    // the local connection instead of hanging.
    let settings = TlsSettings {
        ca: tmp.path().join("missing-ca.pem"),
        certificate: tmp.path().join("missing-cert.pem"),
        key: tmp.path().join("missing-key.pem"),
        server: server.server_setting(),
    };
    let socket = sync_socket_path(tmp.path(), "work");
    let _listener = RelayListener::start(socket.clone(), settings).unwrap();

    let mut conn = UnixStream::connect(&socket).await.expect("local connect");
    conn.write_all(&encode_frame(&[0xAA])).await.unwrap();
    conn.flush().await.unwrap();

    let mut buf = [0u8; 16];
    let n = conn.read(&mut buf).await.expect("read after failure");
    assert_eq!(n, 0, "local end should see EOF");
    assert!(server.requests().is_empty());
}
