//! Per-account sync socket listener.
//!
//! The external task binary is pointed at a local socket it believes is the
//! taskd server; every connection accepted there is bridged to the real
//! remote endpoint by a [`RelaySession`].

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::SYNC_SOCKET_PREFIX;
use crate::error::Result;
use crate::relay::session::RelaySession;
use crate::settings::TlsSettings;

/// Path of the sync socket for `account` inside `dir`.
pub fn sync_socket_path(dir: &Path, account: &str) -> PathBuf {
    dir.join(format!("{SYNC_SOCKET_PREFIX}{}", account.to_lowercase()))
}

enum State {
    /// Sync is not configured; no socket exists and no loop runs.
    Unconfigured,
    /// Accept loop running on its own task.
    Listening {
        socket_path: PathBuf,
        settings: Arc<TlsSettings>,
        accept_task: JoinHandle<()>,
    },
}

/// Local listener feeding relay sessions for one account.
///
/// Stays `Unconfigured` for the controller's whole lifetime when
/// `taskd.server` is absent; otherwise listens until dropped. The socket
/// file is removed again on drop.
pub struct RelayListener {
    state: State,
}

impl RelayListener {
    /// Listener for an account without sync configuration.
    pub fn unconfigured() -> Self {
        Self {
            state: State::Unconfigured,
        }
    }

    /// Bind the local sync socket and start the accept loop.
    ///
    /// Must be called from within a tokio runtime. A stale socket file from
    /// a previous run is removed before binding; permissions are restricted
    /// to the current user.
    pub fn start(socket_path: PathBuf, settings: TlsSettings) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))?;

        let settings = Arc::new(settings);
        let accept_task = tokio::spawn(accept_loop(listener, settings.clone()));
        info!(
            path = %socket_path.display(),
            server = %settings.server,
            "Sync relay listening"
        );

        Ok(Self {
            state: State::Listening {
                socket_path,
                settings,
                accept_task,
            },
        })
    }

    /// True when the accept loop is running.
    pub fn is_listening(&self) -> bool {
        matches!(self.state, State::Listening { .. })
    }

    /// The bound socket path, when listening.
    pub fn socket_path(&self) -> Option<&Path> {
        match &self.state {
            State::Listening { socket_path, .. } => Some(socket_path),
            State::Unconfigured => None,
        }
    }

    /// The settings snapshot shared with sessions, when listening.
    pub fn settings(&self) -> Option<&Arc<TlsSettings>> {
        match &self.state {
            State::Listening { settings, .. } => Some(settings),
            State::Unconfigured => None,
        }
    }
}

impl Drop for RelayListener {
    fn drop(&mut self) {
        if let State::Listening {
            socket_path,
            accept_task,
            ..
        } = &self.state
        {
            accept_task.abort();
            let _ = std::fs::remove_file(socket_path);
        }
    }
}

/// Accept connections forever, spawning one session per connection.
///
/// The loop never waits for a session: each runs independently and is
/// self-terminating. Accept errors are logged and the loop continues.
async fn accept_loop(listener: UnixListener, settings: Arc<TlsSettings>) {
    loop {
        match listener.accept().await {
            Ok((conn, _addr)) => {
                debug!("New incoming sync connection");
                let session = RelaySession::new(settings.clone());
                tokio::spawn(session.run(conn));
            }
            Err(e) => warn!(error = %e, "Accept failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_settings() -> TlsSettings {
        TlsSettings {
            ca: "/tmp/ca.pem".into(),
            certificate: "/tmp/cert.pem".into(),
            key: "/tmp/key.pem".into(),
            server: "example.org:53589".into(),
        }
    }

    #[test]
    fn socket_path_lowercases_account() {
        let path = sync_socket_path(Path::new("/data"), "Work");
        assert_eq!(
            path,
            PathBuf::from(format!("/data/{SYNC_SOCKET_PREFIX}work"))
        );
    }

    #[test]
    fn unconfigured_listener_exposes_nothing() {
        let listener = RelayListener::unconfigured();
        assert!(!listener.is_listening());
        assert!(listener.socket_path().is_none());
        assert!(listener.settings().is_none());
    }

    #[tokio::test]
    async fn start_binds_and_drop_removes_socket() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sync_socket_path(tmp.path(), "test");

        {
            let listener = RelayListener::start(path.clone(), dummy_settings()).unwrap();
            assert!(listener.is_listening());
            assert!(path.exists());

            let perms = std::fs::metadata(&path).unwrap().permissions();
            assert_eq!(perms.mode() & 0o777, 0o600);
        }

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn start_replaces_stale_socket() {
        let tmp = tempfile::tempdir().unwrap();
        let path = sync_socket_path(tmp.path(), "test");
        std::fs::write(&path, b"stale").unwrap();

        let listener = RelayListener::start(path.clone(), dummy_settings()).unwrap();
        assert!(listener.is_listening());
    }
}
