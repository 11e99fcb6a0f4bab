//! One local-to-remote sync bridge.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UnixStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::relay::frame::relay_frame;
use crate::relay::tls::{build_connector, parse_server, server_name};
use crate::settings::TlsSettings;

/// Bridges one accepted local connection to the remote taskd endpoint.
///
/// The sync protocol is a strict single exchange: one framed request from
/// the local side, then one framed response back. The session performs
/// exactly that and closes both ends; it never overlaps the directions.
pub struct RelaySession {
    settings: Arc<TlsSettings>,
}

impl RelaySession {
    pub fn new(settings: Arc<TlsSettings>) -> Self {
        Self { settings }
    }

    /// Run the session to completion.
    ///
    /// Failures are logged and swallowed: the relay has no channel back to
    /// the caller, who only observes a failed or hanging sync invocation.
    pub async fn run(self, local: UnixStream) {
        if let Err(e) = self.relay(local).await {
            warn!(error = %e, "Relay session failed");
        }
    }

    async fn relay(&self, local: UnixStream) -> Result<()> {
        let (host, port) = parse_server(&self.settings.server)?;
        let connector = build_connector(&self.settings)?;

        debug!(host = %host, port, "Connecting to sync server");
        let tcp = TcpStream::connect((host.as_str(), port)).await?;
        let remote = connector
            .connect(server_name(&host)?, tcp)
            .await
            .map_err(|e| Error::Tls {
                message: format!("handshake with {host}:{port} failed: {e}"),
            })?;

        // On any early return both streams are dropped, which closes them;
        // the explicit shutdowns below only flush the clean path.
        let (mut local_read, mut local_write) = local.into_split();
        let (mut remote_read, mut remote_write) = tokio::io::split(remote);

        let sent = relay_frame(&mut local_read, &mut remote_write).await?;
        let received = relay_frame(&mut remote_read, &mut local_write).await?;
        info!(sent, received, "Sync exchange complete");

        let _ = remote_write.shutdown().await;
        let _ = local_write.shutdown().await;
        Ok(())
    }
}
