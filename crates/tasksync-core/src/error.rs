//! Error types for tasksync-core.

use thiserror::Error;

/// Main error type for account and relay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid account/sync configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// External executable failed (spawn failure or nonzero exit).
    #[error("process error: {message}")]
    Process { message: String },

    /// Certificate load or TLS handshake failure.
    #[error("tls error: {message}")]
    Tls { message: String },

    /// Malformed sync protocol data.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

/// Convenience result type for tasksync operations.
pub type Result<T> = std::result::Result<T, Error>;
