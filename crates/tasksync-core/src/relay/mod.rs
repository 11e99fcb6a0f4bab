//! Sync relay: local socket listener, per-connection TLS sessions and the
//! length-prefixed frame codec between them.

pub mod frame;
pub mod listener;
pub mod session;
pub mod tls;

pub use frame::{encode_frame, relay_frame};
pub use listener::{RelayListener, sync_socket_path};
pub use session::RelaySession;
