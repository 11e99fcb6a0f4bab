//! tasksync-core: account execution and sync relay core for a taskwarrior
//! front-end.
//!
//! This crate provides:
//! - A serialized invocation engine for the external task binary with
//!   per-line capture of stdout and stderr
//! - Settings extraction from `task show` output
//! - A per-account local socket relay bridging the binary's sync traffic to
//!   the remote taskd server over mutual TLS
//! - Invocation lifecycle observers

pub mod account;
pub mod constants;
pub mod error;
pub mod exec;
pub mod logging;
pub mod relay;
pub mod report;
pub mod settings;

pub use account::{AccountConfig, AccountController};
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
