//! Library surface of the tasksync CLI.

pub mod cli;

pub use cli::{Cli, CliLogFormat, Command};
