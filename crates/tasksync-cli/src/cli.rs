//! CLI argument parsing for the tasksync binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for tasksync_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => tasksync_core::LogFormat::Text,
            CliLogFormat::Json => tasksync_core::LogFormat::Json,
        }
    }
}

/// tasksync - taskwarrior account execution and sync relay.
#[derive(Debug, Parser)]
#[command(
    name = "tasksync",
    version,
    about = "tasksync - run taskwarrior commands for an account and relay sync over TLS"
)]
pub struct Cli {
    /// Account name (case-insensitive)
    #[arg(short = 'a', long = "account")]
    pub account: String,

    /// Root directory holding per-account data
    #[arg(short = 'r', long = "root", default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Path to the task executable
    #[arg(long = "task-bin", default_value = "task", value_name = "PATH")]
    pub task_bin: PathBuf,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text")]
    pub log_format: CliLogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a task from field expressions (description, project:..., due:...)
    Add {
        /// Field expressions, passed through to the task binary
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Modify the task with the given UUID
    Modify {
        uuid: String,
        /// Field expressions, passed through to the task binary
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Mark the task with the given UUID done
    Done { uuid: String },
    /// Export matching tasks as JSON, one object per line
    Export {
        /// Filter query, e.g. "status:pending project:home"
        #[arg(default_value = "")]
        query: String,
    },
    /// Synchronize with the configured sync server
    Sync,
    /// Show selected configuration values
    Settings {
        /// Keys to look up (all settings when omitted)
        keys: Vec<String>,
    },
    /// List available reports
    Reports,
    /// Show one report's columns, sort order and filter
    Report { name: String },
}

impl Cli {
    /// Private directory for the selected account under the root.
    pub fn account_dir(&self) -> PathBuf {
        self.root.join(self.account.to_lowercase())
    }
}

// =============================================================================
// Tests
// =============================================================================
