//! Process invocation engine for the external task executable.
//!
//! The engine drives the task binary serially: at most one invocation per
//! account is in flight at any time, because two concurrent runs would race
//! on the same on-disk task store. Observers are notified of start before
//! the child is spawned and of finish after the process and both stream
//! readers have completed, even when the invocation fails internally.

pub mod observer;
pub mod stream;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::constants::{DATA_DIR, ENV_TASKDATA, ENV_TASKRC, TASK_ARG_PREFIX, TASKRC_FILE};
use crate::error::{Error, Result};
use observer::ObserverSet;
use stream::{LineSink, spawn_line_reader};

/// Resolved filesystem locations for one account.
#[derive(Debug, Clone)]
pub struct AccountPaths {
    /// Path to the external task executable.
    pub executable: PathBuf,
    /// Private per-account directory holding the config file and data dir.
    pub account_dir: PathBuf,
    /// Process-wide working directory for spawned children.
    pub files_dir: PathBuf,
}

impl AccountPaths {
    /// The account's private taskwarrior config file.
    pub fn taskrc(&self) -> PathBuf {
        self.account_dir.join(TASKRC_FILE)
    }

    /// The account's private task data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.account_dir.join(DATA_DIR)
    }
}

/// Serialized driver for the external task executable.
pub struct Invoker {
    paths: AccountPaths,
    gate: Mutex<()>,
    observers: ObserverSet,
}

impl Invoker {
    pub fn new(paths: AccountPaths) -> Self {
        Self {
            paths,
            gate: Mutex::new(()),
            observers: ObserverSet::new(),
        }
    }

    pub fn paths(&self) -> &AccountPaths {
        &self.paths
    }

    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Run the executable with the fixed argument prefix plus `args`.
    ///
    /// stdout and stderr are decoded as UTF-8 lines into `out` and `err`.
    /// Returns true iff the process exited with code zero. Internal failures
    /// (bad configuration, spawn errors, stream errors) are logged and
    /// reported as `false`; this method never propagates an error.
    pub async fn invoke(
        &self,
        out: Arc<dyn LineSink>,
        err: Arc<dyn LineSink>,
        args: &[String],
    ) -> bool {
        let _guard = self.gate.lock().await;

        self.observers.begin();
        let result = self.run_child(out, err, args).await;
        let ok = match result {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "Failed to execute task");
                false
            }
        };
        self.observers.finish();
        ok
    }

    async fn run_child(
        &self,
        out: Arc<dyn LineSink>,
        err: Arc<dyn LineSink>,
        args: &[String],
    ) -> Result<bool> {
        // Bare executable names resolve via PATH at spawn time; only
        // explicit paths can be validated up front.
        if has_parent(&self.paths.executable) && !self.paths.executable.is_file() {
            return Err(Error::Config {
                message: format!(
                    "invalid executable: {}",
                    self.paths.executable.display()
                ),
            });
        }
        if !self.paths.account_dir.is_dir() {
            return Err(Error::Config {
                message: format!(
                    "invalid account directory: {}",
                    self.paths.account_dir.display()
                ),
            });
        }

        let mut cmd = Command::new(&self.paths.executable);
        cmd.args(TASK_ARG_PREFIX)
            .args(args)
            .current_dir(&self.paths.files_dir)
            .env(ENV_TASKRC, self.paths.taskrc())
            .env(ENV_TASKDATA, self.paths.data_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(args = ?args, dir = %self.paths.account_dir.display(), "Spawning task binary");
        let mut child = cmd.spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| Error::Process {
            message: "child stdout was not captured".into(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::Process {
            message: "child stderr was not captured".into(),
        })?;

        // Start both readers before waiting, then join them after the exit
        // status arrives so output buffered right up to exit is not lost.
        let out_reader = spawn_line_reader(stdout, out);
        let err_reader = spawn_line_reader(stderr, err);

        let status = child.wait().await?;
        let _ = out_reader.await;
        let _ = err_reader.await;

        debug!(code = ?status.code(), "Task binary exited");
        Ok(status.success())
    }
}

fn has_parent(path: &Path) -> bool {
    path.parent().is_some_and(|p| !p.as_os_str().is_empty())
}
