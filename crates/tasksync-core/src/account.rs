//! Per-account composition root.
//!
//! An [`AccountController`] owns the invocation engine and the sync relay
//! for one account. Construction reads the TLS settings once via a `show`
//! invocation; if `taskd.server` is configured the relay listener starts
//! immediately and runs for the controller's lifetime.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constants::{TASKD_CA, TASKD_CERTIFICATE, TASKD_KEY, TASKD_SERVER};
use crate::error::{Error, Result};
use crate::exec::observer::InvocationObserver;
use crate::exec::stream::{LineBuffer, LineSink, LogLines};
use crate::exec::{AccountPaths, Invoker};
use crate::relay::listener::{RelayListener, sync_socket_path};
use crate::report::{ReportInfo, parse_priorities};
use crate::settings::{PairSink, TlsSettings, load_settings};

/// Immutable per-account identity.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Account name, lower-cased.
    pub name: String,
    /// Private per-account directory (config file, data dir, sync socket).
    pub account_dir: PathBuf,
    /// Path to the external task executable.
    pub executable: PathBuf,
    /// Process-wide working directory for spawned children.
    pub files_dir: PathBuf,
}

impl AccountConfig {
    pub fn new(
        name: &str,
        account_dir: PathBuf,
        executable: PathBuf,
        files_dir: PathBuf,
    ) -> Self {
        Self {
            name: name.to_lowercase(),
            account_dir,
            executable,
            files_dir,
        }
    }
}

/// Composition root for one account.
pub struct AccountController {
    config: AccountConfig,
    invoker: Arc<Invoker>,
    relay: RelayListener,
}

impl AccountController {
    /// Create the controller and start the sync relay when configured.
    pub async fn new(config: AccountConfig) -> Self {
        let invoker = Arc::new(Invoker::new(AccountPaths {
            executable: config.executable.clone(),
            account_dir: config.account_dir.clone(),
            files_dir: config.files_dir.clone(),
        }));
        let relay = Self::open_relay(&config, &invoker).await;
        Self {
            config,
            invoker,
            relay,
        }
    }

    async fn open_relay(config: &AccountConfig, invoker: &Invoker) -> RelayListener {
        let map = load_settings(
            invoker,
            &[TASKD_CA, TASKD_CERTIFICATE, TASKD_KEY, TASKD_SERVER],
        )
        .await;
        debug!(settings = ?map, "Sync configuration");

        let settings = match TlsSettings::from_map(&map) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                info!(account = %config.name, "Sync not configured");
                return RelayListener::unconfigured();
            }
            Err(e) => {
                warn!(account = %config.name, error = %e, "Incomplete sync configuration");
                return RelayListener::unconfigured();
            }
        };

        let path = sync_socket_path(&config.account_dir, &config.name);
        match RelayListener::start(path, settings) {
            Ok(listener) => listener,
            Err(e) => {
                warn!(account = %config.name, error = %e, "Failed to open sync socket");
                RelayListener::unconfigured()
            }
        }
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// True when the relay listener reached its listening state.
    pub fn sync_configured(&self) -> bool {
        self.relay.is_listening()
    }

    /// Register an invocation observer (with late-subscriber catch-up).
    pub fn add_observer(&self, observer: Arc<dyn InvocationObserver>) {
        self.invoker.observers().add(observer);
    }

    /// True while an invocation is in flight.
    pub fn is_active(&self) -> bool {
        self.invoker.observers().is_active()
    }

    /// Run `sync` through the local relay socket.
    ///
    /// Fails fast with a configuration error when sync is unconfigured;
    /// otherwise a failure carries the aggregated stderr text.
    pub async fn sync(&self) -> Result<()> {
        let Some(socket) = self.relay.socket_path() else {
            return Err(Error::Config {
                message: format!("sync is not configured for account {}", self.config.name),
            });
        };
        let args = vec![
            format!("rc.taskd.socket={}", socket.display()),
            "sync".to_string(),
        ];
        self.run_expecting_success(args).await
    }

    /// Add a task from non-empty field expressions.
    pub async fn add(&self, fields: &[String]) -> Result<()> {
        let mut args = vec!["add".to_string()];
        args.extend(fields.iter().filter(|f| !f.is_empty()).cloned());
        self.run_expecting_success(args).await
    }

    /// Modify the task identified by `uuid` with non-empty field expressions.
    pub async fn modify(&self, uuid: &str, fields: &[String]) -> Result<()> {
        let mut args = vec![uuid.to_string(), "modify".to_string()];
        args.extend(fields.iter().filter(|f| !f.is_empty()).cloned());
        self.run_expecting_success(args).await
    }

    /// Mark the task identified by `uuid` done.
    pub async fn done(&self, uuid: &str) -> Result<()> {
        self.run_expecting_success(vec![uuid.to_string(), "done".to_string()])
            .await
    }

    /// Export tasks matching `query` as JSON values, one per stdout line.
    ///
    /// Query words are escaped so the task binary does not treat spaces and
    /// parentheses as filter syntax; non-JSON lines are logged and skipped.
    pub async fn export(&self, query: &str) -> Vec<Value> {
        let mut args = vec!["rc.json.array=off".to_string(), "export".to_string()];
        args.extend(
            query
                .split(' ')
                .filter(|w| !w.is_empty())
                .map(escape),
        );

        let sink = Arc::new(JsonLines::default());
        self.invoker
            .invoke(sink.clone(), Arc::new(LogLines::stderr()), &args)
            .await;
        let tasks = sink.take();
        debug!(query = %query, count = tasks.len(), "Exported tasks");
        tasks
    }

    /// Look up selected configuration values.
    pub async fn settings(&self, keys: &[&str]) -> HashMap<String, String> {
        load_settings(&self.invoker, keys).await
    }

    /// Every configuration pair `show` prints, in output order.
    pub async fn all_settings(&self) -> Vec<(String, String)> {
        let sink = Arc::new(PairSink::all());
        self.invoker
            .invoke(
                sink.clone(),
                Arc::new(LogLines::stderr()),
                &["show".to_string()],
            )
            .await;
        sink.pairs()
    }

    /// List available reports as `(name, description)` pairs.
    pub async fn reports(&self) -> Vec<(String, String)> {
        let sink = Arc::new(PairSink::all());
        self.invoker
            .invoke(
                sink.clone(),
                Arc::new(LogLines::stderr()),
                &["reports".to_string()],
            )
            .await;
        sink.pairs()
    }

    /// Metadata for one report, including configured priorities.
    pub async fn report_info(&self, name: &str) -> ReportInfo {
        let sink = Arc::new(PairSink::all());
        self.invoker
            .invoke(
                sink.clone(),
                Arc::new(LogLines::stderr()),
                &["show".to_string(), format!("report.{name}")],
            )
            .await;

        let mut info = ReportInfo::default();
        for (key, value) in sink.pairs() {
            info.absorb(&key, &value);
        }
        info.priorities = self.priorities().await;
        info
    }

    /// Configured priority values.
    pub async fn priorities(&self) -> Vec<String> {
        let sink = Arc::new(PairSink::all());
        self.invoker
            .invoke(
                sink.clone(),
                Arc::new(LogLines::stderr()),
                &["show".to_string(), "uda.priority.values".to_string()],
            )
            .await;
        sink.pairs()
            .iter()
            .flat_map(|(_, value)| parse_priorities(value))
            .collect()
    }

    async fn run_expecting_success(&self, args: Vec<String>) -> Result<()> {
        let out = Arc::new(LineBuffer::new());
        let err = Arc::new(LineBuffer::new());
        let ok = self.invoker.invoke(out.clone(), err.clone(), &args).await;
        debug!(ok, stdout = %out.text(), stderr = %err.text(), "Task invocation finished");
        if ok {
            Ok(())
        } else {
            Err(Error::Process { message: err.text() })
        }
    }
}

/// Sink parsing each non-empty stdout line as one JSON task.
#[derive(Default)]
struct JsonLines {
    tasks: Mutex<Vec<Value>>,
}

impl JsonLines {
    fn take(&self) -> Vec<Value> {
        std::mem::take(&mut self.tasks.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl LineSink for JsonLines {
    fn line(&self, line: &str) {
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(task) => self
                .tasks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(task),
            Err(e) => warn!(error = %e, line = %line, "Not a JSON task line"),
        }
    }
}

/// Escape filter-significant characters in one query word.
fn escape(word: &str) -> String {
    word.replace(' ', "\\ ")
        .replace('(', "\\(")
        .replace(')', "\\)")
}
