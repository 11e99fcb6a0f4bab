//! Settings extraction from the task binary's `show` output.
//!
//! `task show` prints one `key<whitespace>value` pair per line; everything
//! else (headers, hints, blank lines) is silently ignored.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;
use tracing::debug;

use crate::constants::{TASKD_CA, TASKD_CERTIFICATE, TASKD_KEY, TASKD_SERVER};
use crate::error::{Error, Result};
use crate::exec::Invoker;
use crate::exec::stream::{LineSink, LogLines};

/// Matches `key<whitespace>value` settings lines.
static LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9._]+)\s+(\S.*)$").expect("settings line pattern"));

/// Split one settings output line into a trimmed key/value pair.
pub fn parse_settings_line(line: &str) -> Option<(&str, &str)> {
    let caps = LINE_PATTERN.captures(line)?;
    Some((
        caps.get(1)?.as_str().trim(),
        caps.get(2)?.as_str().trim(),
    ))
}

/// Line sink collecting key/value pairs from settings-style output.
///
/// With a key filter, only case-insensitive matches are kept and stored
/// under the requested spelling; without one, every pair is kept in output
/// order.
pub struct PairSink {
    wanted: Option<Vec<String>>,
    pairs: Mutex<Vec<(String, String)>>,
}

impl PairSink {
    /// Keep every key/value pair.
    pub fn all() -> Self {
        Self {
            wanted: None,
            pairs: Mutex::new(Vec::new()),
        }
    }

    /// Keep only the requested keys.
    pub fn filtered(keys: &[&str]) -> Self {
        Self {
            wanted: Some(keys.iter().map(|k| k.to_string()).collect()),
            pairs: Mutex::new(Vec::new()),
        }
    }

    /// The collected pairs, in output order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.pairs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LineSink for PairSink {
    fn line(&self, line: &str) {
        let Some((key, value)) = parse_settings_line(line) else {
            return;
        };
        let stored_key = match &self.wanted {
            None => key.to_string(),
            Some(wanted) => {
                match wanted.iter().find(|w| w.eq_ignore_ascii_case(key)) {
                    Some(found) => found.clone(),
                    None => return,
                }
            }
        };
        self.pairs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((stored_key, value.to_string()));
    }
}

/// Load selected settings keys via exactly one `show` invocation.
///
/// Best-effort: a failed invocation yields whatever pairs were captured
/// (usually none), matching the behavior of the underlying binary which
/// prints settings before reporting most errors.
pub async fn load_settings(invoker: &Invoker, keys: &[&str]) -> HashMap<String, String> {
    let sink = Arc::new(PairSink::filtered(keys));
    let ok = invoker
        .invoke(sink.clone(), Arc::new(LogLines::stderr()), &["show".into()])
        .await;
    debug!(ok, requested = ?keys, "Settings query finished");
    sink.pairs().into_iter().collect()
}

/// Read-only snapshot of the sync endpoint configuration.
///
/// Shared by every relay session started after the snapshot was taken.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    /// CA certificate bundle used to verify the server.
    pub ca: PathBuf,
    /// Client certificate presented for mutual authentication.
    pub certificate: PathBuf,
    /// Client private key.
    pub key: PathBuf,
    /// Remote endpoint as `host:port`.
    pub server: String,
}

impl TlsSettings {
    /// Build a snapshot from a settings map.
    ///
    /// Returns `Ok(None)` when `taskd.server` is absent (sync is simply not
    /// configured for the account) and an error when the server is set but
    /// any certificate path is missing.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Option<Self>> {
        let Some(server) = map.get(TASKD_SERVER) else {
            return Ok(None);
        };
        let path = |key: &str| -> Result<PathBuf> {
            map.get(key).map(PathBuf::from).ok_or_else(|| Error::Config {
                message: format!("{key} is not set"),
            })
        };
        Ok(Some(Self {
            ca: path(TASKD_CA)?,
            certificate: path(TASKD_CERTIFICATE)?,
            key: path(TASKD_KEY)?,
            server: server.clone(),
        }))
    }
}
