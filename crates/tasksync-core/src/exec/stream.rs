//! Line stream readers and sinks for captured child output.
//!
//! Each child stream gets its own reader task so stdout and stderr drain
//! concurrently and the child never blocks on a full pipe buffer.

use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receives complete UTF-8 lines decoded from a child process stream.
pub trait LineSink: Send + Sync {
    /// Called once per newline-terminated line, without the terminator.
    fn line(&self, line: &str);
}

/// Spawn a task that decodes `stream` as UTF-8 lines and feeds `sink`.
///
/// The task runs until end-of-stream or a read error; the underlying stream
/// is dropped (and so closed) when the task exits. The returned handle is
/// joinable so the invocation engine can wait for the last buffered output.
pub fn spawn_line_reader<R>(stream: R, sink: std::sync::Arc<dyn LineSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => sink.line(&line),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Error reading child stream");
                    break;
                }
            }
        }
    })
}

/// Aggregates lines into a single newline-joined string.
#[derive(Default)]
pub struct LineBuffer {
    text: Mutex<String>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The aggregated text captured so far.
    pub fn text(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LineSink for LineBuffer {
    fn line(&self, line: &str) {
        let mut text = self.text.lock().unwrap_or_else(|e| e.into_inner());
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(line);
    }
}

/// Routes lines to the log, for callers that do not need the text.
pub struct LogLines {
    as_warning: bool,
}

impl LogLines {
    /// Sink for child stdout, logged at debug level.
    pub fn stdout() -> Self {
        Self { as_warning: false }
    }

    /// Sink for child stderr, logged at warn level.
    pub fn stderr() -> Self {
        Self { as_warning: true }
    }
}

impl LineSink for LogLines {
    fn line(&self, line: &str) {
        if self.as_warning {
            warn!(line = %line, "task stderr");
        } else {
            debug!(line = %line, "task stdout");
        }
    }
}
