//! Engine subprocess plumbing: the child handle, its single write path,
//! and the background task that drains its output into a line buffer.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time;

use super::EngineConfig;
use crate::error::{Error, Result};

/// How long `shutdown` waits for the engine to honor `quit` before
/// force-killing it.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Outcome of waiting on the output buffer.
pub(crate) enum Wait {
    Line(String),
    /// The output stream closed; the process is gone.
    Eof,
    TimedOut,
}

/// A running engine process.
///
/// Owns the child, its stdin, and the receiving end of the line buffer.
/// A background task is the sole reader of the child's stdout; it trims
/// and forwards every line, and clears the liveness flag when the stream
/// closes. All methods take `&mut self`, so whoever holds the process
/// holds the only write path and the only buffer consumer.
pub(crate) struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    output: UnboundedReceiver<String>,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl EngineProcess {
    pub(crate) fn spawn(config: &EngineConfig) -> Result<Self> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Spawn(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn("failed to open stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn("failed to open stdout".into()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn({
            let alive = Arc::clone(&alive);
            async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let line = line.trim().to_string();
                    tracing::trace!("engine: {}", line);
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                alive.store(false, Ordering::Relaxed);
            }
        });

        Ok(EngineProcess {
            child,
            stdin,
            output: rx,
            alive,
            reader,
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Shared handle to the liveness flag, for state reads that must not
    /// wait on the session lock.
    pub(crate) fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }

    /// Sends one command line to the engine. The command and its newline
    /// go out in a single write so commands never interleave mid-line.
    pub(crate) async fn send(&mut self, cmd: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::ProcessNotRunning);
        }
        self.stdin.write_all(format!("{}\n", cmd).as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Pops the next buffered output line, waiting at most `wait`.
    pub(crate) async fn next_line(&mut self, wait: Duration) -> Wait {
        match time::timeout(wait, self.output.recv()).await {
            Ok(Some(line)) => Wait::Line(line),
            Ok(None) => Wait::Eof,
            Err(_) => Wait::TimedOut,
        }
    }

    /// Pops lines until one contains `marker`, bounded by `limit`.
    pub(crate) async fn wait_for(&mut self, marker: &str, limit: Duration) -> Wait {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Wait::TimedOut;
            }
            match self.next_line(remaining).await {
                Wait::Line(line) if line.contains(marker) => return Wait::Line(line),
                Wait::Line(_) => continue,
                other => return other,
            }
        }
    }

    /// Discards everything currently buffered. A session that timed out
    /// leaves its unread output behind; the next session must not read it.
    pub(crate) fn drain(&mut self) {
        while self.output.try_recv().is_ok() {}
    }

    /// Graceful teardown: ask the engine to quit, give it a moment, then
    /// make sure it is gone.
    pub(crate) async fn shutdown(mut self) {
        if self.is_alive() {
            let _ = self.send("quit").await;
            if time::timeout(EXIT_GRACE, self.child.wait()).await.is_err() {
                let _ = self.child.kill().await;
            }
        } else {
            let _ = self.child.kill().await;
        }
        let _ = self.reader.await;
    }

    /// Immediate teardown, used when the process misbehaved.
    pub(crate) async fn kill(mut self) {
        let _ = self.child.kill().await;
        let _ = self.reader.await;
    }
}
