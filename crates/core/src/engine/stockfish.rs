//! Stockfish engine supervisor
//!
//! Owns the one engine process, performs the UCI handshake, and
//! serializes concurrent analysis callers onto its stdin/stdout stream.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::analysis::{parse_bestmove, parse_info_line, AnalysisRequest, AnalysisResult};
use super::process::{EngineProcess, Wait};
use super::{EngineConfig, EngineState};
use crate::error::{Error, Result};

/// Observable lifecycle state plus the liveness flag of the current
/// process, readable without waiting on the session lock.
struct Status {
    state: EngineState,
    alive: Option<Arc<AtomicBool>>,
}

/// Supervisor for a single Stockfish process.
///
/// All lifecycle operations and analysis exchanges go through here; the
/// raw process handle is never exposed.
pub struct StockfishEngine {
    config: EngineConfig,
    status: StdMutex<Status>,
    /// The session lock. Whoever holds it owns the process streams and
    /// the output buffer; waiters are queued in arrival order. The UCI
    /// protocol carries no request identifiers, so this lock is what
    /// keeps concurrent callers from reading each other's results.
    session: Mutex<Option<EngineProcess>>,
}

impl StockfishEngine {
    pub fn new(config: EngineConfig) -> Self {
        StockfishEngine {
            config,
            status: StdMutex::new(Status {
                state: EngineState::Stopped,
                alive: None,
            }),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state.
    ///
    /// A process that has died since the last operation reports
    /// `Stopped` here even before the next operation reconciles it.
    pub fn state(&self) -> EngineState {
        let status = self.status.lock().unwrap();
        match status.state {
            EngineState::Stopped => EngineState::Stopped,
            state => {
                let alive = status
                    .alive
                    .as_ref()
                    .is_some_and(|flag| flag.load(Ordering::Relaxed));
                if alive {
                    state
                } else {
                    EngineState::Stopped
                }
            }
        }
    }

    fn set_state(&self, state: EngineState) {
        self.status.lock().unwrap().state = state;
    }

    fn set_running(&self, state: EngineState, alive: Arc<AtomicBool>) {
        let mut status = self.status.lock().unwrap();
        status.state = state;
        status.alive = Some(alive);
    }

    fn set_stopped(&self) {
        let mut status = self.status.lock().unwrap();
        status.state = EngineState::Stopped;
        status.alive = None;
    }

    /// Starts the engine if it is not already running.
    ///
    /// Returns `true` when a new process was launched, `false` when a
    /// live engine already existed. A call that finds the engine
    /// starting, ready, or busy returns immediately without touching it;
    /// a failed handshake kills the process and resets to `Stopped`.
    pub async fn start(&self) -> Result<bool> {
        if self.state() != EngineState::Stopped {
            return Ok(false);
        }

        let mut session = self.session.lock().await;

        // Another caller may have started it while we waited for the lock.
        if session.as_ref().is_some_and(|p| p.is_alive()) {
            return Ok(false);
        }
        // Clear out a crashed leftover before spawning a fresh process.
        if let Some(stale) = session.take() {
            stale.kill().await;
            self.set_stopped();
        }

        let mut process = EngineProcess::spawn(&self.config)?;
        self.set_running(EngineState::Starting, process.liveness());

        match self.handshake(&mut process).await {
            Ok(()) => {
                self.set_state(EngineState::Ready);
                info!("engine ready: {}", self.config.command);
                *session = Some(process);
                Ok(true)
            }
            Err(e) => {
                warn!("engine handshake failed: {}", e);
                process.kill().await;
                self.set_stopped();
                Err(e)
            }
        }
    }

    async fn handshake(&self, process: &mut EngineProcess) -> Result<()> {
        let limit = self.config.handshake_timeout;
        process.send("uci").await?;
        expect_ack(process, "uciok", limit).await?;
        process.send("isready").await?;
        expect_ack(process, "readyok", limit).await?;
        Ok(())
    }

    /// Stops the engine: graceful `quit`, bounded wait, then force kill.
    /// Idempotent; returns `true` when a process was actually shut down.
    pub async fn stop(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        let Some(process) = session.take() else {
            self.set_stopped();
            return Ok(false);
        };
        process.shutdown().await;
        self.set_stopped();
        info!("engine stopped");
        Ok(true)
    }

    /// Analyzes a position at the requested depth.
    ///
    /// Callers queue on the session lock in arrival order; exactly one
    /// analysis exchange runs against the engine at a time. A timeout
    /// leaves the engine running (`Ready`); a crash tears it down.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult> {
        match self.state() {
            EngineState::Stopped | EngineState::Starting => {
                return Err(Error::ProcessNotRunning)
            }
            EngineState::Ready | EngineState::Busy => {}
        }

        let mut session = self.session.lock().await;
        let Some(mut process) = session.take() else {
            self.set_stopped();
            return Err(Error::ProcessNotRunning);
        };
        if !process.is_alive() {
            process.kill().await;
            self.set_stopped();
            return Err(Error::ProcessCrashed);
        }

        // A predecessor that timed out leaves its unread lines behind;
        // they must not be attributed to this request.
        process.drain();
        self.set_state(EngineState::Busy);

        let result = self.run_search(&mut process, &request).await;

        match &result {
            Err(Error::ProcessCrashed) => {
                process.kill().await;
                self.set_stopped();
            }
            _ => {
                *session = Some(process);
                self.set_state(EngineState::Ready);
            }
        }
        result
    }

    async fn run_search(
        &self,
        process: &mut EngineProcess,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult> {
        let position = format!("position fen {}", request.position());
        let go = format!("go depth {}", request.depth());
        process.send(&position).await.map_err(crash_on_gone)?;
        process.send(&go).await.map_err(crash_on_gone)?;

        let limit = self.config.search_deadline;
        let deadline = Instant::now() + limit;
        let mut evaluation = None;
        let mut depth = 0u8;
        let mut pv = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("no bestmove within {:?}", limit);
                return Err(Error::AnalysisTimeout(limit));
            }
            match process.next_line(remaining).await {
                Wait::Line(line) => {
                    if let Some(best_move) = parse_bestmove(&line) {
                        return Ok(AnalysisResult {
                            evaluation,
                            best_move,
                            depth,
                            pv,
                        });
                    }
                    if line.starts_with("info") {
                        parse_info_line(&line, &mut evaluation, &mut depth, &mut pv);
                    }
                }
                Wait::Eof => {
                    warn!("engine died during search");
                    return Err(Error::ProcessCrashed);
                }
                Wait::TimedOut => {
                    warn!("no bestmove within {:?}", limit);
                    return Err(Error::AnalysisTimeout(limit));
                }
            }
        }
    }
}

async fn expect_ack(process: &mut EngineProcess, marker: &str, limit: Duration) -> Result<()> {
    match process.wait_for(marker, limit).await {
        Wait::Line(_) => Ok(()),
        Wait::TimedOut => Err(Error::HandshakeTimeout(limit)),
        Wait::Eof => Err(Error::ProcessCrashed),
    }
}

/// A write failure on the engine's stdin means the process is gone.
fn crash_on_gone(e: Error) -> Error {
    match e {
        Error::ProcessNotRunning => Error::ProcessCrashed,
        Error::Io(ref io_err) if io_err.kind() == io::ErrorKind::BrokenPipe => {
            Error::ProcessCrashed
        }
        e => e,
    }
}
