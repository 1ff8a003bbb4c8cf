//! Error types for chess-viewer-core

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("engine is not running")]
    ProcessNotRunning,

    #[error("engine handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),

    #[error("engine process exited unexpectedly")]
    ProcessCrashed,

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("failed to start engine: {0}")]
    Spawn(String),

    #[error("game not found: {0}")]
    GameNotFound(String),

    #[error("PGN parsing error: {0}")]
    Pgn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
