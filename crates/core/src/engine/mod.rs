//! Chess engine integration
//!
//! Supervises a UCI-compatible engine (Stockfish) as a subprocess and
//! brokers analysis requests against its single stdin/stdout stream.

use std::time::Duration;

mod process;

pub mod analysis;
pub mod stockfish;

// Re-export main types for convenience
pub use analysis::{AnalysisRequest, AnalysisResult, Evaluation};
pub use stockfish::StockfishEngine;

/// Lifecycle state of the supervised engine process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Starting,
    Ready,
    Busy,
}

/// Configuration for the engine subprocess
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine binary (a path, or a name looked up on PATH)
    pub command: String,
    /// Extra arguments passed to the binary
    pub args: Vec<String>,
    /// Bound on each handshake acknowledgment wait
    pub handshake_timeout: Duration,
    /// Overall deadline for one analysis exchange
    pub search_deadline: Duration,
    /// Search depth used when the caller does not specify one
    pub default_depth: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            command: "stockfish".to_string(),
            args: Vec::new(),
            handshake_timeout: Duration::from_secs(5),
            search_deadline: Duration::from_secs(10),
            default_depth: 15,
        }
    }
}
