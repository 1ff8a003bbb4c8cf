//! Chess Viewer Core Library
//!
//! Engine process supervision, the on-disk game catalog, and PGN
//! decoding for the chess-viewer web application.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod parser;

pub use catalog::GameCatalog;
pub use engine::{
    AnalysisRequest, AnalysisResult, EngineConfig, EngineState, Evaluation, StockfishEngine,
};
pub use error::{Error, Result};
pub use parser::{MoveRecord, PgnGame};
