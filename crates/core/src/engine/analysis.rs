//! Types for representing engine analysis requests and results

use std::fmt;

use crate::error::{Error, Result};

/// Represents a position evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn score (positive = white advantage)
    Centipawns(i32),
    /// Forced mate in this many plies (positive = white mates, negative = black mates)
    Mate(i32),
}

impl Evaluation {
    /// Converts the evaluation to a pawn-valued score
    pub fn as_score(&self) -> f64 {
        match self {
            Evaluation::Centipawns(cp) => *cp as f64 / 100.0,
            Evaluation::Mate(plies) => {
                if *plies > 0 {
                    100.0
                } else {
                    -100.0
                }
            }
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f64 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(plies) => write!(f, "M{}", plies),
        }
    }
}

/// A single position-evaluation request.
///
/// Validated on construction: the position must be a non-empty line
/// (control characters are rejected because the position is spliced
/// into a line-oriented protocol) and the depth must be positive.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    position: String,
    depth: u8,
}

impl AnalysisRequest {
    pub fn new(position: &str, depth: u8) -> Result<Self> {
        let position = position.trim();
        if position.is_empty() {
            return Err(Error::MalformedRequest("missing position".into()));
        }
        if position.chars().any(char::is_control) {
            return Err(Error::MalformedRequest(
                "position contains control characters".into(),
            ));
        }
        if depth == 0 {
            return Err(Error::MalformedRequest("depth must be positive".into()));
        }
        Ok(AnalysisRequest {
            position: position.to_string(),
            depth,
        })
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }
}

/// Result of analyzing a single position
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Last evaluation the engine reported, if any
    pub evaluation: Option<Evaluation>,
    /// Best move in the engine's notation; `None` if the engine reported
    /// no legal move
    pub best_move: Option<String>,
    /// Search depth reached
    pub depth: u8,
    /// Principal variation (best line of play)
    pub pv: Vec<String>,
}

/// Parses an `info` line, updating the running search results.
///
/// Later lines overwrite earlier ones: engines report increasingly
/// confident scores as the depth grows.
pub(crate) fn parse_info_line(
    line: &str,
    evaluation: &mut Option<Evaluation>,
    depth: &mut u8,
    pv: &mut Vec<String>,
) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut i = 0;

    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if i + 1 < parts.len() {
                    *depth = parts[i + 1].parse().unwrap_or(*depth);
                }
                i += 2;
            }
            "score" => {
                if i + 2 < parts.len() {
                    match parts[i + 1] {
                        "cp" => {
                            if let Ok(cp) = parts[i + 2].parse::<i32>() {
                                *evaluation = Some(Evaluation::Centipawns(cp));
                            }
                        }
                        "mate" => {
                            if let Ok(plies) = parts[i + 2].parse::<i32>() {
                                *evaluation = Some(Evaluation::Mate(plies));
                            }
                        }
                        _ => {}
                    }
                }
                i += 3;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                *pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => {
                i += 1;
            }
        }
    }
}

/// Extracts the move from a `bestmove` line.
///
/// Returns `None` when the line is not a bestmove line at all;
/// `Some(None)` when the engine reported `(none)`.
pub(crate) fn parse_bestmove(line: &str) -> Option<Option<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return None;
    }
    match tokens.next() {
        None | Some("(none)") => Some(None),
        Some(mv) => Some(Some(mv.to_string())),
    }
}
