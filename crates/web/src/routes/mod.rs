use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chess_viewer_core::{AnalysisRequest, Error, Evaluation};

use crate::AppState;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub players: Vec<PlayerView>,
}

pub struct PlayerView {
    pub name: String,
    pub dates: Vec<DateView>,
}

pub struct DateView {
    pub date: String,
    pub label: String,
    pub games: Vec<String>,
}

#[derive(Template)]
#[template(path = "viewer.html")]
pub struct ViewerTemplate {
    pub title: String,
    pub player: String,
    pub date: String,
    pub filename: String,
}

#[derive(Deserialize)]
pub struct ViewerParams {
    pub player: Option<String>,
    pub date: Option<String>,
    pub file: Option<String>,
}

#[derive(Deserialize)]
pub struct LoadGameRequest {
    pub player: String,
    pub date: String,
    pub filename: String,
}

#[derive(Deserialize)]
pub struct AnalyzeFenRequest {
    pub fen: Option<String>,
    pub depth: Option<u8>,
}

#[derive(Serialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ScoreBody {
    Pawns(f64),
    Mate { mate: i32 },
}

#[derive(Serialize)]
pub struct AnalyzeFenResponse {
    pub score: Option<ScoreBody>,
    pub best_move: String,
    pub depth: u8,
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let players = match state.catalog.list_players() {
        Ok(players) => players,
        Err(e) => {
            tracing::error!("failed to list games: {}", e);
            Vec::new()
        }
    };

    let players = players
        .into_iter()
        .map(|p| PlayerView {
            name: p.name,
            dates: p
                .dates
                .into_iter()
                .map(|d| DateView {
                    label: pretty_date(&d.date),
                    date: d.date,
                    games: d.games,
                })
                .collect(),
        })
        .collect();

    let template = IndexTemplate {
        title: "Chess Viewer".to_string(),
        players,
    };
    Html(template.render().unwrap())
}

pub async fn viewer(Query(params): Query<ViewerParams>) -> Response {
    let (Some(player), Some(date), Some(file)) = (params.player, params.date, params.file) else {
        return (StatusCode::BAD_REQUEST, "Missing parameters").into_response();
    };

    let template = ViewerTemplate {
        title: format!("{} - {}", player, file),
        player,
        date,
        filename: file,
    };
    Html(template.render().unwrap()).into_response()
}

pub async fn load_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadGameRequest>,
) -> Response {
    match state.catalog.load_game(&req.player, &req.date, &req.filename) {
        Ok(game) => Json(game.moves).into_response(),
        Err(Error::GameNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "Game not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to load game: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Always reports success to the caller; failures only show up in the
/// status text.
pub async fn start_stockfish(State(state): State<Arc<AppState>>) -> Json<StatusBody> {
    let status = match state.engine.start().await {
        Ok(true) => "Stockfish started".to_string(),
        Ok(false) => "Stockfish already running".to_string(),
        Err(e) => format!("Failed to start Stockfish: {}", e),
    };
    Json(StatusBody { status })
}

pub async fn stop_stockfish(State(state): State<Arc<AppState>>) -> Json<StatusBody> {
    let status = match state.engine.stop().await {
        Ok(true) => "Stockfish stopped".to_string(),
        Ok(false) => "Stockfish not running".to_string(),
        Err(e) => format!("Failed to stop Stockfish: {}", e),
    };
    Json(StatusBody { status })
}

pub async fn analyze_fen(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeFenRequest>,
) -> Response {
    let Some(fen) = req.fen else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "Missing FEN".to_string(),
            }),
        )
            .into_response();
    };
    let depth = req.depth.unwrap_or(state.engine.config().default_depth);

    let request = match AnalysisRequest::new(&fen, depth) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    match state.engine.analyze(request).await {
        Ok(result) => {
            let score = result.evaluation.map(|eval| match eval {
                Evaluation::Centipawns(_) => ScoreBody::Pawns(eval.as_score()),
                Evaluation::Mate(plies) => ScoreBody::Mate { mate: plies },
            });
            Json(AnalyzeFenResponse {
                score,
                best_move: result.best_move.unwrap_or_else(|| "none".to_string()),
                depth: result.depth,
            })
            .into_response()
        }
        Err(e) => {
            let status = match e {
                Error::MalformedRequest(_) => StatusCode::BAD_REQUEST,
                Error::ProcessNotRunning => StatusCode::CONFLICT,
                Error::AnalysisTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                Error::ProcessCrashed => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!("analysis failed: {}", e);
            (
                status,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn health() -> &'static str {
    "OK"
}

fn pretty_date(date: &str) -> String {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}
