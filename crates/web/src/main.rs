use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use chess_viewer_core::{EngineConfig, GameCatalog, StockfishEngine};

mod routes;

pub struct AppState {
    pub engine: StockfishEngine,
    pub catalog: GameCatalog,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let games_dir = std::env::var("GAMES_DIR").unwrap_or_else(|_| "games".to_string());
    let stockfish = std::env::var("STOCKFISH_PATH").unwrap_or_else(|_| "stockfish".to_string());
    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let config = EngineConfig {
        command: stockfish,
        ..EngineConfig::default()
    };

    let state = Arc::new(AppState {
        engine: StockfishEngine::new(config),
        catalog: GameCatalog::new(games_dir),
    });

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/viewer", get(routes::viewer))
        .route("/load_game", post(routes::load_game))
        .route("/start_stockfish", get(routes::start_stockfish))
        // the viewer page stops the engine with a beacon POST on unload
        .route(
            "/stop_stockfish",
            get(routes::stop_stockfish).post(routes::stop_stockfish),
        )
        .route("/analyze_fen", post(routes::analyze_fen))
        .route("/health", get(routes::health))
        .nest_service("/static", ServeDir::new("crates/web/static"))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("failed to bind");

    println!("Server running at http://{}", bind);

    axum::serve(listener, app).await.unwrap();
}
