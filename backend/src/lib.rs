pub mod config;
pub mod game;
pub mod repository;

pub use game::messages;

use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade, ws::WebSocket},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use game::PlayState;
use game::engine::{ChatModel, ContentSource, SentenceApi, SentenceBackend, SessionConfig};
use repository::SentenceRepository;
use serde_json::json;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

async fn health() -> &'static str {
    "ok"
}

/// Wiring for the play endpoint
pub struct GameSettings {
    pub data_dir: PathBuf,
    /// Remote sentence endpoint; the local store is used when absent
    pub sentence_api: Option<SentenceApi>,
    pub model: Option<Arc<ChatModel>>,
    pub session: SessionConfig,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sentence_api: None,
            model: None,
            session: SessionConfig::default(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sentences: SentenceRepository,
    pub play: Arc<PlayState>,
}

async fn sentences_handler(
    Path(difficulty): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.sentences.by_difficulty(&difficulty).await {
        Ok(sentences) => Json(sentences).into_response(),
        Err(e) => {
            error!(error = %e, difficulty = %difficulty, "Error fetching sentences");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Error fetching sentences" })),
            )
                .into_response()
        }
    }
}

async fn play_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_play_socket(socket, state))
}

async fn handle_play_socket(socket: WebSocket, state: AppState) {
    game::run_connection(socket, state.play).await;
}

pub fn app(pool: SqlitePool) -> Router {
    app_with_config(pool, GameSettings::default())
}

pub fn app_with_config(pool: SqlitePool, settings: GameSettings) -> Router {
    let repository = SentenceRepository::new(pool);
    let backend = match settings.sentence_api {
        Some(api) => SentenceBackend::Api(api),
        None => SentenceBackend::Database(repository.clone()),
    };
    let play = PlayState {
        source: Arc::new(ContentSource::new(backend, settings.data_dir)),
        model: settings.model,
        config: settings.session,
    };
    let state = AppState {
        sentences: repository,
        play: Arc::new(play),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/sentences/:difficulty", get(sentences_handler))
        .route("/ws/play", get(play_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
