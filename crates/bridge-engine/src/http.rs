//! HTTP surface (§6, consumed-only contract). Thin `axum` handlers over the
//! Chat Buffer and Config Store — the HTML/JS/CSS the UI would render is out
//! of scope (spec.md's explicit non-goal), but the JSON contract it consumes
//! is implemented because `main.rs` needs something to route to, the way the
//! teacher always wires its `Router` fully.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mgba_bridge_config::ConfigPatch;
use mgba_bridge_protocol::ChatMessage;

use crate::notepad;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat-messages/", get(chat_messages))
        .route("/api/restart-service/", post(restart_service))
        .route("/api/stop-service/", post(stop_service))
        .route("/api/reset-llm-session/", post(reset_llm_session))
        .route("/api/notepad-content/", get(notepad_content))
        .route("/api/clear-notepad/", post(clear_notepad))
        .route("/api/save-ai-config/", post(save_ai_config))
        .route("/api/save-rom-config/", post(save_rom_config))
        .route("/api/games/", get(list_games))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct ChatMessagesQuery {
    since_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ChatMessagesResponse {
    success: bool,
    status: &'static str,
    connected: bool,
    messages: Vec<ChatMessage>,
    total_messages: u64,
    buffer_size: usize,
    max_buffer_size: usize,
}

async fn chat_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatMessagesQuery>,
) -> Json<ChatMessagesResponse> {
    let snapshot = state.buffer.snapshot(query.since_id).await;
    Json(ChatMessagesResponse {
        success: true,
        status: "running",
        connected: snapshot.tail_id > 0,
        buffer_size: snapshot.messages.len(),
        messages: snapshot.messages,
        total_messages: snapshot.total_appended,
        max_buffer_size: snapshot.capacity,
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    success: bool,
}

async fn restart_service(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let bind_addr = state.config.tcp_bind_addr.clone();
    state.engine.stop().await;
    let started = state.engine.clone().start(bind_addr).await;
    Json(StatusResponse { success: started })
}

async fn stop_service(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.engine.stop().await;
    Json(StatusResponse { success: true })
}

async fn reset_llm_session(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.engine.reset_memory().await;
    Json(StatusResponse { success: true })
}

#[derive(Debug, Serialize)]
struct NotepadResponse {
    content: String,
    entry_count: usize,
}

async fn notepad_content(State(state): State<Arc<AppState>>) -> Json<NotepadResponse> {
    let snapshot = match state.config_store.get_snapshot().await {
        Ok(s) => s,
        Err(_) => return Json(NotepadResponse { content: String::new(), entry_count: 0 }),
    };
    let content = notepad::read(&snapshot.notepad_path).await.unwrap_or_default();
    let entry_count = content.lines().filter(|l| !l.trim().is_empty()).count();
    Json(NotepadResponse { content, entry_count })
}

async fn clear_notepad(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = match state.config_store.get_snapshot().await {
        Ok(s) => s,
        Err(_) => return Json(StatusResponse { success: false }),
    };
    let success = notepad::clear(&snapshot.notepad_path).await.is_ok();
    Json(StatusResponse { success })
}

#[derive(Debug, Deserialize)]
struct SaveAiConfigRequest {
    llm_provider: Option<String>,
    api_key: Option<String>,
    model_name: Option<String>,
    decision_cooldown_s: Option<f64>,
}

async fn save_ai_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveAiConfigRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let patch = ConfigPatch {
        llm_provider: body.llm_provider,
        api_key: body.api_key,
        model_name: body.model_name,
        decision_cooldown_s: body.decision_cooldown_s,
        ..Default::default()
    };
    state
        .config_store
        .save(patch)
        .await
        .map(|_| Json(StatusResponse { success: true }))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Deserialize)]
struct SaveRomConfigRequest {
    rom_path: Option<String>,
    rom_name: Option<String>,
    game_override: Option<Option<String>>,
}

async fn save_rom_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveRomConfigRequest>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let patch = ConfigPatch {
        rom_path: body.rom_path,
        rom_name: body.rom_name,
        game_override: body.game_override,
        ..Default::default()
    };
    state
        .config_store
        .save(patch)
        .await
        .map(|_| Json(StatusResponse { success: true }))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Serialize)]
struct GamesResponse {
    games: Vec<String>,
}

async fn list_games(State(state): State<Arc<AppState>>) -> Json<GamesResponse> {
    Json(GamesResponse {
        games: state.detector.known_game_ids(),
    })
}
