//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::ClientId,
    infrastructure::dto::http::{ClientCountDto, SessionDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Number of connected clients
pub async fn get_client_count(State(state): State<Arc<AppState>>) -> Json<ClientCountDto> {
    let count = state.session_query_usecase.get_client_count().await;
    Json(ClientCountDto { count })
}

/// Session of a connected client
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> Result<Json<SessionDto>, StatusCode> {
    let client_id = ClientId::try_from(client_id).map_err(|_| StatusCode::NOT_FOUND)?;
    match state.session_query_usecase.get_session_data(&client_id).await {
        // Domain Model から DTO への変換
        Some(session) => Ok(Json(SessionDto::from_session(&client_id, &session))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
