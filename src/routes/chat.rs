// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat proxy routes: send, history, clear.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::Message;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(send_message))
        .route("/history/{user_id}", get(history).delete(clear_history))
}

/// Caller identity supplied by the OAuth-authenticated session.
#[derive(Deserialize)]
pub struct AuthQuery {
    pub authenticated_user_id: String,
}

#[derive(Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "message cannot be empty"))]
    pub message: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub response: String,
}

#[derive(Serialize)]
pub struct ConversationHistoryResponse {
    pub user_id: String,
    pub messages: Vec<Message>,
}

#[derive(Serialize)]
pub struct ClearConversationResponse {
    pub user_id: String,
    pub success: bool,
}

/// Send a message to the AI backend on the caller's behalf.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<AuthQuery>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let response = state
        .gateway
        .send_message(&auth.authenticated_user_id, &request.user_id, &request.message)
        .await?;

    Ok(Json(SendMessageResponse { response }))
}

/// Conversation history for a user.
async fn history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(auth): Query<AuthQuery>,
) -> Result<Json<ConversationHistoryResponse>> {
    let messages = state
        .gateway
        .history(&auth.authenticated_user_id, &user_id)?;

    Ok(Json(ConversationHistoryResponse { user_id, messages }))
}

/// Clear conversation history for a user.
async fn clear_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(auth): Query<AuthQuery>,
) -> Result<Json<ClearConversationResponse>> {
    let success = state
        .gateway
        .clear_history(&auth.authenticated_user_id, &user_id)?;

    Ok(Json(ClearConversationResponse { user_id, success }))
}
