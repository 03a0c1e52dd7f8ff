// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth authentication and API key routes.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::routes::chat::AuthQuery;
use crate::services::oauth::TokenResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", get(auth_login))
        .route("/auth/callback", get(auth_callback).post(auth_callback_with_key))
        .route("/auth/api-key", post(store_api_key))
        .route("/auth/{user_id}", delete(revoke_auth))
}

#[derive(Deserialize)]
pub struct LoginParams {
    user_id: String,
}

#[derive(Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Get the OAuth authorization URL for a user.
async fn auth_login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> Result<Json<AuthUrlResponse>> {
    let auth_url = state.oauth.authorization_url(&params.user_id)?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    user_id: String,
    code: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub user_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}

/// OAuth callback redirect from the provider.
///
/// Exchanges the authorization code and stores the credential. The user must
/// then submit their backend API key in a separate request.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    if params.user_id.is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }
    if params.code.is_empty() {
        return Err(AppError::InvalidInput("code is required".to_string()));
    }

    // The state parameter is signed at login; if present it must name the
    // same user that is completing the flow.
    if let Some(oauth_state) = &params.state {
        match state.oauth.verify_state(oauth_state) {
            Some(state_user) if state_user == params.user_id => {}
            _ => {
                return Err(AppError::InvalidInput(
                    "state parameter is invalid or does not match user_id".to_string(),
                ))
            }
        }
    }

    exchange_and_store(&state, &params.user_id, &params.code).await?;

    tracing::info!(user_id = %params.user_id, "OAuth authentication successful");
    Ok(Json(CallbackResponse {
        user_id: params.user_id,
        status: "oauth_authenticated".to_string(),
        next_step: Some("POST /auth/api-key with your backend API key".to_string()),
    }))
}

#[derive(Deserialize, Validate)]
pub struct CallbackWithKeyRequest {
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    user_id: String,
    #[validate(length(min = 1, message = "code cannot be empty"))]
    code: String,
    #[validate(length(min = 1, message = "api_key cannot be empty"))]
    api_key: String,
}

/// OAuth callback carrying the API key in one request (POST variant).
async fn auth_callback_with_key(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CallbackWithKeyRequest>,
) -> Result<Json<CallbackResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    exchange_and_store(&state, &request.user_id, &request.code).await?;
    state.api_keys.set(&request.user_id, &request.api_key)?;

    tracing::info!(user_id = %request.user_id, "User authenticated with API key stored");
    Ok(Json(CallbackResponse {
        user_id: request.user_id,
        status: "authenticated".to_string(),
        next_step: None,
    }))
}

#[derive(Deserialize)]
pub struct StoreApiKeyParams {
    user_id: String,
    api_key: String,
}

#[derive(Serialize)]
pub struct StoreApiKeyResponse {
    pub user_id: String,
    pub status: String,
}

/// Store the backend API key for an authenticated user.
async fn store_api_key(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StoreApiKeyParams>,
) -> Result<Json<StoreApiKeyResponse>> {
    state.api_keys.set(&params.user_id, &params.api_key)?;

    tracing::info!(user_id = %params.user_id, "API key stored");
    Ok(Json(StoreApiKeyResponse {
        user_id: params.user_id,
        status: "api_key_stored".to_string(),
    }))
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub user_id: String,
    pub status: String,
}

/// Revoke OAuth credentials and the API key for a user.
async fn revoke_auth(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(auth): Query<AuthQuery>,
) -> Result<Json<RevokeResponse>> {
    state
        .gateway
        .revoke(&auth.authenticated_user_id, &user_id)?;

    Ok(Json(RevokeResponse {
        user_id,
        status: "revoked".to_string(),
    }))
}

/// Exchange an authorization code and persist the resulting credential.
async fn exchange_and_store(
    state: &Arc<AppState>,
    user_id: &str,
    code: &str,
) -> Result<()> {
    let token_response = state.exchanger.exchange_code(code).await?;
    let credential = credential_from_response(state, token_response);
    state.credentials.store(user_id, credential)?;
    Ok(())
}

fn credential_from_response(state: &Arc<AppState>, response: TokenResponse) -> Credential {
    Credential {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        token_uri: state.config.oauth_token_uri.clone(),
        client_id: state.config.oauth_client_id.clone(),
        client_secret: state.config.oauth_client_secret.clone(),
        expires_at: response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs)),
    }
}
