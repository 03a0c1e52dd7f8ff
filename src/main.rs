// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI Chat Gateway API Server
//!
//! Proxies a generative-AI chat backend behind per-user OAuth credentials,
//! per-user API keys, and a shared rate-limit gate.

use chat_gateway::{
    config::{BackendMode, Config},
    services::{ChatBackend, Gateway, GeminiBackend, MockBackend, OAuthClient, RateLimiter},
    store::{ApiKeyStore, CredentialStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting AI Chat Gateway");

    let oauth = OAuthClient::new(
        config.oauth_auth_uri.clone(),
        config.oauth_token_uri.clone(),
        config.oauth_client_id.clone(),
        config.oauth_client_secret.clone(),
        config.oauth_redirect_url.clone(),
        config.oauth_scopes.clone(),
        config.oauth_state_key.clone(),
    );

    let exchanger: Arc<dyn chat_gateway::services::TokenExchanger> = Arc::new(oauth.clone());
    let credentials = Arc::new(CredentialStore::new(exchanger.clone()));
    let api_keys = Arc::new(ApiKeyStore::new());
    let limiter = Arc::new(RateLimiter::new(config.rate_limits));

    // Backend choice is an explicit configuration decision
    let backend: Arc<dyn ChatBackend> = match config.backend_mode {
        BackendMode::Gemini => {
            tracing::info!(url = %config.gemini_api_url, "Using Gemini backend");
            Arc::new(GeminiBackend::new(config.gemini_api_url.clone()))
        }
        BackendMode::Mock => {
            tracing::warn!("Using mock chat backend");
            Arc::new(MockBackend::new())
        }
    };

    let gateway = Gateway::new(
        api_keys.clone(),
        credentials.clone(),
        limiter,
        backend,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        oauth,
        exchanger,
        credentials,
        api_keys,
        gateway,
    });

    let app = chat_gateway::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_gateway=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
