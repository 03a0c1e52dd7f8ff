// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chat_gateway::config::{Config, RateLimits};
use chat_gateway::error::AppError;
use chat_gateway::routes::create_router;
use chat_gateway::services::{
    Gateway, MockBackend, OAuthClient, RateLimiter, TokenExchanger, TokenResponse,
};
use chat_gateway::store::{ApiKeyStore, CredentialStore};
use chat_gateway::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Token exchanger that never touches the network.
#[derive(Default)]
pub struct FakeExchanger {
    pub exchanges: AtomicUsize,
    pub refreshes: AtomicUsize,
}

#[async_trait]
impl TokenExchanger for FakeExchanger {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        if code == "bad-code" {
            return Err(AppError::Backend("invalid_grant".to_string()));
        }
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        Ok(TokenResponse {
            access_token: "test-access".to_string(),
            refresh_token: Some("test-refresh".to_string()),
            expires_in: Some(3600),
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(TokenResponse {
            access_token: "refreshed-access".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        })
    }
}

/// Create a test app with the mock backend and a fake token exchanger.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_limits(Config::test_default().rate_limits)
}

/// Same as [`create_test_app`] but with custom rate limits.
#[allow(dead_code)]
pub fn create_test_app_with_limits(limits: RateLimits) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.rate_limits = limits;

    let oauth = OAuthClient::new(
        config.oauth_auth_uri.clone(),
        config.oauth_token_uri.clone(),
        config.oauth_client_id.clone(),
        config.oauth_client_secret.clone(),
        config.oauth_redirect_url.clone(),
        config.oauth_scopes.clone(),
        config.oauth_state_key.clone(),
    );

    let exchanger: Arc<dyn TokenExchanger> = Arc::new(FakeExchanger::default());
    let credentials = Arc::new(CredentialStore::new(exchanger.clone()));
    let api_keys = Arc::new(ApiKeyStore::new());
    let limiter = Arc::new(RateLimiter::new(config.rate_limits));
    let backend = Arc::new(MockBackend::new());

    let gateway = Gateway::new(
        api_keys.clone(),
        credentials.clone(),
        limiter,
        backend,
    );

    let state = Arc::new(AppState {
        config,
        oauth,
        exchanger,
        credentials,
        api_keys,
        gateway,
    });

    (create_router(state.clone()), state)
}
