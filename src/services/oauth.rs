// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth client for the provider's authorization and token endpoints.
//!
//! Handles:
//! - Authorization URL construction with an HMAC-signed state parameter
//! - Authorization-code exchange
//! - Refresh-token exchange

use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Token endpoint response for both code and refresh exchanges.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent on refresh unless the provider rotates refresh tokens
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<i64>,
}

/// Seam between the credential store and the token endpoint.
///
/// The production implementation is [`OAuthClient`]; tests substitute a
/// counting mock to verify exactly one refresh exchange happens.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError>;
}

/// OAuth client bound to one provider configuration.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    auth_uri: String,
    token_uri: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: String,
    state_key: Vec<u8>,
}

impl OAuthClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth_uri: String,
        token_uri: String,
        client_id: String,
        client_secret: String,
        redirect_url: String,
        scopes: String,
        state_key: Vec<u8>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_uri,
            token_uri,
            client_id,
            client_secret,
            redirect_url,
            scopes,
            state_key,
        }
    }

    /// Build the authorization URL for a user, with a signed state parameter.
    pub fn authorization_url(&self, user_id: &str) -> Result<String, AppError> {
        if user_id.is_empty() {
            return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_millis();

        let state = sign_state(user_id, timestamp, &self.state_key)
            .map_err(AppError::Internal)?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
             access_type=offline&prompt=consent&state={}",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&self.scopes),
            state
        ))
    }

    /// Verify a state parameter and return the embedded user id.
    pub fn verify_state(&self, state: &str) -> Option<String> {
        verify_and_decode_state(state, &self.state_key)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token endpoint rejected request");
            return Err(AppError::Backend(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to parse token response: {}", e)))
    }
}

#[async_trait]
impl TokenExchanger for OAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }
}

/// Sign "user_id|timestamp_hex" and base64-encode the result for the URL.
fn sign_state(user_id: &str, timestamp: u128, secret: &[u8]) -> anyhow::Result<String> {
    let payload = format!("{}|{:x}", user_id, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode the user id from the state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "user_id|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let user_id = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", user_id, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(user_id.to_string())
}
