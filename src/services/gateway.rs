// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gateway orchestrating privileged chat operations.
//!
//! Every gated call runs the same sequence: authorization check, API key
//! lookup, rate-limit admission, backend dispatch, rate-limit consumption.
//! Consumption is tied to "dispatched a call", not to its outcome, so a
//! failed backend call still spends quota while an early rejection spends
//! nothing.

use crate::error::{AppError, Result};
use crate::models::Message;
use crate::services::authz::authorize;
use crate::services::backend::ChatBackend;
use crate::services::rate_limit::RateLimiter;
use crate::store::{ApiKeyStore, CredentialStore};
use chrono::Utc;
use std::sync::Arc;

/// Orchestrator around the chat backend. Constructed once at startup with
/// injected stores; owns no ambient global state.
pub struct Gateway {
    api_keys: Arc<ApiKeyStore>,
    credentials: Arc<CredentialStore>,
    limiter: Arc<RateLimiter>,
    backend: Arc<dyn ChatBackend>,
}

impl Gateway {
    pub fn new(
        api_keys: Arc<ApiKeyStore>,
        credentials: Arc<CredentialStore>,
        limiter: Arc<RateLimiter>,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            api_keys,
            credentials,
            limiter,
            backend,
        }
    }

    /// Send a chat message on a user's behalf.
    pub async fn send_message(
        &self,
        authenticated_user_id: &str,
        target_user_id: &str,
        message: &str,
    ) -> Result<String> {
        authorize(authenticated_user_id, target_user_id)?;

        if message.is_empty() {
            return Err(AppError::InvalidInput("message cannot be empty".to_string()));
        }

        let api_key = self
            .api_keys
            .get(target_user_id)
            .ok_or(AppError::MissingApiKey)?;

        self.limiter.admit(Utc::now())?;

        tracing::debug!(user_id = target_user_id, "Dispatching backend call");
        let result = self
            .backend
            .send_message(target_user_id, &api_key, message)
            .await;

        // Quota is spent by the dispatch itself, success or not
        self.limiter.consume(Utc::now());

        let reply = result?;

        // Deliberate throttle after each successful call. Suspends only this
        // task; other users' requests proceed.
        let delay = self.limiter.limits().min_call_interval;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(reply)
    }

    /// Conversation history for a user.
    ///
    /// No generative call is dispatched, so the limiter is not involved, but
    /// a user without a stored key cannot use the service at all.
    pub fn history(
        &self,
        authenticated_user_id: &str,
        target_user_id: &str,
    ) -> Result<Vec<Message>> {
        authorize(authenticated_user_id, target_user_id)?;

        if self.api_keys.get(target_user_id).is_none() {
            return Err(AppError::MissingApiKey);
        }

        Ok(self.backend.history(target_user_id))
    }

    /// Clear a user's conversation; returns whether anything existed.
    pub fn clear_history(
        &self,
        authenticated_user_id: &str,
        target_user_id: &str,
    ) -> Result<bool> {
        authorize(authenticated_user_id, target_user_id)?;

        if self.api_keys.get(target_user_id).is_none() {
            return Err(AppError::MissingApiKey);
        }

        Ok(self.backend.clear_history(target_user_id))
    }

    /// Revoke both the OAuth credential and the API key for a user.
    ///
    /// Succeeds if at least one existed; `NotFound` only when both stores
    /// report nothing to revoke.
    pub fn revoke(&self, authenticated_user_id: &str, target_user_id: &str) -> Result<()> {
        authorize(authenticated_user_id, target_user_id)?;

        let credential_revoked = self.credentials.revoke(target_user_id)?;
        let key_revoked = self.api_keys.revoke(target_user_id);

        if !credential_revoked && !key_revoked {
            return Err(AppError::NotFound(format!(
                "No credentials for user {}",
                target_user_id
            )));
        }

        tracing::info!(user_id = target_user_id, "Revoked credentials");
        Ok(())
    }
}
