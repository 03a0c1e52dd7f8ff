// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! AI chat gateway service.
//!
//! This crate provides an HTTP proxy in front of a generative-AI backend,
//! with per-user OAuth credentials, per-user API keys, and a shared
//! rate-limit gate on outbound backend calls.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use config::Config;
use services::{Gateway, OAuthClient, TokenExchanger};
use std::sync::Arc;
use store::{ApiKeyStore, CredentialStore};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Authorization URL construction and state verification
    pub oauth: OAuthClient,
    /// Code and refresh exchanges against the token endpoint
    pub exchanger: Arc<dyn TokenExchanger>,
    pub credentials: Arc<CredentialStore>,
    pub api_keys: Arc<ApiKeyStore>,
    pub gateway: Gateway,
}
