// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod authz;
pub mod backend;
pub mod gateway;
pub mod oauth;
pub mod rate_limit;

pub use backend::{ChatBackend, GeminiBackend, MockBackend};
pub use gateway::Gateway;
pub use oauth::{OAuthClient, TokenExchanger, TokenResponse};
pub use rate_limit::RateLimiter;
