// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keyed per-user stores (credentials and API keys).

pub mod api_keys;
pub mod credentials;

pub use api_keys::ApiKeyStore;
pub use credentials::CredentialStore;
