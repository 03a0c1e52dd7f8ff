// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user backend API key storage.
//!
//! A user with no stored key cannot invoke the gated backend call; the
//! gateway branches on absence rather than treating it as an exception.

use crate::error::{AppError, Result};
use dashmap::DashMap;

/// In-memory map of user id to opaque backend API key, last-write-wins.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    keys: DashMap<String, String>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) the API key for a user.
    pub fn set(&self, user_id: &str, key: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
        }
        if key.is_empty() {
            return Err(AppError::InvalidInput("api_key cannot be empty".to_string()));
        }
        self.keys.insert(user_id.to_string(), key.to_string());
        Ok(())
    }

    /// Look up the API key for a user. Absence is an expected outcome.
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.keys.get(user_id).map(|entry| entry.value().clone())
    }

    /// Delete the key for a user; returns whether one existed.
    pub fn revoke(&self, user_id: &str) -> bool {
        self.keys.remove(user_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let store = ApiKeyStore::new();
        store.set("alice", "key123").unwrap();
        assert_eq!(store.get("alice").as_deref(), Some("key123"));
        assert_eq!(store.get("bob"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let store = ApiKeyStore::new();
        store.set("alice", "old").unwrap();
        store.set("alice", "new").unwrap();
        assert_eq!(store.get("alice").as_deref(), Some("new"));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let store = ApiKeyStore::new();
        assert!(matches!(
            store.set("", "key"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.set("alice", ""),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let store = ApiKeyStore::new();
        store.set("alice", "key123").unwrap();
        assert!(store.revoke("alice"));
        assert!(!store.revoke("alice"));
    }
}
