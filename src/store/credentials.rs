// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user OAuth credential storage with expiry-aware refresh.
//!
//! Reads go through [`CredentialStore::get`], which transparently performs a
//! refresh-token exchange when the stored access token has expired. A
//! per-user lock serializes refreshes so concurrent readers trigger at most
//! one exchange.

use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::services::oauth::TokenExchanger;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Keyed credential storage, last-write-wins per user id.
pub struct CredentialStore {
    entries: DashMap<String, Credential>,
    /// Per-user mutex to serialize refresh exchanges.
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
    exchanger: Arc<dyn TokenExchanger>,
}

impl CredentialStore {
    pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            entries: DashMap::new(),
            refresh_locks: DashMap::new(),
            exchanger,
        }
    }

    /// Store (or overwrite) the credential for a user.
    pub fn store(&self, user_id: &str, credential: Credential) -> Result<()> {
        require_user_id(user_id)?;
        self.entries.insert(user_id.to_string(), credential);
        Ok(())
    }

    /// Fetch the credential for a user, refreshing it first if expired.
    ///
    /// A refresh failure is propagated, not swallowed: the caller must know
    /// that authentication could not be repaired.
    pub async fn get(&self, user_id: &str) -> Result<Option<Credential>> {
        require_user_id(user_id)?;

        let credential = match self.entries.get(user_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        let now = Utc::now();
        if !credential.is_expired(now) || credential.refresh_token.is_none() {
            return Ok(Some(credential));
        }

        // Serialize refreshes per user; re-check after acquiring the lock in
        // case another task already repaired the credential.
        let lock = self
            .refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let credential = match self.entries.get(user_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        if !credential.is_expired(now) {
            return Ok(Some(credential));
        }

        let refreshed = self.refresh(user_id, credential).await?;
        Ok(Some(refreshed))
    }

    /// Delete the credential for a user; returns whether one existed.
    pub fn revoke(&self, user_id: &str) -> Result<bool> {
        require_user_id(user_id)?;
        Ok(self.entries.remove(user_id).is_some())
    }

    /// Perform one refresh exchange and persist the result.
    async fn refresh(&self, user_id: &str, credential: Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| AppError::Backend("No refresh token available".to_string()))?;

        tracing::info!(user_id, "Access token expired, refreshing");

        let response = self.exchanger.refresh_token(&refresh_token).await?;

        let refreshed = Credential {
            access_token: response.access_token,
            // Keep the old refresh token unless the endpoint rotated it
            refresh_token: response.refresh_token.or(Some(refresh_token)),
            expires_at: response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            ..credential
        };

        self.entries
            .insert(user_id.to_string(), refreshed.clone());

        tracing::info!(user_id, "Credential refreshed and stored");
        Ok(refreshed)
    }
}

fn require_user_id(user_id: &str) -> Result<()> {
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::oauth::TokenResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counting exchanger that hands out sequentially numbered tokens.
    struct FakeExchanger {
        refreshes: AtomicUsize,
        fail: bool,
    }

    impl FakeExchanger {
        fn new() -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl TokenExchanger for FakeExchanger {
        async fn exchange_code(&self, _code: &str) -> std::result::Result<TokenResponse, AppError> {
            Ok(TokenResponse {
                access_token: "exchanged".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_in: Some(3600),
            })
        }

        async fn refresh_token(
            &self,
            _refresh_token: &str,
        ) -> std::result::Result<TokenResponse, AppError> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Backend("refresh rejected".to_string()));
            }
            Ok(TokenResponse {
                access_token: format!("refreshed-{}", n),
                refresh_token: None,
                expires_in: Some(3600),
            })
        }
    }

    fn expired_credential() -> Credential {
        Credential {
            access_token: "stale".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_uri: "https://example.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            expires_at: Some(Utc::now() - Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let store = CredentialStore::new(Arc::new(FakeExchanger::new()));
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_valid_credential_no_refresh() {
        let exchanger = Arc::new(FakeExchanger::new());
        let store = CredentialStore::new(exchanger.clone());

        let mut credential = expired_credential();
        credential.expires_at = Some(Utc::now() + Duration::hours(1));
        store.store("alice", credential).unwrap();

        let fetched = store.get("alice").await.unwrap().unwrap();
        assert_eq!(fetched.access_token, "stale");
        assert_eq!(exchanger.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_refreshed_exactly_once() {
        let exchanger = Arc::new(FakeExchanger::new());
        let store = CredentialStore::new(exchanger.clone());
        store.store("alice", expired_credential()).unwrap();

        let fetched = store.get("alice").await.unwrap().unwrap();
        assert_eq!(fetched.access_token, "refreshed-0");
        // Refresh token kept since the endpoint did not rotate it
        assert_eq!(fetched.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(exchanger.refreshes.load(Ordering::SeqCst), 1);

        // The refreshed credential is persisted: a second read needs no exchange
        let again = store.get("alice").await.unwrap().unwrap();
        assert_eq!(again.access_token, "refreshed-0");
        assert_eq!(exchanger.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let store = CredentialStore::new(Arc::new(FakeExchanger::failing()));
        store.store("alice", expired_credential()).unwrap();

        let err = store.get("alice").await.unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_returned_as_is() {
        let store = CredentialStore::new(Arc::new(FakeExchanger::new()));
        let mut credential = expired_credential();
        credential.refresh_token = None;
        store.store("alice", credential).unwrap();

        let fetched = store.get("alice").await.unwrap().unwrap();
        assert_eq!(fetched.access_token, "stale");
    }

    #[tokio::test]
    async fn test_revoke_idempotent() {
        let store = CredentialStore::new(Arc::new(FakeExchanger::new()));
        store.store("alice", expired_credential()).unwrap();
        assert!(store.revoke("alice").unwrap());
        assert!(!store.revoke("alice").unwrap());
    }

    #[tokio::test]
    async fn test_empty_user_id_rejected_everywhere() {
        let store = CredentialStore::new(Arc::new(FakeExchanger::new()));
        assert!(matches!(
            store.store("", expired_credential()),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.get("").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(store.revoke(""), Err(AppError::InvalidInput(_))));
    }
}
