//! OAuth credential bundle stored per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth-style credential enabling backend calls on a user's behalf.
///
/// At most one live credential exists per user id; a refresh replaces the
/// access token but keeps the refresh token unless the token endpoint
/// issued a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Current access token
    pub access_token: String,
    /// Refresh token, if the provider issued one
    pub refresh_token: Option<String>,
    /// Token endpoint used for refresh exchanges
    pub token_uri: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// When the access token expires; None means "never expires"
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether the access token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(expires_at: Option<DateTime<Utc>>) -> Credential {
        Credential {
            access_token: "token".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_uri: "https://example.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_expiry_check() {
        let now = Utc::now();
        assert!(credential(Some(now - Duration::seconds(1))).is_expired(now));
        assert!(!credential(Some(now + Duration::hours(1))).is_expired(now));
        assert!(!credential(None).is_expired(now));
    }
}
