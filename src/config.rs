//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and kept in memory; the gateway and
//! stores receive their settings by value at construction time instead of
//! reaching into the environment per request.

use std::env;
use std::time::Duration;

/// Which chat backend implementation to construct.
///
/// Selected by explicit configuration, never by catching a "no credentials"
/// error at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Real Gemini API backend (requires GEMINI_API_URL).
    Gemini,
    /// Deterministic in-memory backend for local testing.
    Mock,
}

/// Rate-limit settings for the shared backend-call gate.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    /// Calls admitted within any trailing 60-second window.
    pub per_minute: u32,
    /// Calls admitted within one calendar day (UTC).
    pub per_day: u32,
    /// Mandatory pause after each successful backend call.
    pub min_call_interval: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: 4,
            per_day: 180,
            min_call_interval: Duration::from_secs(15),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS and post-auth redirects
    pub frontend_url: String,

    // --- OAuth provider settings ---
    /// OAuth client ID (public)
    pub oauth_client_id: String,
    /// OAuth client secret
    pub oauth_client_secret: String,
    /// Authorization endpoint users are redirected to
    pub oauth_auth_uri: String,
    /// Token endpoint for code exchange and refresh
    pub oauth_token_uri: String,
    /// Redirect URL registered with the provider
    pub oauth_redirect_url: String,
    /// Space-separated OAuth scopes
    pub oauth_scopes: String,
    /// HMAC key for signing the OAuth state parameter
    pub oauth_state_key: Vec<u8>,

    // --- Chat backend ---
    /// Which backend implementation to construct
    pub backend_mode: BackendMode,
    /// Base URL of the Gemini generateContent endpoint
    pub gemini_api_url: String,

    /// Limits for the shared backend-call gate
    pub rate_limits: RateLimits,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend_mode = match env::var("CHAT_BACKEND").as_deref() {
            Ok("gemini") => BackendMode::Gemini,
            Ok("mock") | Err(_) => BackendMode::Mock,
            Ok(other) => return Err(ConfigError::Invalid("CHAT_BACKEND", other.to_string())),
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            oauth_client_id: env::var("OAUTH_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("OAUTH_CLIENT_ID"))?,
            oauth_client_secret: env::var("OAUTH_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OAUTH_CLIENT_SECRET"))?,
            oauth_auth_uri: env::var("OAUTH_AUTH_URI")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/auth".to_string()),
            oauth_token_uri: env::var("OAUTH_TOKEN_URI")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            oauth_redirect_url: env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/auth/callback".to_string()),
            oauth_scopes: env::var("OAUTH_SCOPES").unwrap_or_else(|_| {
                "https://www.googleapis.com/auth/gmail.readonly \
                 https://www.googleapis.com/auth/gmail.modify"
                    .to_string()
            }),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),

            backend_mode,
            gemini_api_url: env::var("GEMINI_API_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
                    .to_string()
            }),

            rate_limits: RateLimits {
                per_minute: parse_env_or("RATE_LIMIT_PER_MINUTE", 4)?,
                per_day: parse_env_or("RATE_LIMIT_PER_DAY", 180)?,
                min_call_interval: Duration::from_secs(parse_env_or(
                    "MIN_CALL_INTERVAL_SECS",
                    15,
                )?),
            },
        })
    }

    /// Default config for testing only.
    ///
    /// The inter-call delay is zeroed so tests do not stall.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            oauth_client_id: "test_client_id".to_string(),
            oauth_client_secret: "test_secret".to_string(),
            oauth_auth_uri: "https://accounts.example.com/authorize".to_string(),
            oauth_token_uri: "https://accounts.example.com/token".to_string(),
            oauth_redirect_url: "http://localhost:8080/auth/callback".to_string(),
            oauth_scopes: "test.scope".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            backend_mode: BackendMode::Mock,
            gemini_api_url: "http://localhost:9999/generate".to_string(),
            rate_limits: RateLimits {
                min_call_interval: Duration::ZERO,
                ..RateLimits::default()
            },
        }
    }
}

/// Parse a numeric env var, falling back to a default when unset.
fn parse_env_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = RateLimits::default();
        assert_eq!(limits.per_minute, 4);
        assert_eq!(limits.per_day, 180);
        assert_eq!(limits.min_call_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_test_default_zeroes_delay() {
        let config = Config::test_default();
        assert_eq!(config.rate_limits.min_call_interval, Duration::ZERO);
        assert_eq!(config.backend_mode, BackendMode::Mock);
    }
}
